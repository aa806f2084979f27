use crate::{error::DetectError, git::repo::RepoHandle, logging::Logger};

pub mod sender;

/// One-way boundary toward the operator. Delivery runs in its own task
/// and is unordered relative to later checks; a failed delivery is
/// logged and never retried, and never feeds back into detection.
#[derive(Clone)]
pub struct Notifier {
    webhook_url: Option<String>,
    logger: Logger,
}

pub fn single_message(repo: &RepoHandle) -> String {
    format!(
        "Repository '{}' has changes in the remote repository that you might want to pull.",
        repo.name
    )
}

pub fn batch_message(repos: &[RepoHandle]) -> String {
    let mut message = String::from(
        "The following repositories have changes in the remote repository that you might want to pull:\n\n",
    );
    for repo in repos {
        message.push_str(&format!("- {} ({})\n", repo.name, repo.branch));
    }
    message
}

impl Notifier {
    pub fn new(webhook_url: Option<String>, logger: Logger) -> Self {
        Self {
            webhook_url,
            logger,
        }
    }

    pub async fn notify_one(&self, repo: &RepoHandle) {
        self.dispatch(single_message(repo)).await;
    }

    pub async fn notify_many(&self, repos: &[RepoHandle]) {
        if repos.is_empty() {
            return;
        }
        self.dispatch(batch_message(repos)).await;
    }

    async fn dispatch(&self, message: String) {
        let _ = self.logger.info(&format!("remote changes: {message}")).await;

        let Some(url) = self.webhook_url.clone() else {
            return;
        };

        let logger = self.logger.clone();
        tokio::spawn(async move {
            if let Err(e) = sender::discord_sender(&url, &message).await {
                let err = DetectError::NotificationFailure(e.to_string());
                let _ = logger.error(&err.to_string()).await;
            }
        });
    }
}
