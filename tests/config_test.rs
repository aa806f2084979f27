use chrono::Duration;
use pretty_assertions::assert_eq;
use tempfile::tempdir;
use vigil_core::config::{load_settings_from, save_settings_to, DetectionPolicy, Settings};

#[test]
fn test_defaults_are_conservative() {
    let settings: Settings = serde_json::from_str("{}").unwrap();
    assert!(!settings.cache_enabled);
    assert_eq!(settings.cooldown_minutes, 0);
    assert_eq!(settings.webhook_url, None);

    let policy = settings.policy();
    assert_eq!(
        policy,
        DetectionPolicy {
            cache_enabled: false,
            cooldown_minutes: 0,
        }
    );
    assert_eq!(policy.cooldown(), Duration::zero());
}

#[test]
fn test_policy_cooldown_conversion() {
    let policy = DetectionPolicy {
        cache_enabled: true,
        cooldown_minutes: 5,
    };
    assert_eq!(policy.cooldown(), Duration::minutes(5));

    let negative = DetectionPolicy {
        cache_enabled: true,
        cooldown_minutes: -1,
    };
    assert_eq!(negative.cooldown(), Duration::minutes(-1));
}

#[tokio::test]
async fn test_settings_roundtrip() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("nested").join("settings.json");

    let settings = Settings {
        cache_enabled: true,
        cooldown_minutes: 15,
        webhook_url: Some("https://discord.com/api/webhooks/x".to_string()),
    };

    save_settings_to(&path, &settings).await?;
    let loaded = load_settings_from(&path).await?;
    assert_eq!(loaded, settings);
    Ok(())
}

#[tokio::test]
async fn test_missing_settings_file_errors() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent.json");
    assert!(load_settings_from(&path).await.is_err());
}
