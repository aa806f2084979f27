pub mod cache;
pub mod engine;
pub mod id;
pub mod manager;
pub mod state;
