use async_trait::async_trait;

/// Explicit user confirmation asked before any destructive request.
#[async_trait]
pub trait Confirm: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}
