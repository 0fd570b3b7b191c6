//! Chat collaborator seam.

use async_trait::async_trait;

/// Messaging operations the jobs need from the chat platform.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Post a message to a channel.
    async fn post_message(&self, channel: &str, text: &str) -> anyhow::Result<()>;

    /// Replace a channel's topic.
    async fn set_channel_topic(&self, channel: &str, topic: &str) -> anyhow::Result<()>;
}

/// Tell a channel a job failed. Failures here are only logged.
pub async fn report_failure(chat: &dyn ChatApi, channel: &str, text: &str) {
    if channel.is_empty() {
        tracing::warn!("No channel configured for failure report");
        return;
    }
    if let Err(e) = chat.post_message(channel, text).await {
        tracing::warn!(channel, "Failed to send error notification to Slack: {e:#}");
    }
}
