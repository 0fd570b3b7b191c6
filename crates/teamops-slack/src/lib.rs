//! teamops-slack: Slack Web API client used for announcements and topics.

pub mod api;
pub mod types;

use async_trait::async_trait;

use teamops_jobs::ChatApi;

pub use api::SlackApi;

#[async_trait]
impl ChatApi for SlackApi {
    async fn post_message(&self, channel: &str, text: &str) -> anyhow::Result<()> {
        SlackApi::post_message(self, channel, text).await
    }

    async fn set_channel_topic(&self, channel: &str, topic: &str) -> anyhow::Result<()> {
        self.set_topic(channel, topic).await
    }
}
