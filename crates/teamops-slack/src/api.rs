//! Slack Web API HTTP client.

use std::time::Duration;

use anyhow::{Context, bail};
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::types::{ApiResponse, PostMessageParams, SetTopicParams};

const DEFAULT_BASE_URL: &str = "https://slack.com/api";

/// HTTP client for the Slack Web API, authenticated with a bot token.
pub struct SlackApi {
    client: Client,
    base_url: String,
    token: String,
}

impl SlackApi {
    pub fn new(token: &str) -> anyhow::Result<Self> {
        if token.is_empty() {
            bail!("SLACK_API_TOKEN is not set");
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build Slack HTTP client")?;
        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            token: token.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Post a plain-text message to a channel.
    pub async fn post_message(&self, channel: &str, text: &str) -> anyhow::Result<()> {
        self.call("chat.postMessage", &PostMessageParams { channel, text })
            .await
    }

    /// Replace a channel's topic.
    pub async fn set_topic(&self, channel: &str, topic: &str) -> anyhow::Result<()> {
        self.call("conversations.setTopic", &SetTopicParams { channel, topic })
            .await
    }

    async fn call<P: Serialize>(&self, method: &str, params: &P) -> anyhow::Result<()> {
        let resp: ApiResponse = self
            .client
            .post(self.method_url(method))
            .bearer_auth(&self.token)
            .json(params)
            .send()
            .await
            .with_context(|| format!("{method} request failed"))?
            .json()
            .await
            .with_context(|| format!("{method} response parse failed"))?;

        check(method, resp)
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }
}

fn check(method: &str, resp: ApiResponse) -> anyhow::Result<()> {
    if !resp.ok {
        bail!(
            "{method} failed: {}",
            resp.error.unwrap_or_else(|| "unknown error".into())
        );
    }
    if let Some(warning) = resp.warning {
        debug!(method, warning = %warning, "Slack API warning");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_url() {
        let api = SlackApi::new("xoxb-test").unwrap();
        assert_eq!(
            api.method_url("chat.postMessage"),
            "https://slack.com/api/chat.postMessage"
        );
        let api = api.with_base_url("http://localhost:9999/api/");
        assert_eq!(
            api.method_url("conversations.setTopic"),
            "http://localhost:9999/api/conversations.setTopic"
        );
    }

    #[test]
    fn test_empty_token_rejected() {
        assert!(SlackApi::new("").is_err());
    }

    #[test]
    fn test_check_surfaces_slack_error() {
        let resp = ApiResponse {
            ok: false,
            error: Some("not_in_channel".into()),
            warning: None,
        };
        let err = check("conversations.setTopic", resp).unwrap_err();
        assert_eq!(err.to_string(), "conversations.setTopic failed: not_in_channel");
    }

    #[test]
    fn test_check_ok() {
        let resp = ApiResponse {
            ok: true,
            error: None,
            warning: None,
        };
        assert!(check("chat.postMessage", resp).is_ok());
    }
}
