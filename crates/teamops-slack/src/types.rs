//! Slack Web API payloads.

use serde::{Deserialize, Serialize};

/// Every Web API method answers with this envelope.
#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub warning: Option<String>,
}

/// `chat.postMessage`
#[derive(Debug, Serialize)]
pub struct PostMessageParams<'a> {
    pub channel: &'a str,
    pub text: &'a str,
}

/// `conversations.setTopic`
#[derive(Debug, Serialize)]
pub struct SetTopicParams<'a> {
    pub channel: &'a str,
    pub topic: &'a str,
}
