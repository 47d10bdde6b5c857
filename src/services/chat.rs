use crate::config::AiConfig;
use lazy_static::lazy_static;
use rand::seq::SliceRandom;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

const ANTHROPIC_VERSION: &str = "2023-06-01";

const SYSTEM_PROMPT: &str = "You are the assistant of DLOB, a badminton club that meets every \
Saturday. Answer briefly and in the member's language. Session fee is charged per attendance, \
shuttlecock fees are split between the players of a match, and a monthly membership replaces \
session fees for the whole month.";

#[derive(Debug, Clone, Error)]
pub enum ChatError {
    #[error("AI provider is not configured")]
    MissingApiKey,
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("invalid response: {0}")]
    Decode(String),
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Clone)]
pub struct ChatClient {
    http: Client,
    config: AiConfig,
}

impl ChatClient {
    pub fn new(config: AiConfig) -> Result<Self, ChatError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("dlob/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ChatError::Transport(e.to_string()))?;

        Ok(Self { http, config })
    }

    pub async fn generate(&self, prompt: &str) -> Result<String, ChatError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(ChatError::MissingApiKey)?;

        let request = ChatRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            system: SYSTEM_PROMPT,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let res = self
            .http
            .post(&self.config.api_url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        match res.status() {
            s if s.is_success() => {
                let body = res
                    .json::<ChatResponse>()
                    .await
                    .map_err(|e| ChatError::Decode(e.to_string()))?;
                body.content
                    .into_iter()
                    .find_map(|block| match block {
                        ContentBlock::Text { text } if !text.trim().is_empty() => Some(text),
                        _ => None,
                    })
                    .ok_or_else(|| ChatError::Decode("no text content".to_string()))
            }
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => Err(ChatError::Timeout),
            s => {
                let status = s.as_u16();
                let body = res.text().await.unwrap_or_default();
                Err(ChatError::Http { status, body })
            }
        }
    }
}

fn map_reqwest_error(e: reqwest::Error) -> ChatError {
    if e.is_timeout() {
        ChatError::Timeout
    } else {
        ChatError::Transport(e.to_string())
    }
}

struct Topic {
    keywords: &'static [&'static str],
    replies: &'static [&'static str],
}

// Earlier topics win when a message mentions several.
const TOPICS: &[Topic] = &[
    Topic {
        keywords: &["jadwal", "schedule", "when", "kapan", "saturday", "sabtu"],
        replies: &[
            "We play every Saturday. Check the Matches page for this week's line-up.",
            "Club sessions are on Saturdays; ad hoc matches are listed on the Matches page.",
        ],
    },
    Topic {
        keywords: &["membership", "member", "monthly", "bulanan"],
        replies: &[
            "A monthly membership costs 40,000 in months with four Saturdays and 45,000 in months with five. You can convert a pending session fee from the Payments page.",
        ],
    },
    Topic {
        keywords: &["shuttlecock", "kok", "shuttle"],
        replies: &["Shuttlecock fees are split evenly between the players of each match."],
    },
    Topic {
        keywords: &["payment", "bayar", "fee", "biaya", "pay"],
        replies: &[
            "Your open fees are on the Payments page, grouped per session day. The session fee is 18,000 per Saturday.",
        ],
    },
    Topic {
        keywords: &["attendance", "kehadiran", "absen", "stats", "win"],
        replies: &["Your attendance rate and win rate are shown on your profile statistics."],
    },
];

lazy_static! {
    static ref KEYWORD_INDEX: HashMap<&'static str, usize> = {
        let mut index = HashMap::new();
        for (position, topic) in TOPICS.iter().enumerate() {
            for keyword in topic.keywords {
                index.entry(*keyword).or_insert(position);
            }
        }
        index
    };
}

const DEFAULT_REPLY: &str =
    "The assistant is unavailable right now. Please ask an admin, or try again later.";

/// Canned reply chosen by keyword.
pub fn fallback_reply(message: &str) -> &'static str {
    message
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter_map(|word| KEYWORD_INDEX.get(word).copied())
        .min()
        .and_then(|position| TOPICS[position].replies.choose(&mut rand::thread_rng()).copied())
        .unwrap_or(DEFAULT_REPLY)
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReplySource {
    Llm,
    Fallback,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub text: String,
    pub source: ReplySource,
}

#[derive(Debug, Clone)]
pub struct ChatService {
    client: Option<ChatClient>,
}

impl ChatService {
    pub fn new(config: &AiConfig) -> Self {
        let client = match ChatClient::new(config.clone()) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!("Chat client disabled: {}", e);
                None
            }
        };
        Self { client }
    }

    pub fn offline() -> Self {
        Self { client: None }
    }

    pub async fn reply(&self, message: &str) -> ChatReply {
        if let Some(client) = &self.client {
            match client.generate(message).await {
                Ok(text) => {
                    return ChatReply {
                        text,
                        source: ReplySource::Llm,
                    };
                }
                Err(ChatError::MissingApiKey) => {}
                Err(e) => warn!("Chat provider failed, using fallback: {}", e),
            }
        }

        ChatReply {
            text: fallback_reply(message).to_string(),
            source: ReplySource::Fallback,
        }
    }
}
