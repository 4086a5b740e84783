//! Client for the agent-local REST API available inside a running microservice.
//!
//! The agent listens on `iofog:54321` on the microservice network and knows
//! the caller by its uuid (`SELFNAME`). Calls are unauthenticated `POST`s with
//! JSON bodies.

use common::messages::{
    AgentIdRequest, ConfigResponse, IoMessage, MessagesQuery, MessagesResponse,
    PostMessageResponse,
};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{SdkError, render_controller_error};
use crate::retry::{RetrySettings, run_with_retry};
use crate::telemetry;

pub const DEFAULT_AGENT_HOST: &str = "iofog";
pub const DEFAULT_AGENT_PORT: u16 = 54321;

const SELFNAME_ENV: &str = "SELFNAME";
const SSL_ENV: &str = "SSL";

const CONFIG_PATH: &str = "/v2/config/get";
const NEXT_MESSAGES_PATH: &str = "/v2/messages/next";
const QUERY_MESSAGES_PATH: &str = "/v2/messages/query";
const POST_MESSAGE_PATH: &str = "/v2/messages/new";

/// Messages published by a set of microservices inside a time frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeFrameMessages {
    pub timeframe_start: i64,
    pub timeframe_end: i64,
    pub messages: Vec<IoMessage>,
}

#[derive(Debug, Clone)]
pub struct AgentClient {
    http: Client,
    base_url: String,
    id: String,
    retry: RetrySettings,
}

impl AgentClient {
    pub fn new(id: impl Into<String>, ssl: bool, host: &str, port: u16) -> Self {
        let scheme = if ssl { "https" } else { "http" };
        Self::with_http_client(Client::new(), id, format!("{scheme}://{host}:{port}"))
    }

    pub fn with_http_client(
        http: Client,
        id: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            id: id.into(),
            retry: RetrySettings::default(),
        }
    }

    /// Client for the local agent, identified by `SELFNAME`; `SSL=true` switches to https.
    pub fn from_env() -> Result<Self, SdkError> {
        from_env_with(|key| std::env::var(key).ok())
    }

    pub fn with_retry(mut self, retry: RetrySettings) -> Self {
        self.retry = retry;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Microservice configuration as a JSON object.
    pub async fn config(&self) -> Result<Map<String, Value>, SdkError> {
        self.config_as().await
    }

    /// Microservice configuration decoded into `T`.
    pub async fn config_as<T: DeserializeOwned>(&self) -> Result<T, SdkError> {
        let res: ConfigResponse = self.post(CONFIG_PATH, &self.id_request()).await?;
        serde_json::from_str(&res.config)
            .map_err(|err| SdkError::Decode(format!("invalid microservice config: {err}")))
    }

    /// Messages queued for this microservice since the last call.
    pub async fn next_messages(&self) -> Result<Vec<IoMessage>, SdkError> {
        let res: MessagesResponse = self.post(NEXT_MESSAGES_PATH, &self.id_request()).await?;
        Ok(res.messages)
    }

    /// Publishes `message`; the agent assigns its id and timestamp.
    pub async fn post_message(&self, message: &IoMessage) -> Result<PostMessageResponse, SdkError> {
        self.post(POST_MESSAGE_PATH, message).await
    }

    pub async fn messages_from_publishers(
        &self,
        timeframe_start: i64,
        timeframe_end: i64,
        publishers: Vec<String>,
    ) -> Result<TimeFrameMessages, SdkError> {
        let query = MessagesQuery {
            id: self.id.clone(),
            timeframe_start,
            timeframe_end,
            publishers,
        };
        let res: MessagesResponse = self.post(QUERY_MESSAGES_PATH, &query).await?;
        Ok(TimeFrameMessages {
            timeframe_start: res.timeframe_start,
            timeframe_end: res.timeframe_end,
            messages: res.messages,
        })
    }

    fn id_request(&self) -> AgentIdRequest {
        AgentIdRequest {
            id: self.id.clone(),
        }
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, SdkError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)
            .map_err(|err| SdkError::Input(format!("failed to encode request body: {err}")))?;
        let policy = self.retry.snapshot();
        let operation = format!("POST {path}");
        let text = run_with_retry(&policy, &operation, || self.send_once(path, &body)).await?;
        serde_json::from_str(&text).map_err(|err| SdkError::Decode(format!("{path}: {err}")))
    }

    async fn send_once(&self, path: &str, body: &Value) -> Result<String, SdkError> {
        let outcome = self.send_unrecorded(path, body).await;
        telemetry::record_request("POST", if outcome.is_ok() { "success" } else { "error" });
        outcome
    }

    async fn send_unrecorded(&self, path: &str, body: &Value) -> Result<String, SdkError> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "agent request");
        let res = self.http.post(&url).json(body).send().await?;
        let status = res.status();
        let text = res.text().await?;
        if status.is_success() {
            Ok(text)
        } else {
            Err(agent_error(status, &text))
        }
    }
}

fn agent_error(status: StatusCode, body: &str) -> SdkError {
    SdkError::Api {
        status,
        message: render_controller_error(status, body),
    }
}

pub(crate) fn from_env_with<F>(lookup: F) -> Result<AgentClient, SdkError>
where
    F: Fn(&str) -> Option<String>,
{
    let id = lookup(SELFNAME_ENV)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SdkError::Input(format!("{SELFNAME_ENV} is not set")))?;
    let ssl = lookup(SSL_ENV).is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));
    Ok(AgentClient::new(id, ssl, DEFAULT_AGENT_HOST, DEFAULT_AGENT_PORT))
}
