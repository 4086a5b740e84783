use std::env;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::client::ResourceClient;
use crate::retry::{ErrorRetry, RetryPolicy, RetrySettings};
use crate::session::{AuthMode, Session};

/// Controller endpoint and credentials.
///
/// A non-empty `token` wins over email/password.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ControllerConfig {
    pub endpoint: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for ControllerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerConfig")
            .field("endpoint", &self.endpoint)
            .field("email", &self.email)
            .field("has_password", &self.password.is_some())
            .field("has_token", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl ControllerConfig {
    pub fn with_token(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token: Some(token.into()),
            ..Self::default()
        }
    }

    pub fn with_credentials(
        endpoint: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            email: Some(email.into()),
            password: Some(password.into()),
            ..Self::default()
        }
    }

    pub fn auth_mode(&self) -> AuthMode {
        if let Some(token) = non_empty(&self.token) {
            return AuthMode::Token(token.to_string());
        }
        AuthMode::Credentials {
            email: self.email.clone().unwrap_or_default(),
            password: self.password.clone().unwrap_or_default(),
            refresh_token: non_empty(&self.refresh_token).map(str::to_string),
        }
    }

    pub fn session(&self) -> Session {
        Session::new(self.endpoint.trim(), self.auth_mode())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            anyhow::bail!("controller.endpoint cannot be empty");
        }
        let url = Url::parse(endpoint)
            .map_err(|err| anyhow::anyhow!("controller.endpoint '{endpoint}' is not a URL: {err}"))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("controller.endpoint must use http or https");
        }
        let has_token = non_empty(&self.token).is_some();
        let has_credentials =
            non_empty(&self.email).is_some() && non_empty(&self.password).is_some();
        if !has_token && !has_credentials {
            anyhow::bail!("either controller.token or controller.email and controller.password are required");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default)]
    pub timeout_secs: u64,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default)]
    pub errors: Vec<ErrorRetry>,
}

fn default_backoff_ms() -> u64 {
    200
}

fn default_max_backoff_ms() -> u64 {
    5_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 0,
            backoff_ms: default_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            errors: Vec::new(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(Duration::from_secs(self.timeout_secs), self.errors.clone()).with_backoff(
            Duration::from_millis(self.backoff_ms),
            Duration::from_millis(self.max_backoff_ms),
        )
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(rule) = self.errors.iter().find(|rule| rule.message.is_empty()) {
            anyhow::bail!(
                "retry.errors entries need a non-empty message (retries = {})",
                rule.retries
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SdkConfig {
    pub controller: ControllerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl SdkConfig {
    /// Client wired with this config's session and retry policy.
    pub fn client(&self) -> ResourceClient {
        ResourceClient::new(
            self.controller.session(),
            RetrySettings::new(self.retry.policy()),
        )
    }
}

enum EnvKind {
    String,
    RetryRules,
}

const ENV_OVERRIDES: &[(&str, &str, EnvKind)] = &[
    ("IOFOG_SDK_ENDPOINT", "controller.endpoint", EnvKind::String),
    ("IOFOG_SDK_EMAIL", "controller.email", EnvKind::String),
    ("IOFOG_SDK_PASSWORD", "controller.password", EnvKind::String),
    ("IOFOG_SDK_TOKEN", "controller.token", EnvKind::String),
    (
        "IOFOG_SDK_REFRESH_TOKEN",
        "controller.refresh_token",
        EnvKind::String,
    ),
    (
        "IOFOG_SDK_RETRY_TIMEOUT_SECS",
        "retry.timeout_secs",
        EnvKind::String,
    ),
    (
        "IOFOG_SDK_RETRY_BACKOFF_MS",
        "retry.backoff_ms",
        EnvKind::String,
    ),
    (
        "IOFOG_SDK_RETRY_MAX_BACKOFF_MS",
        "retry.max_backoff_ms",
        EnvKind::String,
    ),
    ("IOFOG_SDK_RETRY_ERRORS", "retry.errors", EnvKind::RetryRules),
];

/// Loads `iofog-sdk.{toml,yaml,json}` (optional) and `IOFOG_SDK_*` overrides.
pub fn load() -> anyhow::Result<SdkConfig> {
    load_with_env(|key| env::var(key).ok())
}

pub(crate) fn load_with_env<F>(lookup: F) -> anyhow::Result<SdkConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut builder = config::Config::builder()
        .add_source(config::File::with_name("iofog-sdk").required(false))
        .set_default("controller.endpoint", "http://localhost:51121/api/v3")?
        .set_default("retry.timeout_secs", 0)?
        .set_default("retry.backoff_ms", default_backoff_ms())?
        .set_default("retry.max_backoff_ms", default_max_backoff_ms())?;

    for (env_key, cfg_key, kind) in ENV_OVERRIDES {
        if let Some(value) = lookup(env_key) {
            match kind {
                EnvKind::String => {
                    builder = builder.set_override(*cfg_key, value)?;
                }
                EnvKind::RetryRules => {
                    let rules: Vec<config::Map<String, config::Value>> = parse_retry_rules(&value)?
                        .into_iter()
                        .map(|rule| {
                            let mut entry = config::Map::new();
                            entry.insert("message".to_string(), config::Value::from(rule.message));
                            entry.insert(
                                "retries".to_string(),
                                config::Value::from(u64::from(rule.retries)),
                            );
                            entry
                        })
                        .collect();
                    builder = builder.set_override(*cfg_key, rules)?;
                }
            }
        }
    }

    let cfg: SdkConfig = builder.build()?.try_deserialize()?;
    cfg.controller.validate()?;
    cfg.retry.validate()?;
    Ok(cfg)
}

/// Parses `"connection reset=3,EOF=2"`, keeping declaration order.
pub fn parse_retry_rules(raw: &str) -> anyhow::Result<Vec<ErrorRetry>> {
    let mut rules = Vec::new();
    for entry in raw.split(',') {
        let trimmed = entry.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Some((message, retries)) = trimmed.rsplit_once('=') else {
            anyhow::bail!("retry rule '{trimmed}' must look like '<message>=<retries>'");
        };
        let retries: u32 = retries
            .trim()
            .parse()
            .map_err(|err| anyhow::anyhow!("retry rule '{trimmed}' has invalid count: {err}"))?;
        rules.push(ErrorRetry::new(message.trim(), retries));
    }
    Ok(rules)
}
