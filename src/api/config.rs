//! Purpose: Describe where the tagging service lives and how to authenticate to it.
//! Exports: `Environment`, `Credentials`, `ServiceConfig`.
//! Role: Plain configuration values consumed by `ServiceClient`; no I/O.
//! Invariants: An explicit service URL always wins over the environment table.
//! Invariants: Credentials are one of bearer token, API key, or nothing; never both.
use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::core::error::{Error, ErrorKind};

pub const DEFAULT_BASE_DOMAIN: &str = "systime.dk";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Environment {
    #[default]
    Production,
    Staging,
    Test,
}

impl Environment {
    pub fn tagging_url(self, base_domain: &str) -> String {
        match self {
            Environment::Production => format!("https://tagging.services.{base_domain}"),
            Environment::Staging => format!("https://staging-tagging.services.{base_domain}"),
            Environment::Test => "https://localhost:3010/services/tagging".to_string(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Staging => "staging",
            Environment::Test => "test",
        }
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" => Ok(Environment::Production),
            "staging" | "development" | "local" | "testing" => Ok(Environment::Staging),
            "test" => Ok(Environment::Test),
            other => Err(Error::new(ErrorKind::Usage)
                .with_message(format!("unknown environment: {other}"))
                .with_hint("Use production, staging, local, or test.")),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Default, Eq, PartialEq)]
pub enum Credentials {
    Bearer(String),
    ApiKey(String),
    #[default]
    Anonymous,
}

impl Credentials {
    pub fn bearer_token(&self) -> Option<&str> {
        match self {
            Credentials::Bearer(token) => Some(token),
            _ => None,
        }
    }

    /// Header name and value to attach to every request, if any.
    pub fn header(&self) -> Option<(&'static str, String)> {
        match self {
            Credentials::Bearer(token) => Some(("Authorization", format!("Bearer {token}"))),
            Credentials::ApiKey(key) => Some(("x-api-key", key.clone())),
            Credentials::Anonymous => None,
        }
    }
}

// Keep secrets out of debug logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Bearer(_) => f.write_str("Bearer(..)"),
            Credentials::ApiKey(_) => f.write_str("ApiKey(..)"),
            Credentials::Anonymous => f.write_str("Anonymous"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub environment: Environment,
    pub service_url: Option<String>,
    pub base_domain: String,
    pub credentials: Credentials,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            service_url: None,
            base_domain: DEFAULT_BASE_DOMAIN.to_string(),
            credentials: Credentials::default(),
        }
    }
}

impl ServiceConfig {
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            ..Self::default()
        }
    }

    pub fn with_service_url(mut self, url: impl Into<String>) -> Self {
        self.service_url = Some(url.into());
        self
    }

    pub fn with_base_domain(mut self, domain: impl Into<String>) -> Self {
        self.base_domain = domain.into();
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.credentials = Credentials::Bearer(token.into());
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.credentials = Credentials::ApiKey(key.into());
        self
    }

    pub fn base_url(&self) -> Result<Url, Error> {
        let raw = match self.service_url.as_deref().filter(|url| !url.is_empty()) {
            Some(url) => url.to_string(),
            None => self.environment.tagging_url(&self.base_domain),
        };
        normalize_base_url(&raw)
    }
}

fn normalize_base_url(raw: &str) -> Result<Url, Error> {
    let mut url = Url::parse(raw).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid service url")
            .with_resource(raw)
            .with_source(err)
    })?;
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("service url must use http or https scheme")
            .with_resource(raw));
    }
    if url.cannot_be_a_base() {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("service url cannot be a base")
            .with_resource(raw));
    }
    let path = url.path().trim_end_matches('/').to_string();
    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}
