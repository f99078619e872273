use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Client;
use serde_json::{Map, Value};
use url::Url;

use crate::error::{FlashError, Result};

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Resolved settings for a single configured service.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    name: String,
    fields: Map<String, Value>,
}

impl ServiceSettings {
    pub fn new(name: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Scalar setting rendered as text. Null and empty values count as absent.
    pub fn get(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn require(&self, key: &str) -> Result<String> {
        self.get(key).ok_or_else(|| {
            FlashError::Config(format!("service '{}' is missing '{key}'", self.name))
        })
    }

    /// Fails listing every one of `required` that is absent.
    pub fn check_required(&self, required: &[&str]) -> Result<()> {
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|key| self.get(key).is_none())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(FlashError::Config(format!(
                "service '{}' is missing required settings: {}",
                self.name,
                missing.join(", ")
            )))
        }
    }
}

/// State shared by every adapter: display name, API root and HTTP client.
pub struct ServiceCore {
    pub service_name: String,
    pub root: Url,
    pub client: Client,
}

impl ServiceCore {
    pub fn new(settings: &ServiceSettings, required: &[&str], default_root: &str) -> Result<Self> {
        settings.check_required(required)?;

        let service_name = settings
            .get("service_name")
            .unwrap_or_else(|| settings.name().to_string());

        let root_text = settings
            .get("root")
            .unwrap_or_else(|| default_root.to_string());
        let root = Url::parse(&root_text)
            .map_err(|e| FlashError::Config(format!("Invalid root URL '{root_text}': {e}")))?;

        let timeout = match settings.get("timeout") {
            Some(text) => match text.parse::<u64>() {
                Ok(0) => {
                    return Err(FlashError::Config(format!(
                        "Timeout for '{service_name}' must be at least one second"
                    )))
                }
                Ok(secs) => secs,
                Err(e) => {
                    return Err(FlashError::Config(format!(
                        "Invalid timeout '{text}' for '{service_name}': {e}"
                    )))
                }
            },
            None => DEFAULT_TIMEOUT_SECS,
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .map_err(|e| FlashError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            service_name,
            root,
            client,
        })
    }

    pub fn url(&self, template: &str, params: &[(&str, &str)]) -> Result<Url> {
        build_url(&self.root, template, params)
    }
}

pub fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(concat!("Flash/", env!("CARGO_PKG_VERSION"))),
    );
    headers
}

/// Append `template` to `root`, replacing `{field}` segments with `params`.
///
/// Placeholders must occupy a whole segment. A value may span several
/// segments (`account/app`); each one is percent-encoded, and empty, `.` and
/// `..` pieces are rejected.
pub fn build_url(root: &Url, template: &str, params: &[(&str, &str)]) -> Result<Url> {
    let mut url = root.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|()| FlashError::Config(format!("URL cannot be a base: {root}")))?;
        segments.pop_if_empty();

        for part in template.split('/').filter(|part| !part.is_empty()) {
            let Some(key) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) else {
                segments.push(part);
                continue;
            };

            let value = params
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| *value)
                .ok_or_else(|| FlashError::Config(format!("No value for URL field '{key}'")))?;

            for piece in value.split('/') {
                if matches!(piece, "" | "." | "..") {
                    return Err(FlashError::Config(format!(
                        "Invalid path segment in '{key}': {value:?}"
                    )));
                }
                segments.push(piece);
            }
        }
    }
    Ok(url)
}
