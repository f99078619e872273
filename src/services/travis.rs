use std::collections::HashMap;

use async_trait::async_trait;
use log::{debug, error, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde_json::Value;
use url::Url;

use super::core::{ServiceCore, ServiceSettings};
use super::Service;
use crate::auth::Token;
use crate::error::{FlashError, Result};
use crate::format::{naturaldelta, parse_duration, truncate};
use crate::models::{BuildReport, BuildSummary, Outcome, Payload};

const OPEN_SOURCE_ROOT: &str = "https://api.travis-ci.org";
const PRO_ROOT: &str = "https://api.travis-ci.com";
const ACCEPT_V2: &str = "application/vnd.travis-ci.2+json";
const ELAPSED_FALLBACK: &str = "elapsed time not available";

/// Recent builds and their commits, read field by field so that one bad
/// record cannot discard the rest.
#[derive(Debug, Default)]
struct BuildsResponse {
    builds: Vec<TravisBuild>,
    commits: Vec<TravisCommit>,
}

impl BuildsResponse {
    fn from_value(body: &Value) -> Self {
        let records = |key: &str| {
            body.get(key)
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default()
        };

        Self {
            builds: records("builds").iter().map(TravisBuild::from_value).collect(),
            commits: records("commits").iter().map(TravisCommit::from_value).collect(),
        }
    }
}

#[derive(Debug)]
struct TravisBuild {
    commit_id: Option<u64>,
    state: Value,
    duration: Value,
}

impl TravisBuild {
    fn from_value(record: &Value) -> Self {
        Self {
            commit_id: record.get("commit_id").and_then(Value::as_u64),
            state: record.get("state").cloned().unwrap_or_default(),
            duration: record.get("duration").cloned().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Default)]
struct TravisCommit {
    id: Option<u64>,
    author_name: Option<String>,
    message: Option<String>,
}

impl TravisCommit {
    fn from_value(record: &Value) -> Self {
        let text = |key: &str| record.get(key).and_then(Value::as_str).map(str::to_owned);

        Self {
            id: record.get("id").and_then(Value::as_u64),
            author_name: text("author_name"),
            message: text("message"),
        }
    }
}

fn outcome_for(state: &str) -> Option<Outcome> {
    match state {
        "passed" => Some(Outcome::Passed),
        "failed" => Some(Outcome::Failed),
        "canceled" => Some(Outcome::Cancelled),
        "errored" => Some(Outcome::Crashed),
        "created" | "received" | "queued" | "started" => Some(Outcome::Working),
        _ => None,
    }
}

/// Recent builds of a Travis CI repository.
pub struct Travis {
    core: ServiceCore,
    repo: String,
    builds_url: Url,
    headers: HeaderMap,
}

impl Travis {
    pub const REQUIRED: &'static [&'static str] = &["account", "app"];
    pub const PRO_REQUIRED: &'static [&'static str] = &["account", "app", "token"];

    /// Public repositories on travis-ci.org; a token is optional.
    pub fn open_source(settings: &ServiceSettings) -> Result<Self> {
        Self::new(settings, Self::REQUIRED, OPEN_SOURCE_ROOT)
    }

    /// Private repositories on travis-ci.com.
    pub fn pro(settings: &ServiceSettings) -> Result<Self> {
        Self::new(settings, Self::PRO_REQUIRED, PRO_ROOT)
    }

    fn new(settings: &ServiceSettings, required: &[&str], default_root: &str) -> Result<Self> {
        let core = ServiceCore::new(settings, required, default_root)?;
        let repo = format!(
            "{}/{}",
            settings.require("account")?,
            settings.require("app")?
        );
        let builds_url = core.url("/repos/{repo}/builds", &[("repo", repo.as_str())])?;

        let mut headers = super::core::default_headers();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_V2));
        if let Some(token) = settings.get("token") {
            let token = Token::from(token.as_str());
            let mut value = HeaderValue::from_str(&token.travis_authorization()).map_err(|_| {
                FlashError::Config(format!("Invalid token for '{}'", core.service_name))
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        Ok(Self {
            core,
            repo,
            builds_url,
            headers,
        })
    }

    async fn fetch(&self) -> Result<Payload> {
        let response = self
            .core
            .client
            .get(self.builds_url.clone())
            .headers(self.headers())
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FlashError::Api(format!(
                "{status} from {}",
                self.builds_url
            )));
        }

        let body = response.json::<Value>().await?;
        self.format_data(BuildsResponse::from_value(&body))
            .into_payload()
    }

    fn format_data(&self, data: BuildsResponse) -> BuildReport {
        let commits: HashMap<u64, &TravisCommit> = data
            .commits
            .iter()
            .filter_map(|commit| commit.id.map(|id| (id, commit)))
            .collect();
        let missing = TravisCommit::default();

        let builds = data
            .builds
            .iter()
            .map(|build| {
                let commit = build
                    .commit_id
                    .and_then(|id| commits.get(&id).copied())
                    .unwrap_or(&missing);
                Self::format_build(build, commit)
            })
            .collect();

        BuildReport {
            name: self.repo.clone(),
            builds,
        }
    }

    fn format_build(build: &TravisBuild, commit: &TravisCommit) -> BuildSummary {
        let outcome = build.state.as_str().and_then(outcome_for);
        if outcome.is_none() {
            warn!("Unknown Travis build status: {}", build.state);
        }

        let elapsed = match parse_duration(&build.duration).and_then(naturaldelta) {
            Ok(delta) => format!("took {delta}"),
            Err(e) => {
                warn!("Failed to generate elapsed time: {e}");
                ELAPSED_FALLBACK.to_string()
            }
        };

        BuildSummary {
            author: commit.author_name.clone(),
            elapsed,
            message: truncate(commit.message.as_deref().unwrap_or_default()),
            outcome,
        }
    }
}

#[async_trait]
impl Service for Travis {
    fn service_name(&self) -> &str {
        &self.core.service_name
    }

    fn template(&self) -> &'static str {
        "travis"
    }

    fn headers(&self) -> HeaderMap {
        self.headers.clone()
    }

    async fn update(&self) -> Payload {
        debug!("Fetching Travis CI data for {}", self.repo);
        match self.fetch().await {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to update Travis CI data for {}: {e}", self.repo);
                Payload::new()
            }
        }
    }
}
