use std::path::Path;

use log::info;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{FlashError, Result};

/// Dashboard configuration document.
#[derive(Debug, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_project_name")]
    pub project_name: String,
    #[serde(default = "default_style")]
    pub style: String,
    #[serde(default)]
    pub services: Vec<Map<String, Value>>,
}

fn default_project_name() -> String {
    "unnamed".to_string()
}

fn default_style() -> String {
    "default".to_string()
}

impl DashboardConfig {
    /// Load from inline JSON when given, otherwise from the file at `path`.
    pub fn load(inline: Option<&str>, path: &Path) -> Result<Self> {
        let text = match inline.filter(|text| !text.trim().is_empty()) {
            Some(text) => {
                info!("Loading configuration from environment");
                text.to_string()
            }
            None => {
                info!("Loading configuration from {}", path.display());
                std::fs::read_to_string(path).map_err(|e| match e.kind() {
                    std::io::ErrorKind::NotFound => FlashError::Config(format!(
                        "no configuration available, set FLASH_CONFIG or provide {}",
                        path.display()
                    )),
                    _ => FlashError::Io(e),
                })?
            }
        };

        let mut config = Self::from_json(&text)?;
        config.substitute_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Replace `"$LOOKS_LIKE_THIS"` settings with the named variable's value.
    ///
    /// Unset variables leave the reference untouched.
    pub fn substitute_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for service in &mut self.services {
            for (key, value) in service.iter_mut() {
                if key == "name" || key == "type" {
                    continue;
                }
                let Value::String(text) = value else {
                    continue;
                };
                let Some(var) = env_reference(text) else {
                    continue;
                };
                if let Some(resolved) = lookup(var) {
                    *text = resolved;
                }
            }
        }
    }
}

fn env_reference(value: &str) -> Option<&str> {
    let name = value.strip_prefix('$')?;
    let valid = !name.is_empty() && name.chars().all(|c| c.is_ascii_uppercase() || c == '_');
    valid.then_some(name)
}
