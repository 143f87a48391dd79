//! Configuration file handling.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::conditions::NetworkConditions;
use crate::model::Rule;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,

    /// Initial proxy target domain; empty disables proxying until a target
    /// is set at runtime.
    #[serde(default)]
    pub proxy: ProxyConfig,

    /// Optional network-condition simulation applied before every response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<NetworkConditions>,

    /// Rules loaded into the rule store at startup.
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: ListenConfig::default(),
            proxy: ProxyConfig::default(),
            conditions: None,
            rules: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8888
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub target: String,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration. Pattern regexes are deliberately not checked
    /// here: a malformed regex makes its rule non-matching at evaluation
    /// time, it does not block startup.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.listen.port == 0 {
            anyhow::bail!("listen.port must be non-zero");
        }
        for rule in &self.rules {
            if rule.name.trim().is_empty() {
                anyhow::bail!("every seeded rule needs a non-empty name");
            }
            let status = rule.response.status_code;
            if !(100..=599).contains(&status) {
                anyhow::bail!(
                    "rule '{}' has out-of-range response status {}",
                    rule.name,
                    status
                );
            }
        }
        Ok(())
    }
}
