//! Configuration
//!
//! A JSON file (default `./config.json`) describing the completion endpoint,
//! the agents and the tool providers. `CHORUS_BASE_URL` and
//! `CHORUS_API_KEY` / `OPENAI_API_KEY` override the file.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chorus_core::agent::AgentRole;
use chorus_core::builtin::DEFAULT_WORKSPACE;
use chorus_core::conversation::{DEFAULT_MAX_TURNS, DEFAULT_WORKER_MAX_STEPS};
use chorus_core::provider::{DEFAULT_MODEL, GenerationOptions, ReasoningEffort};
use chorus_mcp::ServerConfig;
use chorus_runtime::OpenAiConfig;
use chorus_runtime::openai::DEFAULT_BASE_URL;
use serde::{Deserialize, Serialize};

fn default_max_turns() -> usize {
    DEFAULT_MAX_TURNS
}

fn default_worker_max_steps() -> usize {
    DEFAULT_WORKER_MAX_STEPS
}

fn default_workspace() -> PathBuf {
    PathBuf::from(DEFAULT_WORKSPACE)
}

fn default_model() -> String {
    DEFAULT_MODEL.into()
}

const fn default_reasoning_effort() -> Option<ReasoningEffort> {
    Some(ReasoningEffort::Medium)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Completion API root
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    #[serde(default = "default_worker_max_steps")]
    pub worker_max_steps: usize,

    /// Directory the file tools are confined to
    #[serde(default = "default_workspace")]
    pub workspace: PathBuf,

    #[serde(default)]
    pub agents: Vec<AgentConfig>,

    #[serde(default)]
    pub mcp_servers: Vec<ServerConfig>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Random `adjective_scientist` name when empty
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub role: AgentRole,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub system_message: Option<String>,

    #[serde(default)]
    pub temperature: Option<f32>,

    #[serde(default = "default_reasoning_effort")]
    pub reasoning_effort: Option<ReasoningEffort>,
}

impl AgentConfig {
    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            model: self.model.clone(),
            temperature: self.temperature,
            reasoning_effort: self.reasoning_effort,
            ..GenerationOptions::default()
        }
    }
}

impl Config {
    /// Read and parse a config file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Apply environment overrides; `lookup` is usually `std::env::var`
    #[must_use]
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let present = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(url) = present("CHORUS_BASE_URL") {
            self.base_url = Some(url);
        }
        if let Some(key) = present("CHORUS_API_KEY").or_else(|| present("OPENAI_API_KEY")) {
            self.api_key = Some(key);
        }
        self
    }

    pub fn openai(&self) -> OpenAiConfig {
        OpenAiConfig::new(
            self.base_url
                .clone()
                .filter(|url| !url.is_empty())
                .unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            self.api_key.clone().filter(|key| !key.is_empty()),
        )
    }
}
