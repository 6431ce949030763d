//! Engine configuration with TOML file support.

use agora_directory::AgentTopics;
use agora_ledger::{RetryPolicy, DEFAULT_MAX_PAGES, DEFAULT_PAGE_SIZE};
use agora_reputation::ReadAfterWrite;
use agora_types::{AgentId, Category, ConsensusParams, TopicId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::EngineError;

/// Which read-after-write policy the reputation syncer follows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadAfterWriteMode {
    #[default]
    Optimistic,
    Poll,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    #[default]
    Http,
    /// Process-local topics; nothing survives a restart.
    Memory,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicsConfig {
    /// Topic holding `agent_registered` events.
    #[serde(default)]
    pub discovery: Option<TopicId>,
    /// Category name → topic id.
    #[serde(default)]
    pub categories: BTreeMap<String, TopicId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub backend: LedgerBackend,
    /// Mirror REST base URL for reads.
    #[serde(default = "default_mirror_url")]
    pub mirror_url: String,
    /// Submission gateway base URL for appends.
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryConfig {
    /// Secondary reputation ledger base URL. Unset disables mirroring.
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Static credential → agent table.
    #[serde(default)]
    pub tokens: BTreeMap<String, AgentId>,
    /// Identity service base URL; takes precedence over `tokens` when set.
    #[serde(default)]
    pub url: Option<String>,
}

/// Configuration for the engine and the daemon around it.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Every field has a default, so an
/// empty file is a valid configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Same-direction votes needed to finalize an item.
    #[serde(default = "default_threshold")]
    pub threshold: u32,

    /// Messages requested per ledger page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Upper bound on pages read from one topic.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Re-read the item's topic and re-check admission just before appending.
    #[serde(default = "default_true")]
    pub recheck_before_append: bool,

    #[serde(default)]
    pub read_after_write: ReadAfterWriteMode,

    #[serde(default = "default_poll_attempts")]
    pub poll_attempts: u32,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Attempts for the voter's "I voted" activity record.
    #[serde(default = "default_activity_retry_attempts")]
    pub activity_retry_attempts: u32,

    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to expose the Prometheus `/metrics` endpoint.
    #[serde(default)]
    pub enable_metrics: bool,

    #[serde(default)]
    pub topics: TopicsConfig,

    #[serde(default)]
    pub ledger: LedgerConfig,

    #[serde(default)]
    pub secondary: SecondaryConfig,

    #[serde(default)]
    pub identity: IdentityConfig,

    /// Static agent → records entries, applied over the discovery topic.
    #[serde(default)]
    pub directory: BTreeMap<AgentId, AgentTopics>,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_threshold() -> u32 {
    agora_types::params::DEFAULT_THRESHOLD
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_max_pages() -> usize {
    DEFAULT_MAX_PAGES
}

fn default_true() -> bool {
    true
}

fn default_poll_attempts() -> u32 {
    5
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_activity_retry_attempts() -> u32 {
    3
}

fn default_mirror_url() -> String {
    "http://127.0.0.1:5551".to_string()
}

fn default_gateway_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_rpc_port() -> u16 {
    7077
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            backend: LedgerBackend::default(),
            mirror_url: default_mirror_url(),
            gateway_url: default_gateway_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// The settings every engine component is constructed from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub params: ConsensusParams,
    pub page_size: usize,
    pub max_pages: usize,
    pub recheck_before_append: bool,
    pub read_after_write: ReadAfterWrite,
    pub activity_retry: RetryPolicy,
    pub category_topics: BTreeMap<Category, TopicId>,
    pub discovery_topic: Option<TopicId>,
    pub directory_overrides: HashMap<AgentId, AgentTopics>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            params: ConsensusParams::default(),
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            recheck_before_append: true,
            read_after_write: ReadAfterWrite::default(),
            activity_retry: RetryPolicy::default(),
            category_topics: BTreeMap::new(),
            discovery_topic: None,
            directory_overrides: HashMap::new(),
        }
    }
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, EngineError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| EngineError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, EngineError> {
        toml::from_str(s).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, EngineError> {
        toml::to_string_pretty(self).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Validate and convert into the runtime [`EngineConfig`].
    pub fn engine_config(&self) -> Result<EngineConfig, EngineError> {
        if self.threshold == 0 {
            return Err(EngineError::Config("threshold must be at least 1".into()));
        }

        let mut category_topics = BTreeMap::new();
        for (name, topic) in &self.topics.categories {
            let category: Category = name
                .parse()
                .map_err(|e| EngineError::Config(format!("topics.categories: {e}")))?;
            category_topics.insert(category, topic.clone());
        }

        let read_after_write = match self.read_after_write {
            ReadAfterWriteMode::Optimistic => ReadAfterWrite::Optimistic,
            ReadAfterWriteMode::Poll => ReadAfterWrite::Poll {
                attempts: self.poll_attempts.max(1),
                interval: Duration::from_millis(self.poll_interval_ms),
            },
        };

        Ok(EngineConfig {
            params: ConsensusParams::new(self.threshold),
            page_size: self.page_size,
            max_pages: self.max_pages,
            recheck_before_append: self.recheck_before_append,
            read_after_write,
            activity_retry: RetryPolicy::new(
                self.activity_retry_attempts,
                Duration::from_millis(200),
            ),
            category_topics,
            discovery_topic: self.topics.discovery.clone(),
            directory_overrides: self
                .directory
                .iter()
                .map(|(agent, topics)| (agent.clone(), topics.clone()))
                .collect(),
        })
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            recheck_before_append: default_true(),
            read_after_write: ReadAfterWriteMode::default(),
            poll_attempts: default_poll_attempts(),
            poll_interval_ms: default_poll_interval_ms(),
            activity_retry_attempts: default_activity_retry_attempts(),
            topics: TopicsConfig::default(),
            ledger: LedgerConfig::default(),
            secondary: SecondaryConfig::default(),
            identity: IdentityConfig::default(),
            directory: BTreeMap::new(),
            rpc_port: default_rpc_port(),
            bind_address: default_bind_address(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            enable_metrics: false,
        }
    }
}
