// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0

// Engine Configuration Types
//
// Defines the configuration schema for Arbiter trust-engine daemons:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - HTTP server binding
// - Storage backend selection (in-memory or PostgreSQL)
// - Trust scoring weights, windows, and trigger thresholds
// - Observability settings (logging, Prometheus metrics)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::domain::repository::{PostgresConfig, StorageBackend};
use crate::domain::trust::ScoreWeights;

/// Top-level Kubernetes-style engine configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfigManifest {
    /// API version (must be "arbiter.dev/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "EngineConfig")
    pub kind: String,

    /// Manifest metadata (name, labels, version)
    pub metadata: ManifestMetadata,

    /// Engine configuration specification
    pub spec: EngineConfigSpec,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable deployment name
    pub name: String,

    /// Optional: Configuration version for tracking
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Optional: Labels for categorization and discovery
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

/// Engine configuration specification (content under spec:)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfigSpec {
    /// HTTP server binding
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend selection
    #[serde(default)]
    pub storage: StorageConfig,

    /// Trust scoring parameters
    #[serde(default)]
    pub trust: TrustConfig,

    /// Observability configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observability: Option<ObservabilityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Network bind address (e.g. "0.0.0.0" or "127.0.0.1")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP API port
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_api_port(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend selector: "memory" for development/testing, "postgres" for
    /// production persistence
    #[serde(default = "default_storage_backend")]
    pub backend: StorageBackendKind,

    /// PostgreSQL connection string; required when backend is "postgres".
    /// Schema management is external; the engine assumes the tables exist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            connection_string: None,
        }
    }
}

/// Trust scoring parameters. Every threshold the engine consults lives
/// here so services receive configuration values, never module globals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustConfig {
    /// Factor weights for the score compositor
    #[serde(default)]
    pub weights: ScoreWeights,

    /// SLA latency threshold in milliseconds (5 minutes)
    #[serde(default = "default_sla_threshold_ms")]
    pub sla_threshold_ms: i64,

    /// Rolling history window for metric aggregation, in days
    #[serde(default = "default_metrics_window_days")]
    pub metrics_window_days: i64,

    /// Discrete trigger rules over the short recent window
    #[serde(default)]
    pub triggers: TriggerConfig,

    /// Reassignment decision thresholds
    #[serde(default)]
    pub reassignment: ReassignmentConfig,

    /// Retrospective audit parameters
    #[serde(default)]
    pub audit: AuditConfig,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            sla_threshold_ms: default_sla_threshold_ms(),
            metrics_window_days: default_metrics_window_days(),
            triggers: TriggerConfig::default(),
            reassignment: ReassignmentConfig::default(),
            audit: AuditConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Wall-clock window the trigger rules look at, in seconds
    #[serde(default = "default_trigger_window_secs")]
    pub window_secs: i64,

    /// Latency above which a task counts as delayed, in milliseconds
    #[serde(default = "default_sla_threshold_ms")]
    pub delayed_latency_ms: i64,

    /// Delayed tasks needed for the penalty to fire
    #[serde(default = "default_delayed_task_threshold")]
    pub delayed_task_threshold: u32,

    /// Penalty applied when the delayed-tasks rule fires (negative)
    #[serde(default = "default_delayed_penalty")]
    pub delayed_penalty: f64,

    /// On-time completions needed for the bonus to fire
    #[serde(default = "default_sla_bonus_threshold")]
    pub sla_bonus_threshold: u32,

    /// Bonus applied when the SLA-compliance rule fires (positive)
    #[serde(default = "default_sla_bonus")]
    pub sla_bonus: f64,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            window_secs: default_trigger_window_secs(),
            delayed_latency_ms: default_sla_threshold_ms(),
            delayed_task_threshold: default_delayed_task_threshold(),
            delayed_penalty: default_delayed_penalty(),
            sla_bonus_threshold: default_sla_bonus_threshold(),
            sla_bonus: default_sla_bonus(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReassignmentConfig {
    /// Elapsed wall-clock time after which an in-flight assignment is
    /// considered stuck, in milliseconds. Intentionally aggressive (5
    /// seconds); this is a fast circuit-breaker, not the 5-minute SLA.
    #[serde(default = "default_reassign_latency_ms")]
    pub latency_threshold_ms: i64,

    /// Cumulative trust delta since assignment at or below which the
    /// current agent is dropped
    #[serde(default = "default_trust_drop_threshold")]
    pub trust_drop_threshold: f64,
}

impl Default for ReassignmentConfig {
    fn default() -> Self {
        Self {
            latency_threshold_ms: default_reassign_latency_ms(),
            trust_drop_threshold: default_trust_drop_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Score below which a negative swing counts as a dip
    #[serde(default = "default_audit_threshold")]
    pub threshold: f64,

    /// Lookback window, in hours
    #[serde(default = "default_audit_window_hours")]
    pub window_hours: i64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            threshold: default_audit_threshold(),
            window_hours: default_audit_window_hours(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Logging configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,

    /// Metrics configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics exposition
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint port
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    8700
}

fn default_storage_backend() -> StorageBackendKind {
    StorageBackendKind::Memory
}

fn default_sla_threshold_ms() -> i64 {
    300_000
}

fn default_metrics_window_days() -> i64 {
    30
}

fn default_trigger_window_secs() -> i64 {
    300
}

fn default_delayed_task_threshold() -> u32 {
    3
}

fn default_delayed_penalty() -> f64 {
    -15.0
}

fn default_sla_bonus_threshold() -> u32 {
    5
}

fn default_sla_bonus() -> f64 {
    10.0
}

fn default_reassign_latency_ms() -> i64 {
    5_000
}

fn default_trust_drop_threshold() -> f64 {
    -15.0
}

fn default_audit_threshold() -> f64 {
    70.0
}

fn default_audit_window_hours() -> i64 {
    24
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for EngineConfigManifest {
    fn default() -> Self {
        Self {
            api_version: "arbiter.dev/v1".to_string(),
            kind: "EngineConfig".to_string(),
            metadata: ManifestMetadata {
                name: "arbiter".to_string(),
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: EngineConfigSpec::default(),
        }
    }
}

impl EngineConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. ARBITER_CONFIG_PATH environment variable
    /// 2. ./arbiter-config.yaml (working directory)
    /// 3. ~/.arbiter/config.yaml (user home)
    /// 4. /etc/arbiter/config.yaml (system, Unix)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("ARBITER_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./arbiter-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".arbiter").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/arbiter/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\Arbiter\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    /// This allows container deployments to override config via env vars
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("ARBITER_DATABASE_URL") {
            if !url.is_empty() {
                tracing::info!("Environment override: ARBITER_DATABASE_URL set, using postgres backend");
                self.spec.storage.backend = StorageBackendKind::Postgres;
                self.spec.storage.connection_string = Some(url);
            }
        }

        if let Ok(val) = std::env::var("ARBITER_METRICS_ENABLED") {
            match val.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => {
                    self.metrics_config_mut().enabled = true;
                }
                "false" | "0" | "no" | "off" => {
                    self.metrics_config_mut().enabled = false;
                }
                _ => {
                    tracing::warn!(
                        "Invalid value for ARBITER_METRICS_ENABLED: '{}'. Expected true/false. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    fn metrics_config_mut(&mut self) -> &mut MetricsConfig {
        self.spec
            .observability
            .get_or_insert_with(|| ObservabilityConfig {
                logging: None,
                metrics: None,
            })
            .metrics
            .get_or_insert_with(|| MetricsConfig {
                enabled: true,
                port: default_metrics_port(),
            })
    }

    /// Resolve the storage backend selection into the repository-layer enum
    pub fn storage_backend(&self) -> anyhow::Result<StorageBackend> {
        match self.spec.storage.backend {
            StorageBackendKind::Memory => Ok(StorageBackend::InMemory),
            StorageBackendKind::Postgres => {
                let connection_string = self
                    .spec
                    .storage
                    .connection_string
                    .clone()
                    .ok_or_else(|| {
                        anyhow::anyhow!(
                            "storage.connection_string is required when backend is 'postgres'"
                        )
                    })?;
                Ok(StorageBackend::PostgreSQL(PostgresConfig { connection_string }))
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != "arbiter.dev/v1" {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be 'arbiter.dev/v1'",
                self.api_version
            );
        }

        if self.kind != "EngineConfig" {
            anyhow::bail!("Invalid kind: '{}'. Must be 'EngineConfig'", self.kind);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if let Err(e) = self.spec.trust.weights.validate() {
            anyhow::bail!("Invalid trust weights: {}", e);
        }

        let trust = &self.spec.trust;
        if trust.sla_threshold_ms <= 0 {
            anyhow::bail!("trust.sla_threshold_ms must be positive");
        }
        if trust.metrics_window_days <= 0 {
            anyhow::bail!("trust.metrics_window_days must be positive");
        }
        if trust.triggers.window_secs <= 0 {
            anyhow::bail!("trust.triggers.window_secs must be positive");
        }
        if trust.triggers.delayed_penalty > 0.0 {
            anyhow::bail!("trust.triggers.delayed_penalty must not be positive");
        }
        if trust.triggers.sla_bonus < 0.0 {
            anyhow::bail!("trust.triggers.sla_bonus must not be negative");
        }
        if trust.reassignment.latency_threshold_ms <= 0 {
            anyhow::bail!("trust.reassignment.latency_threshold_ms must be positive");
        }
        if trust.reassignment.trust_drop_threshold > 0.0 {
            anyhow::bail!("trust.reassignment.trust_drop_threshold must not be positive");
        }
        if !(0.0..=100.0).contains(&trust.audit.threshold) {
            anyhow::bail!("trust.audit.threshold must sit in [0, 100]");
        }
        if trust.audit.window_hours <= 0 {
            anyhow::bail!("trust.audit.window_hours must be positive");
        }

        if self.spec.storage.backend == StorageBackendKind::Postgres
            && self.spec.storage.connection_string.is_none()
        {
            anyhow::bail!("storage.connection_string is required when backend is 'postgres'");
        }

        Ok(())
    }
}
