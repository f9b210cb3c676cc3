use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use jsonschema::{JSONSchema, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub licensing: LicensingConfig,
    #[serde(default)]
    pub provisioning: ProvisioningConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where a Graph credential value comes from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialRef {
    Env { var: String },
    Inline { value: String },
}

impl CredentialRef {
    fn env(var: &str) -> Self {
        Self::Env {
            var: var.to_string(),
        }
    }
}

fn default_graph_endpoint() -> String {
    "https://graph.microsoft.com".to_string()
}

fn default_login_endpoint() -> String {
    "https://login.microsoftonline.com".to_string()
}

fn default_api_version() -> String {
    "v1.0".to_string()
}

fn default_tenant_id() -> CredentialRef {
    CredentialRef::env("AZURE_TENANT_ID")
}

fn default_client_id() -> CredentialRef {
    CredentialRef::env("AZURE_CLIENT_ID")
}

fn default_client_secret() -> CredentialRef {
    CredentialRef::env("AZURE_CLIENT_SECRET")
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_graph_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_login_endpoint")]
    pub login_endpoint: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_tenant_id")]
    pub tenant_id: CredentialRef,
    #[serde(default = "default_client_id")]
    pub client_id: CredentialRef,
    #[serde(default = "default_client_secret")]
    pub client_secret: CredentialRef,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            endpoint: default_graph_endpoint(),
            login_endpoint: default_login_endpoint(),
            api_version: default_api_version(),
            tenant_id: default_tenant_id(),
            client_id: default_client_id(),
            client_secret: default_client_secret(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

pub fn default_sku_patterns() -> Vec<String> {
    [
        "CPC_E_",
        "CPC_B_",
        "CPC_S_",
        "CPC_SS_",
        "CPC_LVL_",
        "CPC_1",
        "CPC_2",
        "WHB",
        "Windows_365_Business",
        "Windows_365_S_",
        "CPC_ENTERPRISE",
        "CPC_BUSINESS",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicensingConfig {
    #[serde(default = "default_sku_patterns")]
    pub sku_patterns: Vec<String>,
}

impl Default for LicensingConfig {
    fn default() -> Self {
        Self {
            sku_patterns: default_sku_patterns(),
        }
    }
}

/// How an "already a member" answer from the directory is treated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MembershipConflictPolicy {
    #[default]
    Fail,
    TreatAsMember,
}

fn default_group_markers() -> Vec<String> {
    vec!["CloudPC".to_string(), "Windows365".to_string()]
}

fn default_group_lookup_limit() -> u32 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisioningConfig {
    #[serde(default = "default_group_markers")]
    pub default_group_markers: Vec<String>,
    #[serde(default = "default_group_lookup_limit")]
    pub default_group_lookup_limit: u32,
    #[serde(default)]
    pub membership_conflict: MembershipConflictPolicy,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            default_group_markers: default_group_markers(),
            default_group_lookup_limit: default_group_lookup_limit(),
            membership_conflict: MembershipConflictPolicy::default(),
        }
    }
}

fn default_page_size() -> usize {
    50
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
        }
    }
}

fn default_enabled_true() -> bool {
    true
}

fn default_logging_dir() -> PathBuf {
    PathBuf::from("./logs")
}

fn default_logging_filter() -> String {
    "info".to_string()
}

fn default_logging_rotation() -> LoggingRotation {
    LoggingRotation::Daily
}

fn default_logging_retention_days() -> usize {
    14
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LoggingRotation {
    Daily,
    Hourly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_logging_filter")]
    pub filter: String,
    #[serde(default = "default_logging_rotation")]
    pub rotation: LoggingRotation,
    #[serde(default = "default_logging_retention_days")]
    pub retention_days: usize,
    #[serde(default = "default_enabled_true")]
    pub stderr_warn_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_logging_dir(),
            filter: default_logging_filter(),
            rotation: default_logging_rotation(),
            retention_days: default_logging_retention_days(),
            stderr_warn_enabled: true,
        }
    }
}

impl Config {
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let config_value: Value = json5::from_str(&config_content)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;

        let config_base = config_path.parent().unwrap_or_else(|| Path::new("."));
        let schema_path = resolve_schema_path(config_base, &config_value)?;
        validate_against_schema(&config_value, &schema_path)?;

        let mut config: Config =
            serde_json::from_value(config_value).context("failed to deserialize config")?;

        if !config.logging.dir.is_absolute() {
            config.logging.dir = config_base.join(&config.logging.dir);
        }

        Ok(config)
    }
}

fn resolve_schema_path(config_base: &Path, config_value: &Value) -> Result<PathBuf> {
    if let Some(path_text) = config_value.get("$schema").and_then(|value| value.as_str()) {
        let configured = PathBuf::from(path_text);
        if configured.is_absolute() {
            return Ok(configured);
        }
        return Ok(config_base.join(&configured));
    }

    let root_default = config_base.join("core/deskfleet.schema.json");
    if root_default.exists() {
        return Ok(root_default);
    }

    let local_default = config_base.join("deskfleet.schema.json");
    if local_default.exists() {
        return Ok(local_default);
    }

    Err(anyhow!(
        "unable to resolve schema path: expected $schema in config, core/deskfleet.schema.json, or deskfleet.schema.json"
    ))
}

fn validate_against_schema(config_value: &Value, schema_path: &Path) -> Result<()> {
    let schema_content = fs::read_to_string(schema_path)
        .with_context(|| format!("failed to read schema {}", schema_path.display()))?;
    let schema: Value = serde_json::from_str(&schema_content)
        .with_context(|| format!("failed to parse schema {}", schema_path.display()))?;

    let compiled =
        JSONSchema::compile(&schema).map_err(|e| anyhow!("failed to compile schema: {e}"))?;

    match compiled.validate(config_value) {
        Ok(()) => Ok(()),
        Err(errors_iter) => {
            let validation_errors: Vec<ValidationError> = errors_iter.collect();
            let messages: Vec<String> = validation_errors
                .into_iter()
                .map(|error| error.to_string())
                .collect();
            Err(anyhow!("config validation failed: {}", messages.join("; ")))
        }
    }
}
