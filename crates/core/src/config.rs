use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `FUNNEL_PULSE__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_property_id")]
    pub property_id: String,
    #[serde(default = "default_date_range")]
    pub date_range: String,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
}

/// Outlier detection thresholds. The severity multipliers are heuristic
/// constants, kept overridable rather than baked into the detector.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Relative deviation above which a value becomes an outlier (0.20 = ±20%).
    #[serde(default = "default_outlier_threshold")]
    pub outlier_threshold: f64,
    /// |deviation| >= threshold * critical_multiplier -> critical.
    #[serde(default = "default_critical_multiplier")]
    pub critical_multiplier: f64,
    /// |deviation| >= threshold * high_multiplier -> high.
    #[serde(default = "default_high_multiplier")]
    pub high_multiplier: f64,
    /// Default length of the top-opportunity / critical-issue views.
    #[serde(default = "default_ranked_limit")]
    pub ranked_limit: usize,
}

/// Insight cache sizing and expiry.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u64,
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

/// External storage quota and batch sizing.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Hard quota of the downstream data table, in MB.
    #[serde(default = "default_quota_mb")]
    pub quota_mb: f64,
    /// Usage percentage above which storage estimates carry a warning.
    #[serde(default = "default_warn_percent")]
    pub warn_percent: f64,
    /// Budget used when sizing historical batches, in MB.
    #[serde(default = "default_max_storage_mb")]
    pub max_storage_mb: f64,
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    /// Days of historical records retained in full detail.
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
}

/// Cool-down between calls to the external insight generator.
#[derive(Debug, Clone, Deserialize)]
pub struct PacingConfig {
    #[serde(default = "default_min_call_interval_ms")]
    pub min_call_interval_ms: u64,
}

// Default functions
fn default_property_id() -> String {
    "123456789".to_string()
}
fn default_date_range() -> String {
    "last_30_days".to_string()
}
fn default_outlier_threshold() -> f64 {
    0.20
}
fn default_critical_multiplier() -> f64 {
    2.0
}
fn default_high_multiplier() -> f64 {
    1.5
}
fn default_ranked_limit() -> usize {
    5
}
fn default_ttl_hours() -> u64 {
    24
}
fn default_max_entries() -> usize {
    100
}
fn default_quota_mb() -> f64 {
    54.0
}
fn default_warn_percent() -> f64 {
    90.0
}
fn default_max_storage_mb() -> f64 {
    50.0
}
fn default_max_batch_size() -> usize {
    100
}
fn default_retention_days() -> i64 {
    30
}
fn default_min_call_interval_ms() -> u64 {
    1000
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            outlier_threshold: default_outlier_threshold(),
            critical_multiplier: default_critical_multiplier(),
            high_multiplier: default_high_multiplier(),
            ranked_limit: default_ranked_limit(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_hours: default_ttl_hours(),
            max_entries: default_max_entries(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            quota_mb: default_quota_mb(),
            warn_percent: default_warn_percent(),
            max_storage_mb: default_max_storage_mb(),
            max_batch_size: default_max_batch_size(),
            retention_days: default_retention_days(),
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_call_interval_ms: default_min_call_interval_ms(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            property_id: default_property_id(),
            date_range: default_date_range(),
            analysis: AnalysisConfig::default(),
            cache: CacheConfig::default(),
            storage: StorageConfig::default(),
            pacing: PacingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("FUNNEL_PULSE")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
