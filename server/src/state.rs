use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// One loaded copy of the dataset file plus payloads derived from it.
/// Responses are pre-serialized once per load and shared via Arc.
#[derive(Debug, Clone)]
pub struct DatasetSnapshot {
    /// Bumped on every successful load for the lifetime of the process.
    pub seq: u64,
    /// Load sequence plus a digest of the bytes, so a restart or a replaced
    /// file never reuses a validator for different content.
    pub etag: String,
    pub geojson: Arc<Bytes>,
    pub subzones_json: Arc<Bytes>,
    /// Features in the collection, or 0 when the file does not parse.
    pub region_count: usize,
    pub modified: Option<SystemTime>,
    pub loaded_at: DateTime<Utc>,
}

/// `{count, subzones}` listing. `count` is the number of named features,
/// `subzones` is sorted and deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubzoneList {
    pub count: usize,
    pub subzones: Vec<String>,
}

/// Parameters of the scoring kernel. Held in memory only; the map reads the
/// precomputed scores and never evaluates the kernel itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(non_snake_case)]
pub struct KernelConfig {
    #[serde(default = "default_kernel_kind")]
    pub kernel_kind: String,
    #[serde(default = "default_lambda_short")]
    pub lambda_D: f64,
    #[serde(default = "default_lambda_short")]
    pub lambda_S: f64,
    #[serde(default = "default_lambda_short")]
    pub lambda_C: f64,
    #[serde(default = "default_lambda_mrt")]
    pub lambda_M: f64,
    #[serde(default = "default_lambda_bus")]
    pub lambda_B: f64,
    #[serde(default = "default_w_demand")]
    pub w_D: f64,
    #[serde(default = "default_w_supply")]
    pub w_S: f64,
    #[serde(default = "default_w_access")]
    pub w_A: f64,
    #[serde(default = "default_beta")]
    pub beta_MRT: f64,
    #[serde(default = "default_beta")]
    pub beta_BUS: f64,
}

fn default_kernel_kind() -> String {
    "exp".to_string()
}
fn default_lambda_short() -> f64 {
    700.0
}
fn default_lambda_mrt() -> f64 {
    900.0
}
fn default_lambda_bus() -> f64 {
    500.0
}
fn default_w_demand() -> f64 {
    0.5
}
fn default_w_supply() -> f64 {
    0.3
}
fn default_w_access() -> f64 {
    0.2
}
fn default_beta() -> f64 {
    1.0
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            kernel_kind: default_kernel_kind(),
            lambda_D: default_lambda_short(),
            lambda_S: default_lambda_short(),
            lambda_C: default_lambda_short(),
            lambda_M: default_lambda_mrt(),
            lambda_B: default_lambda_bus(),
            w_D: default_w_demand(),
            w_S: default_w_supply(),
            w_A: default_w_access(),
            beta_MRT: default_beta(),
            beta_BUS: default_beta(),
        }
    }
}

impl KernelConfig {
    fn numeric_fields(&self) -> [(&'static str, f64); 10] {
        [
            ("lambda_D", self.lambda_D),
            ("lambda_S", self.lambda_S),
            ("lambda_C", self.lambda_C),
            ("lambda_M", self.lambda_M),
            ("lambda_B", self.lambda_B),
            ("w_D", self.w_D),
            ("w_S", self.w_S),
            ("w_A", self.w_A),
            ("beta_MRT", self.beta_MRT),
            ("beta_BUS", self.beta_BUS),
        ]
    }

    /// Returns the name of the first offending field.
    pub fn validate(&self) -> Result<(), String> {
        if self.kernel_kind.trim().is_empty() {
            return Err("kernel_kind must not be empty".to_string());
        }
        for (field, value) in self.numeric_fields() {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{field} must be a finite, non-negative number"));
            }
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct AppState {
    /// None until the dataset file has been read at least once.
    pub dataset: Arc<RwLock<Option<Arc<DatasetSnapshot>>>>,
    pub kernel_config: Arc<RwLock<KernelConfig>>,
    /// Last issued load sequence. Survives the snapshot being cleared.
    pub dataset_seq: Arc<AtomicU64>,
    pub geojson_path: PathBuf,
    pub static_dir: PathBuf,
}

impl AppState {
    pub fn new(geojson_path: PathBuf, static_dir: PathBuf) -> Self {
        Self {
            dataset: Arc::new(RwLock::new(None)),
            kernel_config: Arc::new(RwLock::new(KernelConfig::default())),
            dataset_seq: Arc::new(AtomicU64::new(0)),
            geojson_path,
            static_dir,
        }
    }

    pub async fn dataset(&self) -> Option<Arc<DatasetSnapshot>> {
        self.dataset.read().await.clone()
    }

    pub fn next_seq(&self) -> u64 {
        self.dataset_seq.fetch_add(1, Ordering::Relaxed) + 1
    }
}
