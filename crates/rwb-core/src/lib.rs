//! Core domain model and error taxonomy for RWB.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const CRATE_NAME: &str = "rwb-core";

/// Record-type tag selecting which schema and destination table an upload maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Sales,
    ProductMaster,
    StoreMaster,
    PromoCalendar,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Sales => "sales",
            JobKind::ProductMaster => "product_master",
            JobKind::StoreMaster => "store_master",
            JobKind::PromoCalendar => "promo_calendar",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "sales" => Some(JobKind::Sales),
            "product_master" => Some(JobKind::ProductMaster),
            "store_master" => Some(JobKind::StoreMaster),
            "promo_calendar" => Some(JobKind::PromoCalendar),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "queued" => Some(JobStatus::Queued),
            "running" => Some(JobStatus::Running),
            "done" => Some(JobStatus::Done),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

/// One upload-processing job. Created externally; only its status and
/// failure message are mutated by the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub group_id: Option<String>,
    /// Nullable: legacy personal workspaces have no organization.
    pub org_id: Option<String>,
    pub kind: JobKind,
    pub path: String,
    pub status: JobStatus,
    pub message: Option<String>,
}

impl Job {
    /// Workspace identifier resolution: `group_id` wins, `org_id` is the
    /// backward-compat fallback.
    pub fn workspace_id(&self) -> Option<&str> {
        self.group_id.as_deref().or(self.org_id.as_deref())
    }
}

/// Persisted sales row, unique per (workspace, date, store, SKU).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesFact {
    pub group_id: String,
    pub org_id: Option<String>,
    pub date: NaiveDate,
    pub store_id: String,
    pub sku: String,
    pub product_name: String,
    pub units: f64,
    pub net_sales: f64,
    pub discount: f64,
    pub cost: f64,
    pub category: String,
    pub sub_category: String,
}

/// Fully derived rollup, one row per (workspace, date, store, category).
/// Always replaced wholesale per workspace on recomputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregate {
    pub group_id: String,
    pub org_id: Option<String>,
    pub date: NaiveDate,
    pub store_id: String,
    pub category: String,
    pub units: f64,
    pub net_sales: f64,
    pub gm_dollar: f64,
    pub gm_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: String,
    pub revenue: f64,
    pub gm_dollar: f64,
    pub gm_pct: f64,
}

/// A flagged (date, category) observation: daily revenue at least two
/// standard deviations from that category's trailing-window mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub date: NaiveDate,
    pub category: String,
    pub revenue: f64,
    pub delta_pct: f64,
}

/// Top-line KPIs for one run. Ephemeral: consumed by narrative generation
/// and brief rendering, never persisted as its own row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub revenue: f64,
    pub gm_dollar: f64,
    pub gm_pct: f64,
    pub units: f64,
    pub top_categories: Vec<CategorySummary>,
    pub anomalies: Vec<Anomaly>,
}

/// Persisted brief row; `pdf_path` is attached only after the artifact
/// upload succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BriefRecord {
    pub id: Uuid,
    pub group_id: String,
    pub org_id: Option<String>,
    pub content_md: String,
    pub content_hash: String,
    pub pdf_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("mapping error: source column `{source_column}` (mapped to `{field}`) not present in upload")]
    Mapping {
        field: String,
        source_column: String,
    },
    #[error("schema error: missing required columns: {}", .columns.join(", "))]
    Schema { columns: Vec<String> },
    #[error("empty input: upload has no data rows")]
    EmptyInput,
    #[error("type error: column `{column}`: {reason}")]
    Type { column: String, reason: String },
    #[error("validation error: {0}")]
    Validation(String),
    #[error("upstream error: {0}")]
    Upstream(String),
}

impl WorkerError {
    pub fn upstream(err: impl std::fmt::Display) -> Self {
        WorkerError::Upstream(err.to_string())
    }
}

/// Ratio with the worker-wide zero-denominator policy: every derived
/// percentage is defined, and is 0 when the denominator is 0.
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}
