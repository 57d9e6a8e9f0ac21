//! CSV decoding, schema validation, and type normalization for uploads.
//!
//! Validation is a pure function from (raw dataset, kind, optional rename
//! mapping) to a typed batch or an error. Rejection is all-or-nothing: a
//! single bad value fails the whole upload.

use std::collections::HashMap;

use chrono::NaiveDate;
use rwb_core::{JobKind, WorkerError};
use serde::Serialize;

pub const CRATE_NAME: &str = "rwb-ingest";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Raw tabular dataset: a header row plus string cells, one `Vec<String>`
/// per data row. The declared schema lives in the per-kind contracts below,
/// not in this value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self, WorkerError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let columns = reader
            .headers()
            .map_err(|err| WorkerError::Validation(format!("csv header decode failed: {err}")))?
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();

        let mut rows = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record.map_err(|err| {
                WorkerError::Validation(format!("csv decode failed at data row {}: {err}", idx + 1))
            })?;
            rows.push(record.iter().map(ToString::to_string).collect());
        }

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    fn rename_column(&mut self, from: &str, to: &str) {
        if let Some(idx) = self.column_index(from) {
            self.columns[idx] = to.to_string();
        }
    }
}

/// Required-column contract per record kind. Uploads may carry extra
/// columns; they are dropped during normalization.
pub fn required_columns(kind: JobKind) -> &'static [&'static str] {
    match kind {
        JobKind::Sales => &[
            "date",
            "store_id",
            "sku",
            "product_name",
            "units",
            "net_sales",
            "discount",
            "cost",
            "category",
            "sub_category",
        ],
        JobKind::ProductMaster => &[
            "sku",
            "product_name",
            "category",
            "sub_category",
            "default_cost",
            "status",
        ],
        JobKind::StoreMaster => &[
            "store_id",
            "store_name",
            "region",
            "city",
            "currency",
            "is_active",
        ],
        JobKind::PromoCalendar => &[
            "start_date",
            "end_date",
            "promo_name",
            "sku",
            "promo_type",
            "discount_pct",
        ],
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesRow {
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

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRow {
    pub sku: String,
    pub product_name: String,
    pub category: String,
    pub sub_category: String,
    pub default_cost: f64,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreRow {
    pub store_id: String,
    pub store_name: String,
    pub region: String,
    pub city: String,
    pub currency: String,
    pub is_active: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromoRow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub promo_name: String,
    pub sku: String,
    pub promo_type: String,
    pub discount_pct: f64,
}

/// Validated, type-normalized upload ready for ingestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum NormalizedBatch {
    Sales(Vec<SalesRow>),
    ProductMaster(Vec<ProductRow>),
    StoreMaster(Vec<StoreRow>),
    PromoCalendar(Vec<PromoRow>),
}

impl NormalizedBatch {
    pub fn len(&self) -> usize {
        match self {
            NormalizedBatch::Sales(rows) => rows.len(),
            NormalizedBatch::ProductMaster(rows) => rows.len(),
            NormalizedBatch::StoreMaster(rows) => rows.len(),
            NormalizedBatch::PromoCalendar(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Rename source columns to their canonical names. Every mapped source
/// column must exist before any rename happens.
pub fn apply_mapping(
    dataset: &mut Dataset,
    mapping: &HashMap<String, String>,
) -> Result<(), WorkerError> {
    for (field, source) in mapping {
        if dataset.column_index(source).is_none() {
            return Err(WorkerError::Mapping {
                field: field.clone(),
                source_column: source.clone(),
            });
        }
    }
    for (field, source) in mapping {
        dataset.rename_column(source, field);
    }
    Ok(())
}

/// Check the kind's required-column set, reporting every missing column at
/// once rather than just the first.
pub fn check_required_columns(dataset: &Dataset, kind: JobKind) -> Result<(), WorkerError> {
    let missing = required_columns(kind)
        .iter()
        .filter(|name| dataset.column_index(name).is_none())
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(WorkerError::Schema { columns: missing })
    }
}

/// Full validation front door: empty check, rename mapping, required
/// columns, then per-kind type coercion and domain rules.
pub fn validate_and_normalize(
    mut dataset: Dataset,
    kind: JobKind,
    mapping: Option<&HashMap<String, String>>,
) -> Result<NormalizedBatch, WorkerError> {
    if dataset.is_empty() {
        return Err(WorkerError::EmptyInput);
    }
    if let Some(mapping) = mapping {
        apply_mapping(&mut dataset, mapping)?;
    }
    check_required_columns(&dataset, kind)?;
    normalize(&dataset, kind)
}

fn normalize(dataset: &Dataset, kind: JobKind) -> Result<NormalizedBatch, WorkerError> {
    match kind {
        JobKind::Sales => normalize_sales(dataset).map(NormalizedBatch::Sales),
        JobKind::ProductMaster => normalize_products(dataset).map(NormalizedBatch::ProductMaster),
        JobKind::StoreMaster => normalize_stores(dataset).map(NormalizedBatch::StoreMaster),
        JobKind::PromoCalendar => normalize_promos(dataset).map(NormalizedBatch::PromoCalendar),
    }
}

fn column(dataset: &Dataset, name: &str) -> Result<usize, WorkerError> {
    dataset.column_index(name).ok_or_else(|| WorkerError::Schema {
        columns: vec![name.to_string()],
    })
}

fn parse_date(column: &str, raw: &str) -> Result<NaiveDate, WorkerError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| WorkerError::Type {
        column: column.to_string(),
        reason: format!("`{raw}` is not a {DATE_FORMAT} date"),
    })
}

fn parse_number(column: &str, raw: &str) -> Result<f64, WorkerError> {
    raw.trim().parse::<f64>().map_err(|_| WorkerError::Type {
        column: column.to_string(),
        reason: format!("`{raw}` is not a number"),
    })
}

fn normalize_sales(dataset: &Dataset) -> Result<Vec<SalesRow>, WorkerError> {
    let date = column(dataset, "date")?;
    let store_id = column(dataset, "store_id")?;
    let sku = column(dataset, "sku")?;
    let product_name = column(dataset, "product_name")?;
    let units = column(dataset, "units")?;
    let net_sales = column(dataset, "net_sales")?;
    let discount = column(dataset, "discount")?;
    let cost = column(dataset, "cost")?;
    let category = column(dataset, "category")?;
    let sub_category = column(dataset, "sub_category")?;

    dataset
        .rows
        .iter()
        .map(|row| {
            Ok(SalesRow {
                date: parse_date("date", &row[date])?,
                store_id: row[store_id].clone(),
                sku: row[sku].clone(),
                product_name: row[product_name].clone(),
                units: parse_number("units", &row[units])?,
                net_sales: parse_number("net_sales", &row[net_sales])?,
                discount: parse_number("discount", &row[discount])?,
                cost: parse_number("cost", &row[cost])?,
                category: row[category].clone(),
                sub_category: row[sub_category].clone(),
            })
        })
        .collect()
}

fn normalize_products(dataset: &Dataset) -> Result<Vec<ProductRow>, WorkerError> {
    let sku = column(dataset, "sku")?;
    let product_name = column(dataset, "product_name")?;
    let category = column(dataset, "category")?;
    let sub_category = column(dataset, "sub_category")?;
    let default_cost = column(dataset, "default_cost")?;
    let status = column(dataset, "status")?;

    dataset
        .rows
        .iter()
        .map(|row| {
            Ok(ProductRow {
                sku: row[sku].clone(),
                product_name: row[product_name].clone(),
                category: row[category].clone(),
                sub_category: row[sub_category].clone(),
                default_cost: parse_number("default_cost", &row[default_cost])?,
                // Status stays in its uploaded string form.
                status: row[status].clone(),
            })
        })
        .collect()
}

fn normalize_stores(dataset: &Dataset) -> Result<Vec<StoreRow>, WorkerError> {
    let store_id = column(dataset, "store_id")?;
    let store_name = column(dataset, "store_name")?;
    let region = column(dataset, "region")?;
    let city = column(dataset, "city")?;
    let currency = column(dataset, "currency")?;
    let is_active = column(dataset, "is_active")?;

    Ok(dataset
        .rows
        .iter()
        .map(|row| StoreRow {
            store_id: row[store_id].clone(),
            store_name: row[store_name].clone(),
            region: row[region].clone(),
            city: row[city].clone(),
            currency: row[currency].clone(),
            is_active: row[is_active].clone(),
        })
        .collect())
}

fn normalize_promos(dataset: &Dataset) -> Result<Vec<PromoRow>, WorkerError> {
    let start_date = column(dataset, "start_date")?;
    let end_date = column(dataset, "end_date")?;
    let promo_name = column(dataset, "promo_name")?;
    let sku = column(dataset, "sku")?;
    let promo_type = column(dataset, "promo_type")?;
    let discount_pct = column(dataset, "discount_pct")?;

    dataset
        .rows
        .iter()
        .map(|row| {
            let promo = PromoRow {
                start_date: parse_date("start_date", &row[start_date])?,
                end_date: parse_date("end_date", &row[end_date])?,
                promo_name: row[promo_name].clone(),
                sku: row[sku].clone(),
                promo_type: row[promo_type].clone(),
                discount_pct: parse_number("discount_pct", &row[discount_pct])?,
            };
            if promo.end_date < promo.start_date {
                return Err(WorkerError::Validation(format!(
                    "promo `{}`: end_date {} precedes start_date {}",
                    promo.promo_name, promo.end_date, promo.start_date
                )));
            }
            if !(0.0..=100.0).contains(&promo.discount_pct) {
                return Err(WorkerError::Validation(format!(
                    "promo `{}`: discount_pct {} outside [0, 100]",
                    promo.promo_name, promo.discount_pct
                )));
            }
            Ok(promo)
        })
        .collect()
}
