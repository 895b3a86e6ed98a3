//! Presentation boundary.
//!
//! The wizard core talks to the screen only through [`Renderer`]. Two implementations exist:
//! [`html::HtmlRenderer`] (markup fragments for the report page) and the terminal renderer in
//! `crate::tui`. Both share the row formatting below, so "N/A" substitution and the
//! classification tag are identical everywhere.

pub mod html;

use chrono::{DateTime, Local};

use crate::models::responses::AnalyticsRow;
use crate::wizard::Step;

pub const NOT_AVAILABLE: &str = "N/A";

pub const RESULT_COLUMNS: [&str; 6] = [
    "Customer ID",
    "Total Orders",
    "Avg Order Gap (days)",
    "Last Order Date",
    "Predicted Next Order",
    "Classification",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Error,
    Loading,
}

impl StatusKind {
    pub fn as_class(&self) -> &'static str {
        match self {
            StatusKind::Success => "success",
            StatusKind::Error => "error",
            StatusKind::Loading => "loading",
        }
    }
}

/// A finished analysis, ready to paint.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsReport {
    pub collection: String,
    pub rows: Vec<AnalyticsRow>,
    /// Client-side time the report was rendered (not server time).
    pub rendered_at: DateTime<Local>,
}

impl AnalyticsReport {
    pub fn new(collection: impl Into<String>, rows: Vec<AnalyticsRow>) -> Self {
        Self {
            collection: collection.into(),
            rows,
            rendered_at: Local::now(),
        }
    }

    pub fn rendered_at_display(&self) -> String {
        self.rendered_at.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    pub fn table_rows(&self) -> Vec<TableRow> {
        self.rows.iter().map(TableRow::from_row).collect()
    }
}

/// Capability interface for everything the wizard shows.
pub trait Renderer {
    /// Make `step` the visible page.
    fn show_step(&mut self, step: Step);

    /// Connection status line (scoped to the connect page).
    fn render_status(&mut self, message: &str, kind: StatusKind);

    fn clear_status(&mut self);

    /// Busy indicator for the connect action.
    fn set_busy(&mut self, busy: bool);

    /// Replace the collection picker with one entry per name, none selected.
    fn render_collection_picker(&mut self, names: &[String]);

    /// Mark exactly the picker entry at `index` as selected, or clear all marks with `None`.
    fn mark_selected(&mut self, index: Option<usize>);

    /// Loading placeholder in the analytics panel; prior rows are cleared.
    fn render_analytics_loading(&mut self, collection: &str);

    /// Replace the analytics panel with an error message.
    fn render_analytics_error(&mut self, message: &str);

    /// Replace summary and rows with `report`.
    fn render_results(&mut self, report: &AnalyticsReport);
}

/// Display-ready cells for one analytics row (unescaped).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub customer_id: String,
    pub customer_name: Option<String>,
    pub total_orders: String,
    pub avg_order_gap: String,
    pub last_order_date: String,
    pub predicted_next_order_date: String,
    pub classification: String,
    pub classification_tag: String,
}

impl TableRow {
    pub fn from_row(row: &AnalyticsRow) -> Self {
        Self {
            customer_id: row.customer_id.clone(),
            customer_name: row.customer_name.clone().filter(|n| !n.trim().is_empty()),
            total_orders: row.total_orders.to_string(),
            avg_order_gap: row
                .avg_order_gap
                .map(|g| g.to_string())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            last_order_date: or_not_available(row.last_order_date.as_deref()),
            predicted_next_order_date: or_not_available(row.predicted_next_order_date.as_deref()),
            classification: row.customer_classification.clone(),
            classification_tag: classification_tag(&row.customer_classification),
        }
    }
}

fn or_not_available(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Lower-cased style tag for a classification (`"AT RISK"` -> `"at-risk"`).
pub fn classification_tag(classification: &str) -> String {
    classification
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}

pub fn loading_message(collection: &str) -> String {
    format!("Analyzing {}...", collection)
}

pub fn no_data_message(collection: &str) -> String {
    format!("No data available for analysis in {}", collection)
}
