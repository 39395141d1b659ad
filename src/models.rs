// src/models.rs
//! Wire records exchanged with the SmartAsset API
//!
//! Only the fields the client core relies on are modelled. Unknown fields in
//! responses are ignored.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::auth::UserRole;
use crate::filters::FilterableRow;
use crate::reports::ChartSeries;
use crate::scanner::AssetId;
use crate::secrets::SecretOwner;

// ==================== ASSET ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRow {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub purchase_date: Option<String>,
    #[serde(default)]
    pub qr_code_path: Option<String>,
}

impl AssetRow {
    pub fn asset_id(&self) -> AssetId {
        AssetId(self.id)
    }

    pub fn has_qr(&self) -> bool {
        self.qr_code_path
            .as_deref()
            .map(|p| !p.trim().is_empty())
            .unwrap_or(false)
    }
}

impl FilterableRow for AssetRow {
    fn row_id(&self) -> i64 {
        self.id
    }

    fn search_fields(&self) -> Vec<Option<&str>> {
        vec![
            self.name.as_deref(),
            self.category.as_deref(),
            self.location.as_deref(),
            self.purchase_date.as_deref(),
        ]
    }

    fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }
}

/// The asset list endpoint answers with either `{items: [...]}` or a bare array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AssetListResponse {
    Wrapped { items: Vec<AssetRow> },
    Bare(Vec<AssetRow>),
}

impl AssetListResponse {
    pub fn into_items(self) -> Vec<AssetRow> {
        match self {
            AssetListResponse::Wrapped { items } => items,
            AssetListResponse::Bare(items) => items,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetPayload {
    pub name: String,
    pub category: String,
    pub location: String,
    pub purchase_date: Option<String>,
}

impl AssetPayload {
    pub fn new(name: &str, category: &str, location: &str, purchase_date: Option<NaiveDate>) -> Self {
        Self {
            name: name.trim().to_string(),
            category: category.trim().to_string(),
            location: location.trim().to_string(),
            purchase_date: purchase_date.map(|d| d.format("%Y-%m-%d").to_string()),
        }
    }
}

// ==================== MAINTENANCE LOG ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceLog {
    pub id: i64,
    pub asset_id: i64,
    pub service_date: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parts_used: Option<String>,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub technician_id: Option<i64>,
    #[serde(default)]
    pub next_service_due: Option<String>,
    #[serde(default)]
    pub attachment_path: Option<String>,
}

impl FilterableRow for MaintenanceLog {
    fn row_id(&self) -> i64 {
        self.id
    }

    fn search_fields(&self) -> Vec<Option<&str>> {
        vec![
            self.description.as_deref(),
            self.parts_used.as_deref(),
            Some(self.service_date.as_str()),
            self.next_service_due.as_deref(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct LogPayload {
    pub service_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parts_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_service_due: Option<String>,
}

// ==================== USERS ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub username: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    #[serde(default)]
    pub must_change_password: bool,
    /// Server-persisted hint of the most recently issued temporary password.
    #[serde(default)]
    pub last_temp_password: Option<String>,
}

impl SecretOwner for AdminUser {
    fn owner_id(&self) -> i64 {
        self.id
    }

    fn persisted_hint(&self) -> Option<&str> {
        self.last_temp_password.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_password: Option<String>,
}

impl CreateUserRequest {
    /// Blank optional fields are left out so the server picks its own values.
    pub fn new(name: &str, email: &str, role: UserRole, username: &str, temp_password: &str) -> Self {
        let opt = |s: &str| {
            let t = s.trim();
            if t.is_empty() { None } else { Some(t.to_string()) }
        };
        Self {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            role,
            username: opt(username),
            temp_password: opt(temp_password),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreatedUser {
    pub id: i64,
    #[serde(default)]
    pub temp_password: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BulkCreateResponse {
    #[serde(default)]
    pub created: Vec<CreatedUser>,
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResetPasswordResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub temp_password: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
}

// ==================== REPORTS ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyCost {
    pub year: i32,
    pub month: u32,
    #[serde(default)]
    pub total_cost: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthCostEntry {
    pub month: String,
    #[serde(default)]
    pub cost: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    #[serde(default)]
    pub total_assets: u64,
    #[serde(default)]
    pub total_logs: u64,
    #[serde(default)]
    pub overdue_logs: u64,
    #[serde(default)]
    pub monthly_cost: Vec<MonthCostEntry>,
}

impl DashboardSummary {
    /// Server order is kept; entries are already grouped by calendar month.
    pub fn cost_chart(&self) -> ChartSeries {
        ChartSeries {
            labels: self.monthly_cost.iter().map(|e| e.month.clone()).collect(),
            values: self.monthly_cost.iter().map(|e| e.cost).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpiringAsset {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    pub warranty_end: String,
}

impl ExpiringAsset {
    pub fn warranty_end_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.warranty_end, "%Y-%m-%d").ok()
    }

    pub fn days_remaining(&self, today: NaiveDate) -> Option<i64> {
        self.warranty_end_date().map(|end| (end - today).num_days())
    }
}
