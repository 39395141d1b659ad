// src/api.rs
//! Request/response interface to the SmartAsset server and its reqwest implementation

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::auth::{AuthPayload, ChangePasswordRequest, LoginRequest, UserRole};
use crate::config::ApiConfig;
use crate::error::{ClientError, ClientResult};
use crate::models::{
    AdminUser, AssetListResponse, AssetPayload, AssetRow, BulkCreateResponse, CreateUserRequest,
    CreatedUser, DashboardSummary, ExpiringAsset, LogPayload, MaintenanceLog, MonthlyCost,
    ResetPasswordResponse,
};
use crate::scanner::AssetId;

// ==================== TRAITS ====================

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> ClientResult<AuthPayload>;
    async fn change_password(&self, request: &ChangePasswordRequest) -> ClientResult<()>;
}

#[async_trait]
pub trait AssetApi: Send + Sync {
    async fn list_assets(&self) -> ClientResult<Vec<AssetRow>>;
    async fn get_asset(&self, id: AssetId) -> ClientResult<AssetRow>;
    async fn create_asset(&self, payload: &AssetPayload) -> ClientResult<()>;
    async fn update_asset(&self, id: AssetId, payload: &AssetPayload) -> ClientResult<()>;
    async fn delete_asset(&self, id: AssetId) -> ClientResult<()>;
}

#[async_trait]
pub trait MaintenanceApi: Send + Sync {
    async fn list_logs(&self, asset: AssetId) -> ClientResult<Vec<MaintenanceLog>>;
    async fn create_log(&self, asset: AssetId, payload: &LogPayload) -> ClientResult<()>;
    async fn update_log(&self, log_id: i64, payload: &LogPayload) -> ClientResult<()>;
    async fn delete_log(&self, log_id: i64) -> ClientResult<()>;
}

#[async_trait]
pub trait UserAdminApi: Send + Sync {
    async fn list_users(&self) -> ClientResult<Vec<AdminUser>>;
    async fn create_user(&self, request: &CreateUserRequest) -> ClientResult<CreatedUser>;
    async fn bulk_create(&self, users: &[CreateUserRequest]) -> ClientResult<BulkCreateResponse>;
    /// Server-side parsing of `name,email,role,username` rows.
    async fn bulk_create_csv(&self, csv: &str) -> ClientResult<BulkCreateResponse>;
    async fn update_role(&self, user_id: i64, role: UserRole) -> ClientResult<()>;
    async fn set_active(&self, user_id: i64, active: bool) -> ClientResult<()>;
    async fn reset_password(&self, user_id: i64) -> ClientResult<ResetPasswordResponse>;
}

#[async_trait]
pub trait ReportsApi: Send + Sync {
    async fn monthly_cost(&self) -> ClientResult<Vec<MonthlyCost>>;
    async fn warranty_expiring(&self, days: u32) -> ClientResult<Vec<ExpiringAsset>>;
    async fn dashboard_summary(&self) -> ClientResult<DashboardSummary>;
    async fn export_assets(&self) -> ClientResult<Vec<u8>>;
    async fn export_logs(&self) -> ClientResult<Vec<u8>>;
}

// ==================== HTTP CLIENT ====================

/// Paths are resolved against the origin of `base_url`.
#[derive(Debug, Clone)]
pub struct HttpApiClient {
    base: Url,
    client: Client,
    token: Option<String>,
}

impl HttpApiClient {
    pub fn new(config: &ApiConfig) -> ClientResult<Self> {
        let base = Url::parse(config.base_url.trim())
            .map_err(|e| ClientError::validation("api.base_url", e.to_string()))?;
        let client = Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self { base, client, token: None })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn origin(&self) -> String {
        self.base.as_str().trim_end_matches('/').to_string()
    }

    fn endpoint(&self, path: &str) -> ClientResult<Url> {
        self.base
            .join(path)
            .map_err(|e| ClientError::validation("path", e.to_string()))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn get(&self, path: &str) -> ClientResult<RequestBuilder> {
        Ok(self.authorize(self.client.get(self.endpoint(path)?)))
    }

    fn post(&self, path: &str) -> ClientResult<RequestBuilder> {
        Ok(self.authorize(self.client.post(self.endpoint(path)?)))
    }

    fn put(&self, path: &str) -> ClientResult<RequestBuilder> {
        Ok(self.authorize(self.client.put(self.endpoint(path)?)))
    }

    fn delete(&self, path: &str) -> ClientResult<RequestBuilder> {
        Ok(self.authorize(self.client.delete(self.endpoint(path)?)))
    }

    async fn send(&self, builder: RequestBuilder) -> ClientResult<Response> {
        let resp = builder.send().await?;
        let status = resp.status();
        debug!(status = status.as_u16(), url = %resp.url(), "response received");
        if status.is_success() {
            return Ok(resp);
        }

        let text = resp.text().await.unwrap_or_default();
        let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));
        let err = ClientError::from_response(status.as_u16(), &body);
        warn!(status = status.as_u16(), error = %err, "request failed");
        Err(err)
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ClientResult<T> {
        Ok(self.send(builder).await?.json::<T>().await?)
    }

    async fn send_unit(&self, builder: RequestBuilder) -> ClientResult<()> {
        self.send(builder).await?;
        Ok(())
    }

    async fn send_bytes(&self, builder: RequestBuilder) -> ClientResult<Vec<u8>> {
        Ok(self.send(builder).await?.bytes().await?.to_vec())
    }
}

#[async_trait]
impl AuthApi for HttpApiClient {
    async fn login(&self, request: &LoginRequest) -> ClientResult<AuthPayload> {
        // login never carries a stale bearer token
        let url = self.endpoint("/api/auth/login")?;
        self.send_json(self.client.post(url).json(request)).await
    }

    async fn change_password(&self, request: &ChangePasswordRequest) -> ClientResult<()> {
        self.send_unit(self.post("/api/auth/change-password")?.json(request)).await
    }
}

#[async_trait]
impl AssetApi for HttpApiClient {
    async fn list_assets(&self) -> ClientResult<Vec<AssetRow>> {
        let list: AssetListResponse = self.send_json(self.get("/api/assets")?).await?;
        Ok(list.into_items())
    }

    async fn get_asset(&self, id: AssetId) -> ClientResult<AssetRow> {
        self.send_json(self.get(&format!("/api/assets/{}", id))?).await
    }

    async fn create_asset(&self, payload: &AssetPayload) -> ClientResult<()> {
        self.send_unit(self.post("/api/assets")?.json(payload)).await
    }

    async fn update_asset(&self, id: AssetId, payload: &AssetPayload) -> ClientResult<()> {
        self.send_unit(self.put(&format!("/api/assets/{}", id))?.json(payload)).await
    }

    async fn delete_asset(&self, id: AssetId) -> ClientResult<()> {
        self.send_unit(self.delete(&format!("/api/assets/{}", id))?).await
    }
}

#[async_trait]
impl MaintenanceApi for HttpApiClient {
    async fn list_logs(&self, asset: AssetId) -> ClientResult<Vec<MaintenanceLog>> {
        self.send_json(self.get(&format!("/api/assets/{}/maintenance", asset))?).await
    }

    async fn create_log(&self, asset: AssetId, payload: &LogPayload) -> ClientResult<()> {
        self.send_unit(self.post(&format!("/api/assets/{}/maintenance", asset))?.json(payload)).await
    }

    async fn update_log(&self, log_id: i64, payload: &LogPayload) -> ClientResult<()> {
        self.send_unit(self.put(&format!("/api/maintenance/{}", log_id))?.json(payload)).await
    }

    async fn delete_log(&self, log_id: i64) -> ClientResult<()> {
        self.send_unit(self.delete(&format!("/api/maintenance/{}", log_id))?).await
    }
}

#[async_trait]
impl UserAdminApi for HttpApiClient {
    async fn list_users(&self) -> ClientResult<Vec<AdminUser>> {
        self.send_json(self.get("/api/admin/users")?).await
    }

    async fn create_user(&self, request: &CreateUserRequest) -> ClientResult<CreatedUser> {
        self.send_json(self.post("/api/admin/users")?.json(request)).await
    }

    async fn bulk_create(&self, users: &[CreateUserRequest]) -> ClientResult<BulkCreateResponse> {
        self.send_json(self.post("/api/admin/users/bulk")?.json(&json!({ "users": users }))).await
    }

    async fn bulk_create_csv(&self, csv: &str) -> ClientResult<BulkCreateResponse> {
        self.send_json(self.post("/api/admin/users/bulk")?.json(&json!({ "csv": csv }))).await
    }

    async fn update_role(&self, user_id: i64, role: UserRole) -> ClientResult<()> {
        let path = format!("/api/admin/users/{}/role", user_id);
        self.send_unit(self.put(&path)?.json(&json!({ "role": role }))).await
    }

    async fn set_active(&self, user_id: i64, active: bool) -> ClientResult<()> {
        let path = format!("/api/admin/users/{}/status", user_id);
        self.send_unit(self.put(&path)?.json(&json!({ "is_active": active }))).await
    }

    async fn reset_password(&self, user_id: i64) -> ClientResult<ResetPasswordResponse> {
        let path = format!("/api/admin/users/{}/reset-password", user_id);
        self.send_json(self.post(&path)?.json(&json!({}))).await
    }
}

#[async_trait]
impl ReportsApi for HttpApiClient {
    async fn monthly_cost(&self) -> ClientResult<Vec<MonthlyCost>> {
        self.send_json(self.get("/api/reports/monthly-cost")?).await
    }

    async fn warranty_expiring(&self, days: u32) -> ClientResult<Vec<ExpiringAsset>> {
        let req = self.get("/api/reports/warranty-expiring")?.query(&[("days", days)]);
        self.send_json(req).await
    }

    async fn dashboard_summary(&self) -> ClientResult<DashboardSummary> {
        self.send_json(self.get("/api/assets/dashboard-summary")?).await
    }

    async fn export_assets(&self) -> ClientResult<Vec<u8>> {
        self.send_bytes(self.get("/api/reports/assets/export")?).await
    }

    async fn export_logs(&self) -> ClientResult<Vec<u8>> {
        self.send_bytes(self.get("/api/reports/logs/export")?).await
    }
}
