// src/auth.rs
//! Session store: one persisted identity slot with replace/clear semantics

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use tracing::{info, warn};
use validator::Validate;

use crate::api::AuthApi;
use crate::error::{ClientError, ClientResult};
use crate::rbac::{capabilities, Capabilities};

// ======== USER ROLE ========

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
    Display, EnumString, AsRefStr, EnumIter,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum UserRole {
    Admin,
    Manager,
    Tech,
}

impl UserRole {
    pub fn display_name(&self) -> &'static str {
        match self {
            UserRole::Admin => "Administrator",
            UserRole::Manager => "Manager",
            UserRole::Tech => "Technician",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            UserRole::Admin => "Full access including user management",
            UserRole::Manager => "Can create and edit assets and maintenance logs",
            UserRole::Tech => "Can record maintenance logs",
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        capabilities(*self)
    }
}

// ======== ROUTES ========

/// Views the application can navigate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    ChangePassword,
    Dashboard,
    Assets,
    Maintenance,
    Reports,
    QrScan,
    Users,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::ChangePassword => "/change-password",
            Route::Dashboard => "/dashboard",
            Route::Assets => "/assets",
            Route::Maintenance => "/maintenance",
            Route::Reports => "/reports",
            Route::QrScan => "/qr-scan",
            Route::Users => "/users",
        }
    }
}

// ======== AUTH PAYLOAD ========

fn default_true() -> bool {
    true
}

/// Identity bundle returned by the login call. The token is opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthPayload {
    #[serde(rename = "access_token")]
    pub token: String,
    pub role: UserRole,
    #[serde(default)]
    pub must_change_password: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

impl AuthPayload {
    pub fn has_token(&self) -> bool {
        !self.token.trim().is_empty()
    }

    /// Avatar initials, e.g. "Ansh Upadhyay" -> "AU".
    pub fn initials(&self) -> String {
        let mut parts = self.name.split_whitespace();
        let first = parts.next().and_then(|p| p.chars().next());
        let second = parts.next().and_then(|p| p.chars().next());

        match first {
            None => "U".to_string(),
            Some(f) => {
                let mut out: String = f.to_uppercase().collect();
                if let Some(s) = second {
                    out.extend(s.to_uppercase());
                }
                out
            }
        }
    }
}

// ======== REQUESTS ========

#[derive(Debug, Clone, Serialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Enter a valid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl LoginRequest {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.trim().to_lowercase(),
            password: password.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

// ======== STORAGE SLOT ========

/// A persistent key-value slot holding one serialized payload.
pub trait AuthSlot {
    fn get(&self) -> ClientResult<Option<String>>;
    fn set(&mut self, value: &str) -> ClientResult<()>;
    fn clear(&mut self) -> ClientResult<()>;
}

#[derive(Debug, Default, Clone)]
pub struct MemorySlot {
    value: Option<String>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuthSlot for MemorySlot {
    fn get(&self) -> ClientResult<Option<String>> {
        Ok(self.value.clone())
    }

    fn set(&mut self, value: &str) -> ClientResult<()> {
        self.value = Some(value.to_string());
        Ok(())
    }

    fn clear(&mut self) -> ClientResult<()> {
        self.value = None;
        Ok(())
    }
}

/// One JSON file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(dir: impl AsRef<Path>, key: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.json", key)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuthSlot for FileSlot {
    fn get(&self) -> ClientResult<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&self.path)?))
    }

    fn set(&mut self, value: &str) -> ClientResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        // write-then-rename so a reader never sees a half-written payload
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn clear(&mut self) -> ClientResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ======== SESSION STORE ========

pub struct SessionStore<S: AuthSlot> {
    slot: S,
}

impl<S: AuthSlot> SessionStore<S> {
    pub fn new(slot: S) -> Self {
        Self { slot }
    }

    /// Replaces any prior payload in a single slot write.
    pub fn login(&mut self, payload: AuthPayload) -> ClientResult<()> {
        let raw = serde_json::to_string(&payload)
            .map_err(|e| ClientError::Storage(e.to_string()))?;
        self.slot.set(&raw)?;
        info!(role = %payload.role, "session started");
        Ok(())
    }

    /// The stored payload. Missing, unreadable or corrupt storage reads as none.
    pub fn load(&self) -> Option<AuthPayload> {
        let raw = match self.slot.get() {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "session slot unreadable");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(payload) => Some(payload),
            Err(e) => {
                warn!(error = %e, "discarding corrupt session payload");
                None
            }
        }
    }

    pub fn logout(&mut self) -> Route {
        if let Err(e) = self.slot.clear() {
            warn!(error = %e, "failed to clear session slot");
        }
        info!("session ended");
        Route::Login
    }

    pub fn token(&self) -> Option<String> {
        self.load().filter(AuthPayload::has_token).map(|p| p.token)
    }

    pub fn is_logged_in(&self) -> bool {
        self.token().is_some()
    }

    pub fn role(&self) -> Option<UserRole> {
        self.load().filter(AuthPayload::has_token).map(|p| p.role)
    }

    pub fn must_change_password(&self) -> bool {
        self.load().map(|p| p.must_change_password).unwrap_or(false)
    }

    pub fn display_name(&self) -> String {
        self.load().map(|p| p.name).unwrap_or_default()
    }

    pub fn initials(&self) -> String {
        self.load()
            .map(|p| p.initials())
            .unwrap_or_else(|| "U".to_string())
    }

    /// Capabilities of the current role; nothing when logged out.
    pub fn capabilities(&self) -> Capabilities {
        self.role().map(capabilities).unwrap_or_else(Capabilities::none)
    }

    pub fn mark_password_changed(&mut self) -> ClientResult<()> {
        match self.load() {
            Some(mut payload) => {
                payload.must_change_password = false;
                self.login(payload)
            }
            None => Err(ClientError::not_logged_in()),
        }
    }

    pub fn landing_route(&self) -> Route {
        match self.load().filter(AuthPayload::has_token) {
            None => Route::Login,
            Some(p) if p.must_change_password => Route::ChangePassword,
            Some(_) => Route::Dashboard,
        }
    }
}

// ======== FLOWS ========

/// Validates credentials, calls the login endpoint and stores the payload.
pub async fn sign_in<A, S>(
    api: &A,
    store: &mut SessionStore<S>,
    request: &LoginRequest,
) -> ClientResult<Route>
where
    A: AuthApi + ?Sized,
    S: AuthSlot,
{
    request.validate()?;
    let payload = api.login(request).await?;
    if !payload.has_token() {
        return Err(ClientError::Auth("Login response did not include a token.".to_string()));
    }
    store.login(payload)?;
    Ok(store.landing_route())
}

/// First-login password change; clears the stored flag on success.
pub async fn change_password<A, S>(
    api: &A,
    store: &mut SessionStore<S>,
    request: &ChangePasswordRequest,
) -> ClientResult<Route>
where
    A: AuthApi + ?Sized,
    S: AuthSlot,
{
    request.validate()?;
    if !store.is_logged_in() {
        return Err(ClientError::not_logged_in());
    }
    api.change_password(request).await?;
    store.mark_password_changed()?;
    Ok(Route::Dashboard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::AuthApi;
    use async_trait::async_trait;
    use std::str::FromStr;

    fn payload(role: UserRole) -> AuthPayload {
        AuthPayload {
            token: "tok-123".to_string(),
            role,
            must_change_password: false,
            is_active: true,
            name: "Ansh Upadhyay".to_string(),
            email: "ansh@example.com".to_string(),
        }
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!(UserRole::from_str("ADMIN").unwrap(), UserRole::Admin);
        assert_eq!(UserRole::from_str("manager").unwrap(), UserRole::Manager);
        assert_eq!(UserRole::from_str("Tech").unwrap(), UserRole::Tech);
        assert!(UserRole::from_str("viewer").is_err());
        assert_eq!(UserRole::Manager.to_string(), "MANAGER");
    }

    #[test]
    fn test_payload_wire_format() {
        let raw = r#"{"access_token":"abc","role":"TECH","must_change_password":true,"is_active":true,"name":"Priya","email":"p@example.com"}"#;
        let p: AuthPayload = serde_json::from_str(raw).unwrap();
        assert_eq!(p.token, "abc");
        assert_eq!(p.role, UserRole::Tech);
        assert!(p.must_change_password);

        let back = serde_json::to_value(&p).unwrap();
        assert_eq!(back["access_token"], "abc");
        assert_eq!(back["role"], "TECH");
    }

    #[test]
    fn test_initials() {
        assert_eq!(payload(UserRole::Admin).initials(), "AU");

        let mut p = payload(UserRole::Admin);
        p.name = "  rohit ".to_string();
        assert_eq!(p.initials(), "R");

        p.name = "".to_string();
        assert_eq!(p.initials(), "U");
    }

    #[test]
    fn test_login_then_load() {
        let mut store = SessionStore::new(MemorySlot::new());
        assert!(!store.is_logged_in());
        assert!(store.load().is_none());

        store.login(payload(UserRole::Manager)).unwrap();
        assert!(store.is_logged_in());
        assert_eq!(store.role(), Some(UserRole::Manager));
        assert_eq!(store.display_name(), "Ansh Upadhyay");
    }

    #[test]
    fn test_login_replaces_prior_payload() {
        let mut store = SessionStore::new(MemorySlot::new());
        store.login(payload(UserRole::Admin)).unwrap();

        let mut other = payload(UserRole::Tech);
        other.token = "tok-456".to_string();
        store.login(other).unwrap();

        assert_eq!(store.role(), Some(UserRole::Tech));
        assert_eq!(store.token().as_deref(), Some("tok-456"));
    }

    #[test]
    fn test_logout_clears_everything() {
        let mut store = SessionStore::new(MemorySlot::new());
        store.login(payload(UserRole::Admin)).unwrap();

        assert_eq!(store.logout(), Route::Login);
        assert!(!store.is_logged_in());
        assert!(store.load().is_none());
        assert_eq!(store.capabilities(), Capabilities::none());
    }

    #[test]
    fn test_empty_token_is_not_logged_in() {
        let mut store = SessionStore::new(MemorySlot::new());
        let mut p = payload(UserRole::Admin);
        p.token = "  ".to_string();
        store.login(p).unwrap();

        assert!(!store.is_logged_in());
        assert_eq!(store.role(), None);
        assert_eq!(store.landing_route(), Route::Login);
    }

    #[test]
    fn test_corrupt_slot_reads_as_logged_out() {
        let mut slot = MemorySlot::new();
        slot.set("{not json").unwrap();
        let store = SessionStore::new(slot);
        assert!(store.load().is_none());
        assert!(!store.is_logged_in());
    }

    #[test]
    fn test_landing_route_and_password_flag() {
        let mut store = SessionStore::new(MemorySlot::new());
        assert_eq!(store.landing_route(), Route::Login);

        let mut p = payload(UserRole::Tech);
        p.must_change_password = true;
        store.login(p).unwrap();
        assert_eq!(store.landing_route(), Route::ChangePassword);

        store.mark_password_changed().unwrap();
        assert!(!store.must_change_password());
        assert_eq!(store.landing_route(), Route::Dashboard);
    }

    #[test]
    fn test_file_slot_roundtrip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SessionStore::new(FileSlot::new(dir.path(), "smartasset_auth"));

        store.login(payload(UserRole::Admin)).unwrap();
        assert!(dir.path().join("smartasset_auth.json").exists());

        // a fresh store over the same file sees the session
        let reopened = SessionStore::new(FileSlot::new(dir.path(), "smartasset_auth"));
        assert!(reopened.is_logged_in());

        store.logout();
        assert!(!dir.path().join("smartasset_auth.json").exists());
        assert!(!reopened.is_logged_in());
    }

    #[test]
    fn test_file_slot_missing_directory_is_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let mut slot = FileSlot::new(dir.path().join("nope"), "auth");
        assert_eq!(slot.get().unwrap(), None);
        assert!(slot.clear().is_ok());
    }

    struct FakeAuthApi {
        result: ClientResult<AuthPayload>,
    }

    #[async_trait]
    impl AuthApi for FakeAuthApi {
        async fn login(&self, _request: &LoginRequest) -> ClientResult<AuthPayload> {
            self.result.clone()
        }

        async fn change_password(&self, _request: &ChangePasswordRequest) -> ClientResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_sign_in_stores_payload() {
        let api = FakeAuthApi { result: Ok(payload(UserRole::Admin)) };
        let mut store = SessionStore::new(MemorySlot::new());

        let route = sign_in(&api, &mut store, &LoginRequest::new(" Ansh@Example.com ", "pw"))
            .await
            .unwrap();
        assert_eq!(route, Route::Dashboard);
        assert!(store.is_logged_in());
    }

    #[tokio::test]
    async fn test_sign_in_rejects_bad_email_before_network() {
        let api = FakeAuthApi { result: Err(ClientError::network("should not be called")) };
        let mut store = SessionStore::new(MemorySlot::new());

        let err = sign_in(&api, &mut store, &LoginRequest::new("not-an-email", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation { .. }));
        assert!(!store.is_logged_in());
    }

    #[tokio::test]
    async fn test_failed_sign_in_keeps_previous_session() {
        let api = FakeAuthApi { result: Err(ClientError::network("invalid credentials")) };
        let mut store = SessionStore::new(MemorySlot::new());
        store.login(payload(UserRole::Tech)).unwrap();

        assert!(sign_in(&api, &mut store, &LoginRequest::new("a@b.co", "pw")).await.is_err());
        assert_eq!(store.role(), Some(UserRole::Tech));
    }

    #[tokio::test]
    async fn test_change_password_flow() {
        let api = FakeAuthApi { result: Ok(payload(UserRole::Tech)) };
        let mut store = SessionStore::new(MemorySlot::new());
        let mut p = payload(UserRole::Tech);
        p.must_change_password = true;
        store.login(p).unwrap();

        let short = ChangePasswordRequest { new_password: "short".to_string() };
        assert!(change_password(&api, &mut store, &short).await.is_err());
        assert!(store.must_change_password());

        let ok = ChangePasswordRequest { new_password: "long-enough-1".to_string() };
        assert_eq!(change_password(&api, &mut store, &ok).await.unwrap(), Route::Dashboard);
        assert!(!store.must_change_password());
    }
}
