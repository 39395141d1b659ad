// src/views/user_admin_view.rs
//! Admin user management: roster, one-time temporary passwords, gated mutations

use tracing::info;
use validator::ValidateEmail;

use super::ensure;
use crate::api::UserAdminApi;
use crate::auth::UserRole;
use crate::confirm::{run_confirmed, ConfirmPrompt, DestructiveAction};
use crate::error::{ClientError, ClientResult};
use crate::models::{AdminUser, BulkCreateResponse, CreateUserRequest};
use crate::rbac::{Action, Capabilities};
use crate::secrets::EphemeralSecretCache;
use crate::sequencer::{RequestSequencer, Ticket};

pub const CSV_TEMPLATE: &str =
    "name,email,role,username\nRohit,rohit@example.com,MANAGER,rohit.ch\nPriya,priya@example.com,TECH,\n";

/// One roster line for export, with the best-known temporary password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserExportRow {
    pub name: String,
    pub email: String,
    pub username: String,
    pub role: UserRole,
    pub is_active: bool,
    pub temp_password: String,
}

pub struct UserAdminView {
    users: Vec<AdminUser>,
    secrets: EphemeralSecretCache,
    caps: Capabilities,
    seq: RequestSequencer,
    last_created_secret: Option<String>,
    bulk_result: BulkCreateResponse,
    notice: Option<String>,
}

impl UserAdminView {
    pub fn new(caps: Capabilities) -> Self {
        Self {
            users: Vec::new(),
            secrets: EphemeralSecretCache::new(),
            caps,
            seq: RequestSequencer::new(),
            last_created_secret: None,
            bulk_result: BulkCreateResponse::default(),
            notice: None,
        }
    }

    pub fn users(&self) -> &[AdminUser] {
        &self.users
    }

    pub fn secrets(&self) -> &EphemeralSecretCache {
        &self.secrets
    }

    /// Secret shown right after a single create.
    pub fn last_created_secret(&self) -> Option<&str> {
        self.last_created_secret.as_deref()
    }

    pub fn bulk_result(&self) -> &BulkCreateResponse {
        &self.bulk_result
    }

    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    /// Session record first, then the roster's persisted hint.
    pub fn temp_password_for(&self, user_id: i64) -> Option<&str> {
        self.secrets.lookup(user_id, &self.users)
    }

    // ==================== ROSTER ====================

    pub fn begin_load(&mut self) -> ClientResult<Ticket> {
        ensure(&self.caps, Action::ManageUsers)?;
        Ok(self.seq.issue())
    }

    pub fn complete_load(&mut self, ticket: Ticket, result: ClientResult<Vec<AdminUser>>) -> ClientResult<bool> {
        if !self.seq.accept(ticket) {
            return Ok(false);
        }
        self.users = self.note_err(result)?;
        Ok(true)
    }

    pub async fn refresh<U: UserAdminApi + ?Sized>(&mut self, api: &U) -> ClientResult<()> {
        let ticket = self.begin_load()?;
        let result = api.list_users().await;
        self.complete_load(ticket, result).map(|_| ())
    }

    // ==================== CREATE ====================

    pub async fn create<U: UserAdminApi + ?Sized>(&mut self, api: &U, request: &CreateUserRequest) -> ClientResult<()> {
        ensure(&self.caps, Action::ManageUsers)?;
        if request.name.is_empty() {
            return Err(ClientError::validation("name", "Name is required"));
        }
        if !request.email.validate_email() {
            return Err(ClientError::validation("email", "Enter a valid email"));
        }

        self.last_created_secret = None;
        let created = api.create_user(request).await;
        let created = self.note(created, "User created")?;
        self.last_created_secret = self.secrets.record_created(&created).map(str::to_string);
        info!(user_id = created.id, "user created");
        self.refresh(api).await
    }

    pub async fn bulk_create<U: UserAdminApi + ?Sized>(&mut self, api: &U, users: &[CreateUserRequest]) -> ClientResult<usize> {
        ensure(&self.caps, Action::ManageUsers)?;
        if users.is_empty() {
            return Ok(0);
        }
        let response = api.bulk_create(users).await;
        self.absorb_bulk(api, response).await
    }

    pub async fn bulk_create_csv<U: UserAdminApi + ?Sized>(&mut self, api: &U, csv: &str) -> ClientResult<usize> {
        ensure(&self.caps, Action::ManageUsers)?;
        let csv = csv.trim();
        if csv.is_empty() {
            return Ok(0);
        }
        let response = api.bulk_create_csv(csv).await;
        self.absorb_bulk(api, response).await
    }

    async fn absorb_bulk<U: UserAdminApi + ?Sized>(
        &mut self,
        api: &U,
        response: ClientResult<BulkCreateResponse>,
    ) -> ClientResult<usize> {
        self.bulk_result = BulkCreateResponse::default();
        let response = self.note(response, "Bulk create complete")?;
        let recorded = self.secrets.record_bulk(&response);
        info!(created = response.created.len(), errors = response.errors.len(), "bulk create finished");
        self.bulk_result = response;
        self.refresh(api).await?;
        Ok(recorded)
    }

    // ==================== ROW ACTIONS ====================

    pub async fn change_role<U: UserAdminApi + ?Sized>(&mut self, api: &U, user_id: i64, role: UserRole) -> ClientResult<()> {
        ensure(&self.caps, Action::ManageUsers)?;
        let result = api.update_role(user_id, role).await;
        self.note(result, "Role updated")?;
        self.refresh(api).await
    }

    /// `Ok(false)` when the confirmation was declined.
    pub async fn set_active<U, P>(&mut self, api: &U, prompt: &P, user_id: i64, active: bool) -> ClientResult<bool>
    where
        U: UserAdminApi + ?Sized,
        P: ConfirmPrompt + ?Sized,
    {
        ensure(&self.caps, Action::ManageUsers)?;
        let action = DestructiveAction::SetUserActive {
            id: user_id,
            name: self.name_of(user_id),
            active,
        };
        let outcome = run_confirmed(prompt, &action, || api.set_active(user_id, active)).await;
        let done = if active { "User enabled" } else { "User disabled" };
        match self.note(outcome, done)? {
            None => Ok(false),
            Some(()) => {
                self.refresh(api).await?;
                Ok(true)
            }
        }
    }

    pub async fn reset_password<U, P>(&mut self, api: &U, prompt: &P, user_id: i64) -> ClientResult<bool>
    where
        U: UserAdminApi + ?Sized,
        P: ConfirmPrompt + ?Sized,
    {
        ensure(&self.caps, Action::ManageUsers)?;
        let action = DestructiveAction::ResetPassword {
            id: user_id,
            name: self.name_of(user_id),
        };
        let outcome = run_confirmed(prompt, &action, || api.reset_password(user_id)).await;
        match self.note(outcome, "Temporary password generated")? {
            None => Ok(false),
            Some(response) => {
                self.secrets.record_reset(user_id, &response);
                self.refresh(api).await?;
                Ok(true)
            }
        }
    }

    fn name_of(&self, user_id: i64) -> String {
        self.users
            .iter()
            .find(|u| u.id == user_id)
            .map(|u| u.name.clone())
            .unwrap_or_else(|| format!("user #{}", user_id))
    }

    // ==================== EXPORT ====================

    pub fn export_rows(&self) -> Vec<UserExportRow> {
        self.users
            .iter()
            .map(|u| UserExportRow {
                name: u.name.clone(),
                email: u.email.clone(),
                username: u.username.clone().unwrap_or_default(),
                role: u.role,
                is_active: u.is_active,
                temp_password: self.secrets.get_for(u).unwrap_or_default().to_string(),
            })
            .collect()
    }

    fn note_err<T>(&mut self, result: ClientResult<T>) -> ClientResult<T> {
        if let Err(e) = &result {
            self.notice = Some(e.notice());
        }
        result
    }

    fn note<T>(&mut self, result: ClientResult<T>, success: &str) -> ClientResult<T> {
        if result.is_ok() {
            self.notice = Some(success.to_string());
        }
        self.note_err(result)
    }

    /// Drops every session-held secret. Responses still in flight are ignored.
    pub fn teardown(&mut self) {
        self.seq.teardown();
        self.secrets.clear();
        self.last_created_secret = None;
    }
}
