// src/views/asset_view.rs
//! Asset list: filtered/paginated table plus role-gated create, edit, delete

use tracing::{debug, info};

use super::ensure;
use crate::api::AssetApi;
use crate::confirm::{run_confirmed, ConfirmPrompt, DestructiveAction};
use crate::error::{ClientError, ClientResult};
use crate::filters::FilteredTable;
use crate::models::{AssetPayload, AssetRow};
use crate::pagination::Paginator;
use crate::rbac::{Action, Capabilities};
use crate::scanner::{qr_image_url, AssetId};
use crate::sequencer::{RequestSequencer, Ticket};

const DELETE_BLOCKED: &str =
    "Cannot delete: asset has maintenance logs. (Ask admin to remove logs or enable cascade)";

pub struct AssetView {
    table: FilteredTable<AssetRow>,
    caps: Capabilities,
    seq: RequestSequencer,
    loading: bool,
    notice: Option<String>,
}

impl AssetView {
    pub fn new(caps: Capabilities, page_size: usize) -> Self {
        Self {
            table: FilteredTable::new(Paginator::new(page_size)),
            caps,
            seq: RequestSequencer::new(),
            loading: false,
            notice: None,
        }
    }

    pub fn table(&self) -> &FilteredTable<AssetRow> {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut FilteredTable<AssetRow> {
        &mut self.table
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    // ==================== LOADING ====================

    pub fn begin_load(&mut self) -> Ticket {
        self.loading = true;
        self.seq.issue()
    }

    /// `Ok(false)` when the response was stale and discarded.
    pub fn complete_load(&mut self, ticket: Ticket, result: ClientResult<Vec<AssetRow>>) -> ClientResult<bool> {
        if !self.seq.accept(ticket) {
            return Ok(false);
        }
        self.loading = false;
        match result {
            Ok(rows) => {
                debug!(count = rows.len(), "assets loaded");
                self.table.set_rows(rows);
                Ok(true)
            }
            Err(e) => {
                self.notice = Some(e.notice());
                Err(e)
            }
        }
    }

    pub async fn refresh<A: AssetApi + ?Sized>(&mut self, api: &A) -> ClientResult<()> {
        let ticket = self.begin_load();
        let result = api.list_assets().await;
        self.complete_load(ticket, result).map(|_| ())
    }

    // ==================== MUTATIONS ====================

    pub async fn create<A: AssetApi + ?Sized>(&mut self, api: &A, payload: &AssetPayload) -> ClientResult<()> {
        ensure(&self.caps, Action::CreateAsset)?;
        validate_payload(payload)?;
        self.report(api.create_asset(payload).await, "Asset created")?;
        self.refresh(api).await
    }

    pub async fn update<A: AssetApi + ?Sized>(
        &mut self,
        api: &A,
        id: AssetId,
        payload: &AssetPayload,
    ) -> ClientResult<()> {
        ensure(&self.caps, Action::EditAsset)?;
        validate_payload(payload)?;
        self.report(api.update_asset(id, payload).await, "Changes saved")?;
        self.refresh(api).await
    }

    /// `Ok(false)` when the user cancelled the confirmation.
    pub async fn delete<A, P>(&mut self, api: &A, prompt: &P, id: AssetId) -> ClientResult<bool>
    where
        A: AssetApi + ?Sized,
        P: ConfirmPrompt + ?Sized,
    {
        ensure(&self.caps, Action::DeleteAsset)?;
        if id.0 <= 0 {
            return Err(ClientError::validation("id", "Invalid asset id"));
        }

        let outcome = run_confirmed(prompt, &DestructiveAction::DeleteAsset(id), || api.delete_asset(id))
            .await
            .map_err(|e| match e.status() {
                Some(500) => ClientError::Network {
                    status: Some(500),
                    message: DELETE_BLOCKED.to_string(),
                },
                _ => e,
            });

        match self.report(outcome, "Asset deleted successfully")? {
            None => Ok(false),
            Some(()) => {
                info!(asset = %id, "asset deleted");
                self.refresh(api).await?;
                Ok(true)
            }
        }
    }

    fn report<T>(&mut self, result: ClientResult<T>, success: &str) -> ClientResult<T> {
        match &result {
            Ok(_) => self.notice = Some(success.to_string()),
            Err(e) => self.notice = Some(e.notice()),
        }
        result
    }

    // ==================== QR ====================

    pub fn qr_url(&self, api_origin: &str, id: AssetId) -> Option<String> {
        self.table
            .find(id.0)
            .filter(|row| row.has_qr())
            .and_then(|row| row.qr_code_path.as_deref())
            .map(|path| qr_image_url(api_origin, path))
    }

    pub fn teardown(&mut self) {
        self.seq.teardown();
    }
}

fn validate_payload(payload: &AssetPayload) -> ClientResult<()> {
    if payload.name.is_empty() {
        return Err(ClientError::validation("name", "Name is required"));
    }
    if payload.category.is_empty() {
        return Err(ClientError::validation("category", "Category is required"));
    }
    if payload.location.is_empty() {
        return Err(ClientError::validation("location", "Location is required"));
    }
    Ok(())
}
