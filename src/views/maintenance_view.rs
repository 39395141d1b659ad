// src/views/maintenance_view.rs
//! Maintenance logs for the selected asset

use chrono::NaiveDate;
use tracing::debug;

use super::ensure;
use crate::api::{AssetApi, MaintenanceApi};
use crate::confirm::{run_confirmed, ConfirmPrompt, DestructiveAction};
use crate::error::{ClientError, ClientResult};
use crate::filters::FilteredTable;
use crate::models::{AssetRow, LogPayload, MaintenanceLog};
use crate::pagination::Paginator;
use crate::rbac::{Action, Capabilities};
use crate::scanner::AssetId;
use crate::sequencer::{RequestSequencer, Ticket};

/// First ten characters, so `YYYY-MM-DDTHH:mm` values display as dates.
pub fn format_date(value: Option<&str>) -> String {
    match value {
        None => String::new(),
        Some(d) => d.get(..10).unwrap_or(d).to_string(),
    }
}

fn parse_date(field: &str, value: &str) -> ClientResult<NaiveDate> {
    let day = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|_| ClientError::validation(field, "Use the YYYY-MM-DD format"))
}

pub fn validate_log(payload: &LogPayload) -> ClientResult<()> {
    if payload.service_date.trim().is_empty() {
        return Err(ClientError::validation("service_date", "Service date is required"));
    }
    let service = parse_date("service_date", &payload.service_date)?;
    if let Some(due) = payload.next_service_due.as_deref().filter(|d| !d.is_empty()) {
        if parse_date("next_service_due", due)? < service {
            return Err(ClientError::validation(
                "next_service_due",
                "Next service must not be before the service date",
            ));
        }
    }
    if payload.cost.map(|c| c < 0.0).unwrap_or(false) {
        return Err(ClientError::validation("cost", "Cost cannot be negative"));
    }
    Ok(())
}

pub struct MaintenanceView {
    assets: Vec<AssetRow>,
    selected: Option<AssetId>,
    logs: FilteredTable<MaintenanceLog>,
    caps: Capabilities,
    asset_seq: RequestSequencer,
    log_seq: RequestSequencer,
    notice: Option<String>,
}

impl MaintenanceView {
    pub fn new(caps: Capabilities, page_size: usize) -> Self {
        Self {
            assets: Vec::new(),
            selected: None,
            logs: FilteredTable::new(Paginator::new(page_size)),
            caps,
            asset_seq: RequestSequencer::new(),
            log_seq: RequestSequencer::new(),
            notice: None,
        }
    }

    pub fn assets(&self) -> &[AssetRow] {
        &self.assets
    }

    pub fn selected(&self) -> Option<AssetId> {
        self.selected
    }

    pub fn logs(&self) -> &FilteredTable<MaintenanceLog> {
        &self.logs
    }

    pub fn logs_mut(&mut self) -> &mut FilteredTable<MaintenanceLog> {
        &mut self.logs
    }

    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    // ==================== ASSET SELECTOR ====================

    pub fn begin_assets(&mut self) -> Ticket {
        self.asset_seq.issue()
    }

    pub fn complete_assets(&mut self, ticket: Ticket, result: ClientResult<Vec<AssetRow>>) -> ClientResult<bool> {
        if !self.asset_seq.accept(ticket) {
            return Ok(false);
        }
        let rows = self.note_err(result)?;
        self.assets = rows;
        Ok(true)
    }

    pub async fn load_assets<A: AssetApi + ?Sized>(&mut self, api: &A) -> ClientResult<()> {
        let ticket = self.begin_assets();
        let result = api.list_assets().await;
        self.complete_assets(ticket, result).map(|_| ())
    }

    // ==================== LOGS ====================

    /// Switches the selected asset. Logs of the previous asset are dropped
    /// immediately, and any response still in flight for it is ignored.
    pub fn select_asset(&mut self, asset: AssetId) -> Ticket {
        self.selected = Some(asset);
        self.logs.set_rows(Vec::new());
        self.logs.clear_filters();
        self.log_seq.issue()
    }

    pub fn complete_logs(&mut self, ticket: Ticket, result: ClientResult<Vec<MaintenanceLog>>) -> ClientResult<bool> {
        if !self.log_seq.accept(ticket) {
            return Ok(false);
        }
        let logs = self.note_err(result)?;
        debug!(count = logs.len(), asset = ?self.selected, "logs loaded");
        self.logs.set_rows(logs);
        Ok(true)
    }

    pub async fn load_logs<M: MaintenanceApi + ?Sized>(&mut self, api: &M, asset: AssetId) -> ClientResult<()> {
        let ticket = self.select_asset(asset);
        let result = api.list_logs(asset).await;
        self.complete_logs(ticket, result).map(|_| ())
    }

    async fn reload<M: MaintenanceApi + ?Sized>(&mut self, api: &M) -> ClientResult<()> {
        match self.selected {
            Some(asset) => {
                let ticket = self.log_seq.issue();
                let result = api.list_logs(asset).await;
                self.complete_logs(ticket, result).map(|_| ())
            }
            None => Ok(()),
        }
    }

    fn selected_or_err(&self) -> ClientResult<AssetId> {
        self.selected
            .ok_or_else(|| ClientError::validation("asset_id", "Select an asset first"))
    }

    // ==================== MUTATIONS ====================

    pub async fn create_log<M: MaintenanceApi + ?Sized>(&mut self, api: &M, payload: &LogPayload) -> ClientResult<()> {
        ensure(&self.caps, Action::CreateLog)?;
        let asset = self.selected_or_err()?;
        validate_log(payload)?;
        let result = api.create_log(asset, payload).await;
        self.note(result, "Log added")?;
        self.reload(api).await
    }

    pub async fn update_log<M: MaintenanceApi + ?Sized>(
        &mut self,
        api: &M,
        log_id: i64,
        payload: &LogPayload,
    ) -> ClientResult<()> {
        ensure(&self.caps, Action::EditLog)?;
        validate_log(payload)?;
        let result = api.update_log(log_id, payload).await;
        self.note(result, "Log updated")?;
        self.reload(api).await
    }

    pub async fn delete_log<M, P>(&mut self, api: &M, prompt: &P, log_id: i64) -> ClientResult<bool>
    where
        M: MaintenanceApi + ?Sized,
        P: ConfirmPrompt + ?Sized,
    {
        ensure(&self.caps, Action::DeleteLog)?;
        let outcome = run_confirmed(prompt, &DestructiveAction::DeleteLog(log_id), || api.delete_log(log_id)).await;
        match self.note(outcome, "Log deleted")? {
            None => Ok(false),
            Some(()) => {
                self.reload(api).await?;
                Ok(true)
            }
        }
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

    pub fn teardown(&mut self) {
        self.asset_seq.teardown();
        self.log_seq.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::UserRole;
    use crate::rbac::capabilities;
    use crate::views::fakes::RecordingPrompt;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn log(id: i64, asset_id: i64, date: &str, description: &str) -> MaintenanceLog {
        MaintenanceLog {
            id,
            asset_id,
            service_date: date.to_string(),
            description: Some(description.to_string()),
            parts_used: None,
            cost: Some(100.0),
            technician_id: None,
            next_service_due: None,
            attachment_path: None,
        }
    }

    #[derive(Default)]
    struct FakeLogs {
        by_asset: Mutex<HashMap<i64, Vec<MaintenanceLog>>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeLogs {
        fn with(asset: i64, logs: Vec<MaintenanceLog>) -> Self {
            let fake = Self::default();
            fake.by_asset.lock().unwrap().insert(asset, logs);
            fake
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MaintenanceApi for FakeLogs {
        async fn list_logs(&self, asset: AssetId) -> ClientResult<Vec<MaintenanceLog>> {
            self.calls.lock().unwrap().push(format!("list {}", asset));
            Ok(self.by_asset.lock().unwrap().get(&asset.0).cloned().unwrap_or_default())
        }

        async fn create_log(&self, asset: AssetId, payload: &LogPayload) -> ClientResult<()> {
            self.calls.lock().unwrap().push(format!("create {}", asset));
            let mut map = self.by_asset.lock().unwrap();
            let logs = map.entry(asset.0).or_default();
            let id = logs.len() as i64 + 100;
            logs.push(log(id, asset.0, &payload.service_date, "new"));
            Ok(())
        }

        async fn update_log(&self, log_id: i64, _payload: &LogPayload) -> ClientResult<()> {
            self.calls.lock().unwrap().push(format!("update {}", log_id));
            Ok(())
        }

        async fn delete_log(&self, log_id: i64) -> ClientResult<()> {
            self.calls.lock().unwrap().push(format!("delete {}", log_id));
            for logs in self.by_asset.lock().unwrap().values_mut() {
                logs.retain(|l| l.id != log_id);
            }
            Ok(())
        }
    }

    fn payload(date: &str) -> LogPayload {
        LogPayload { service_date: date.to_string(), ..Default::default() }
    }

    #[test]
    fn test_validate_log() {
        assert!(validate_log(&payload("2024-05-01")).is_ok());
        assert!(validate_log(&payload("2024-05-01T10:30")).is_ok());
        assert!(validate_log(&payload("")).is_err());
        assert!(validate_log(&payload("05/01/2024")).is_err());

        let mut p = payload("2024-05-01");
        p.next_service_due = Some("2024-04-01".to_string());
        assert!(matches!(validate_log(&p), Err(ClientError::Validation { field, .. }) if field == "next_service_due"));

        let mut p = payload("2024-05-01");
        p.cost = Some(-1.0);
        assert!(validate_log(&p).is_err());
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date(Some("2024-05-01T10:30")), "2024-05-01");
        assert_eq!(format_date(Some("2024")), "2024");
        assert_eq!(format_date(None), "");
    }

    #[test]
    fn test_response_for_previous_asset_is_ignored() {
        let mut view = MaintenanceView::new(capabilities(UserRole::Tech), 10);
        let first = view.select_asset(AssetId(1));
        let second = view.select_asset(AssetId(2));

        assert!(view.complete_logs(second, Ok(vec![log(5, 2, "2024-01-01", "b")])).unwrap());
        assert!(!view.complete_logs(first, Ok(vec![log(4, 1, "2024-01-01", "a")])).unwrap());

        assert_eq!(view.selected(), Some(AssetId(2)));
        assert_eq!(view.logs().rows().len(), 1);
        assert_eq!(view.logs().rows()[0].asset_id, 2);
    }

    #[tokio::test]
    async fn test_tech_can_add_but_not_delete() {
        let api = FakeLogs::with(1, vec![log(1, 1, "2024-01-05", "Oil change")]);
        let prompt = RecordingPrompt::new(true);
        let mut view = MaintenanceView::new(capabilities(UserRole::Tech), 10);
        view.load_logs(&api, AssetId(1)).await.unwrap();

        view.create_log(&api, &payload("2024-02-01")).await.unwrap();
        assert_eq!(view.logs().rows().len(), 2);

        assert!(view.delete_log(&api, &prompt, 1).await.is_err());
        assert!(view.update_log(&api, 1, &payload("2024-02-02")).await.is_err());
        assert_eq!(prompt.asked(), 0);
    }

    #[tokio::test]
    async fn test_create_requires_selection() {
        let api = FakeLogs::default();
        let mut view = MaintenanceView::new(capabilities(UserRole::Manager), 10);
        let err = view.create_log(&api, &payload("2024-02-01")).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation { .. }));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_admin_delete_with_confirmation() {
        let api = FakeLogs::with(1, vec![log(1, 1, "2024-01-05", "Oil change"), log(2, 1, "2024-02-05", "Belt")]);
        let mut view = MaintenanceView::new(capabilities(UserRole::Admin), 10);
        view.load_logs(&api, AssetId(1)).await.unwrap();

        assert!(!view.delete_log(&api, &RecordingPrompt::new(false), 1).await.unwrap());
        assert_eq!(view.logs().rows().len(), 2);

        assert!(view.delete_log(&api, &RecordingPrompt::new(true), 1).await.unwrap());
        assert_eq!(view.logs().rows().len(), 1);
        assert_eq!(view.take_notice().as_deref(), Some("Log deleted"));
        assert_eq!(api.calls(), vec!["list 1", "delete 1", "list 1"]);
    }

    #[tokio::test]
    async fn test_log_search_within_asset() {
        let api = FakeLogs::with(3, vec![log(1, 3, "2024-01-05", "Oil change"), log(2, 3, "2024-02-05", "Belt swap")]);
        let mut view = MaintenanceView::new(capabilities(UserRole::Tech), 10);
        view.load_logs(&api, AssetId(3)).await.unwrap();

        view.logs_mut().set_text("belt");
        assert_eq!(view.logs().visible().len(), 1);

        // selecting another asset clears the search
        view.load_logs(&api, AssetId(4)).await.unwrap();
        assert!(view.logs().state().is_empty());
    }
}
