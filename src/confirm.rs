// src/confirm.rs
//! Confirmation gate for destructive actions

use std::future::Future;

use async_trait::async_trait;
use tracing::info;

use crate::error::ClientResult;
use crate::scanner::AssetId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestructiveAction {
    DeleteAsset(AssetId),
    DeleteLog(i64),
    SetUserActive { id: i64, name: String, active: bool },
    ResetPassword { id: i64, name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmRequest {
    pub title: String,
    pub message: String,
    pub ok_text: String,
    pub cancel_text: String,
}

impl ConfirmRequest {
    fn new(title: &str, message: String, ok_text: &str) -> Self {
        Self {
            title: title.to_string(),
            message,
            ok_text: ok_text.to_string(),
            cancel_text: "Cancel".to_string(),
        }
    }
}

impl DestructiveAction {
    pub fn request(&self) -> ConfirmRequest {
        match self {
            DestructiveAction::DeleteAsset(_) => ConfirmRequest::new(
                "Delete Asset",
                "Do you really want to delete this asset? This action cannot be undone.".to_string(),
                "Delete",
            ),
            DestructiveAction::DeleteLog(_) => ConfirmRequest::new(
                "Delete Log",
                "Do you really want to delete this maintenance log? This action cannot be undone."
                    .to_string(),
                "Delete",
            ),
            DestructiveAction::SetUserActive { name, active: true, .. } => ConfirmRequest::new(
                "Enable User",
                format!("Allow {} to sign in?", name),
                "Enable",
            ),
            DestructiveAction::SetUserActive { name, active: false, .. } => ConfirmRequest::new(
                "Disable User",
                format!("Disable {}? They will not be able to sign in until re-enabled.", name),
                "Disable",
            ),
            DestructiveAction::ResetPassword { name, .. } => ConfirmRequest::new(
                "Reset Password",
                format!("Issue a new temporary password for {}?", name),
                "Reset",
            ),
        }
    }
}

/// Modal yes/no collaborator.
#[async_trait]
pub trait ConfirmPrompt: Send + Sync {
    async fn confirm(&self, request: &ConfirmRequest) -> bool;
}

/// Runs `op` only after the prompt confirms. `Ok(None)` means cancelled.
pub async fn run_confirmed<P, F, Fut, T>(
    prompt: &P,
    action: &DestructiveAction,
    op: F,
) -> ClientResult<Option<T>>
where
    P: ConfirmPrompt + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = ClientResult<T>>,
{
    if !prompt.confirm(&action.request()).await {
        info!(?action, "destructive action cancelled");
        return Ok(None);
    }
    op().await.map(Some)
}

/// Prompt that always answers the same way.
#[derive(Debug, Clone, Copy)]
pub struct FixedPrompt(pub bool);

#[async_trait]
impl ConfirmPrompt for FixedPrompt {
    async fn confirm(&self, _request: &ConfirmRequest) -> bool {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_cancel_issues_nothing() {
        let calls = AtomicUsize::new(0);
        let out = run_confirmed(&FixedPrompt(false), &DestructiveAction::DeleteLog(4), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(out, None);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_confirm_runs_operation() {
        let out = run_confirmed(&FixedPrompt(true), &DestructiveAction::DeleteAsset(AssetId(1)), || async {
            Ok(42)
        })
        .await
        .unwrap();
        assert_eq!(out, Some(42));
    }

    #[test]
    fn test_dialog_texts() {
        let disable = DestructiveAction::SetUserActive { id: 1, name: "Priya".to_string(), active: false };
        let req = disable.request();
        assert_eq!(req.title, "Disable User");
        assert_eq!(req.ok_text, "Disable");
        assert!(req.message.starts_with("Disable Priya?"));

        let reset = DestructiveAction::ResetPassword { id: 1, name: "Priya".to_string() }.request();
        assert_eq!(reset.message, "Issue a new temporary password for Priya?");
        assert_eq!(reset.cancel_text, "Cancel");
    }
}
