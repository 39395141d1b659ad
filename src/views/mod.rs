// src/views/mod.rs
//! View models: component state wired to the API collaborators.
//!
//! Each view keeps its own `RequestSequencer`. Fetches are split into a
//! `begin_*` step that issues a ticket and a `complete_*` step that applies the
//! response only when the ticket is still current. The async convenience
//! methods run both steps back to back.

pub mod asset_view;
pub mod maintenance_view;
pub mod report_view;
pub mod scan_view;
pub mod user_admin_view;

pub use asset_view::*;
pub use maintenance_view::*;
pub use report_view::*;
pub use scan_view::*;
pub use user_admin_view::*;

use tracing::warn;

use crate::error::{ClientError, ClientResult};
use crate::rbac::{Action, Capabilities};

/// Rejects actions the current role may not perform.
pub(crate) fn ensure(caps: &Capabilities, action: Action) -> ClientResult<()> {
    if caps.permits(action) {
        Ok(())
    } else {
        warn!(?action, "action not permitted for current role");
        Err(ClientError::forbidden())
    }
}
