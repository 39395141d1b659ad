// src/rbac.rs
//! Role -> capability lookup used for view gating.
//!
//! This is a UX optimization only. The server enforces the same rules and
//! must fail closed on its side.

use serde::Serialize;

use crate::auth::{Route, UserRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Capabilities {
    pub can_create: bool,
    pub can_create_log: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_manage_users: bool,
}

/// Actions a view may offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateAsset,
    EditAsset,
    DeleteAsset,
    CreateLog,
    EditLog,
    DeleteLog,
    ManageUsers,
}

pub const fn capabilities(role: UserRole) -> Capabilities {
    match role {
        UserRole::Admin => Capabilities {
            can_create: true,
            can_create_log: true,
            can_edit: true,
            can_delete: true,
            can_manage_users: true,
        },
        UserRole::Manager => Capabilities {
            can_create: true,
            can_create_log: true,
            can_edit: true,
            can_delete: false,
            can_manage_users: false,
        },
        UserRole::Tech => Capabilities {
            can_create: false,
            can_create_log: true,
            can_edit: false,
            can_delete: false,
            can_manage_users: false,
        },
    }
}

impl Capabilities {
    /// Logged-out capabilities: nothing is offered.
    pub const fn none() -> Self {
        Capabilities {
            can_create: false,
            can_create_log: false,
            can_edit: false,
            can_delete: false,
            can_manage_users: false,
        }
    }

    pub fn permits(&self, action: Action) -> bool {
        match action {
            Action::CreateAsset => self.can_create,
            Action::CreateLog => self.can_create_log,
            Action::EditAsset | Action::EditLog => self.can_edit,
            Action::DeleteAsset | Action::DeleteLog => self.can_delete,
            Action::ManageUsers => self.can_manage_users,
        }
    }
}

// ======== ROUTE GUARD ========

pub struct RouteGuard;

impl RouteGuard {
    /// `Ok(())` when `role` may open `route`, otherwise the redirect target.
    pub fn check(role: Option<UserRole>, route: Route) -> Result<(), Route> {
        match (role, route) {
            (_, Route::Login) => Ok(()),
            (None, _) => Err(Route::Login),
            (Some(role), Route::Users) if !capabilities(role).can_manage_users => {
                Err(Route::Dashboard)
            }
            (Some(_), _) => Ok(()),
        }
    }
}
