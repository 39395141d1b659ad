// src/lib.rs
//! SmartAsset client core.
//!
//! View-model layer of an asset and maintenance tracking client: session and
//! role gating, row filtering, monthly cost levelling, QR payload resolution
//! and one-time temporary password handling. Network calls, dialogs, charts
//! and downloads are reached through the traits in [`api`], [`confirm`],
//! [`reports`] and [`scanner`].

pub mod api;
pub mod auth;
pub mod config;
pub mod confirm;
pub mod error;
pub mod filters;
pub mod models;
pub mod pagination;
pub mod rbac;
pub mod reports;
pub mod scanner;
pub mod secrets;
pub mod sequencer;
pub mod views;

pub use auth::{AuthPayload, Route, SessionStore, UserRole};
pub use error::{ClientError, ClientResult};
pub use rbac::{capabilities, Capabilities};
pub use scanner::{resolve, AssetId};
