//! RouteFlow reconciliation core
//!
//! Maps declared resources (targets, routes, settings) onto imperative
//! create/read/replace/delete calls against a remote REST service.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  RouteFlow CLI                   │
//! │            (plan / apply / destroy)              │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               routeflow-cloud                    │
//! │  ┌────────────────────┐  ┌──────────────────┐   │
//! │  │ ResourceReconciler │  │ SettingsReconciler│  │
//! │  └─────────┬──────────┘  └────────┬─────────┘   │
//! │  ┌─────────▼──────────┐  ┌────────▼─────────┐   │
//! │  │   DiffSuppressor   │  │      Pager       │   │
//! │  └────────────────────┘  └──────────────────┘   │
//! └─────────────────┬───────────────────────────────┘
//!                   │ trait RemoteClient / SingletonClient
//! ┌─────────────────▼───────────────────────────────┐
//! │            routeflow-cloud-atracker              │
//! └─────────────────────────────────────────────────┘
//! ```

pub mod action;
pub mod client;
pub mod error;
pub mod pager;
pub mod reconciler;
pub mod resource;
pub mod settings;
pub mod state;
pub mod suppress;

#[cfg(test)]
mod testing;

// Re-exports
pub use action::{Action, ActionResult, ActionType, ApplyResult, Plan, PlanSummary};
pub use client::{ListOptions, Page, PageSource, RemoteClient, Removal, SingletonClient};
pub use error::{CloudError, Result};
pub use pager::{Pager, cursor_from_url};
pub use reconciler::{ChangeSet, Lifecycle, ReconcileOutcome, ResourceReconciler};
pub use resource::{FieldSet, ResourceIdentity, ResourceKind};
pub use settings::{SettingsReconciler, SettingsState, SingletonKind};
pub use state::{Binding, GlobalState, StateLock, StateManager};
pub use suppress::{ComparisonRule, DiffSuppressor, FieldChange, compare};
