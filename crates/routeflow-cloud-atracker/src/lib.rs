//! IBM Cloud Activity Tracker provider for RouteFlow
//!
//! Manages the three resource kinds of the Activity Tracker v2 API on top of
//! the reconcilers in `routeflow-cloud`:
//!
//! - targets (Cloud Object Storage, Event Streams, Cloud Logs destinations)
//! - routes (which locations are sent to which targets)
//! - account settings (a singleton that is replaced in full)
//!
//! # Requirements
//!
//! - `ROUTEFLOW_API_TOKEN` holding an IAM bearer token
//! - optionally `ROUTEFLOW_REGION`, `ROUTEFLOW_ENDPOINT`, `ROUTEFLOW_PRIVATE`
//!
//! # Example
//!
//! ```ignore
//! use routeflow_cloud_atracker::{AtrackerClient, AtrackerConfig, AtrackerProvider, Manifest};
//!
//! let config = AtrackerConfig::from_env()?;
//! let provider = AtrackerProvider::new(AtrackerClient::new(&config)?);
//!
//! let manifest = Manifest::load(Path::new("routeflow.yaml"))?;
//! let plan = provider.plan(&manifest, &state).await?;
//! println!("{}", plan.summary());
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod manifest;
pub mod models;
pub mod provider;

pub use client::AtrackerClient;
pub use config::{AtrackerConfig, DEFAULT_REGION, service_url_for_region};
pub use error::{AtrackerError, Result};
pub use manifest::{Manifest, TargetRef, reference_target_ids};
pub use models::{
    CloudLogsEndpoint, CosEndpoint, EventStreamsEndpoint, ListRoutesOptions, ListTargetsOptions,
    Route, RouteKind, RouteSpec, Rule, Settings, SettingsKind, SettingsSpec, Target, TargetKind,
    TargetSpec, TargetType, WriteStatus, rules,
};
pub use provider::{AtrackerProvider, ImportKind, Imported};
