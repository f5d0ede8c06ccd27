//! Declared resources loaded from `routeflow.yaml`
//!
//! ```yaml
//! targets:
//!   - name: audit-cos
//!     target_type: cloud_object_storage
//!     cos_endpoint:
//!       endpoint: s3.private.us-south.cloud-object-storage.appdomain.cloud
//!       target_crn: crn:v1:bluemix:public:cloud-object-storage:global:a/ACCT:INST::
//!       bucket: audit-bucket
//!       service_to_service_enabled: true
//! routes:
//!   - name: all-regions
//!     rules:
//!       - target_ids: ["target:audit-cos"]
//!         locations: ["*"]
//! settings:
//!   metadata_region_primary: us-south
//!   default_targets: ["target:audit-cos"]
//! ```
//!
//! A `target:<name>` value stands for the identity bound to the target named
//! `<name>`.

use crate::error::{AtrackerError, Result};
use crate::models::{RouteSpec, SettingsSpec, TargetKind, TargetSpec};
use routeflow_cloud::{GlobalState, ResourceKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

const TARGET_REF_PREFIX: &str = "target:";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub targets: Vec<TargetSpec>,
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<SettingsSpec>,
}

/// A target id after reference resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetRef {
    /// A concrete identity
    Resolved(String),
    /// Names a declared target that has no identity yet
    Pending(String),
}

impl Manifest {
    pub fn from_yaml(content: &str) -> Result<Self> {
        let manifest: Manifest = serde_yaml::from_str(content)?;
        manifest.check()?;
        Ok(manifest)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        tracing::debug!("Loading manifest: {}", path.display());
        Self::from_yaml(&content)
    }

    pub fn target(&self, name: &str) -> Option<&TargetSpec> {
        self.targets.iter().find(|t| t.name == name)
    }

    pub fn route(&self, name: &str) -> Option<&RouteSpec> {
        self.routes.iter().find(|r| r.name == name)
    }

    /// Reject duplicate names and references to undeclared targets
    fn check(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for target in &self.targets {
            if !seen.insert(target.name.as_str()) {
                return Err(AtrackerError::InvalidManifest(format!(
                    "target '{}' is declared more than once",
                    target.name
                )));
            }
        }

        let mut seen = HashSet::new();
        for route in &self.routes {
            if !seen.insert(route.name.as_str()) {
                return Err(AtrackerError::InvalidManifest(format!(
                    "route '{}' is declared more than once",
                    route.name
                )));
            }
        }

        let route_refs = self
            .routes
            .iter()
            .flat_map(|r| r.rules.iter())
            .flat_map(|rule| rule.target_ids.iter());
        let settings_refs = self.settings.iter().flat_map(|s| s.default_targets.iter());
        for id in route_refs.chain(settings_refs) {
            if let Some(name) = id.strip_prefix(TARGET_REF_PREFIX) {
                if self.target(name).is_none() {
                    return Err(AtrackerError::UnresolvedTarget(name.to_string()));
                }
            }
        }
        Ok(())
    }

    /// Resolve one target id against the bindings in `state`
    pub fn resolve_target_id(&self, id: &str, state: &GlobalState) -> Result<TargetRef> {
        let Some(name) = id.strip_prefix(TARGET_REF_PREFIX) else {
            return Ok(TargetRef::Resolved(id.to_string()));
        };
        match state.identity(TargetKind::KIND, name) {
            Some(identity) => Ok(TargetRef::Resolved(identity.to_string())),
            None if self.target(name).is_some() => Ok(TargetRef::Pending(name.to_string())),
            None => Err(AtrackerError::UnresolvedTarget(name.to_string())),
        }
    }

    /// Route with every `target:<name>` replaced by its identity.
    ///
    /// Returns `Ok(None)` when a referenced target is not created yet.
    pub fn resolve_route(
        &self,
        route: &RouteSpec,
        state: &GlobalState,
    ) -> Result<Option<RouteSpec>> {
        let mut resolved = route.clone();
        for rule in &mut resolved.rules {
            match self.resolve_ids(&rule.target_ids, state)? {
                Some(ids) => rule.target_ids = ids,
                None => return Ok(None),
            }
        }
        Ok(Some(resolved))
    }

    /// Settings with `default_targets` resolved, see [`Manifest::resolve_route`]
    pub fn resolve_settings(
        &self,
        settings: &SettingsSpec,
        state: &GlobalState,
    ) -> Result<Option<SettingsSpec>> {
        Ok(self
            .resolve_ids(&settings.default_targets, state)?
            .map(|default_targets| SettingsSpec {
                default_targets,
                ..settings.clone()
            }))
    }

    fn resolve_ids(&self, ids: &[String], state: &GlobalState) -> Result<Option<Vec<String>>> {
        let mut resolved = Vec::with_capacity(ids.len());
        for id in ids {
            match self.resolve_target_id(id, state)? {
                TargetRef::Resolved(id) => resolved.push(id),
                TargetRef::Pending(_) => return Ok(None),
            }
        }
        Ok(Some(resolved))
    }
}

/// Rewrite identities bound in `state` back to `target:<name>` references
pub fn reference_target_ids(ids: &[String], state: &GlobalState) -> Vec<String> {
    ids.iter()
        .map(|id| {
            state
                .bindings_of(TargetKind::KIND)
                .find(|b| b.identity.as_str() == id)
                .map(|b| format!("{}{}", TARGET_REF_PREFIX, b.name))
                .unwrap_or_else(|| id.clone())
        })
        .collect()
}
