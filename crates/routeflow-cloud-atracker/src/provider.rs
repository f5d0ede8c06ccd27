//! Activity tracker provider
//!
//! Plans and applies a [`Manifest`] against the identity bindings recorded
//! in the local state. Targets are converged first so that routes and
//! settings can reference them by name; destroy runs in the reverse order.

use crate::client::AtrackerClient;
use crate::error::{AtrackerError, Result};
use crate::manifest::{Manifest, reference_target_ids};
use crate::models::{
    ListRoutesOptions, ListTargetsOptions, Route, RouteKind, RouteSpec, Settings, SettingsKind,
    Target, TargetKind, TargetSpec, rules,
};
use routeflow_cloud::{
    Action, ActionType, ApplyResult, Binding, DiffSuppressor, GlobalState, Pager, Plan,
    RemoteClient, ResourceIdentity, ResourceKind, ResourceReconciler, SettingsReconciler,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Kinds that can be adopted with `import`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Target,
    Route,
}

/// Declared form of an imported resource
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Imported {
    Target(TargetSpec),
    Route(RouteSpec),
}

pub struct AtrackerProvider {
    client: Arc<AtrackerClient>,
    rules: Arc<DiffSuppressor>,
}

impl AtrackerProvider {
    pub fn new(client: AtrackerClient) -> Self {
        Self {
            client: Arc::new(client),
            rules: Arc::new(rules()),
        }
    }

    pub fn client(&self) -> &AtrackerClient {
        &self.client
    }

    fn reconciler<K>(
        &self,
        state: &GlobalState,
        name: &str,
    ) -> ResourceReconciler<K, AtrackerClient>
    where
        K: ResourceKind,
        AtrackerClient: RemoteClient<K>,
    {
        match state.identity(K::KIND, name) {
            Some(identity) => {
                ResourceReconciler::bind(self.client.clone(), self.rules.clone(), identity)
            }
            None => ResourceReconciler::new(self.client.clone(), self.rules.clone()),
        }
    }

    fn settings_reconciler(&self) -> SettingsReconciler<SettingsKind, AtrackerClient> {
        SettingsReconciler::new(self.client.clone(), self.rules.clone())
    }

    /// Compute the actions `apply` would take without changing anything
    pub async fn plan(&self, manifest: &Manifest, state: &GlobalState) -> Result<Plan> {
        let mut actions = Vec::new();

        for target in &manifest.targets {
            let mut reconciler = self.reconciler::<TargetKind>(state, &target.name);
            actions.push(reconciler.plan(&target.name, target).await?);
        }

        for route in &manifest.routes {
            match manifest.resolve_route(route, state)? {
                Some(resolved) => {
                    let mut reconciler = self.reconciler::<RouteKind>(state, &route.name);
                    actions.push(reconciler.plan(&route.name, &resolved).await?);
                }
                None => actions.push(pending_action(RouteKind::KIND, &route.name, state)),
            }
        }

        actions.extend(orphans(manifest, state));

        if let Some(settings) = &manifest.settings {
            match manifest.resolve_settings(settings, state)? {
                Some(resolved) => actions.push(self.settings_reconciler().plan(&resolved).await?),
                None => actions.push(
                    Action::new(ActionType::Update, SettingsKind::KIND, SettingsKind::KIND)
                        .with_description("update settings (after referenced targets are created)"),
                ),
            }
        }

        Ok(Plan::new(actions))
    }

    /// Converge every declared resource and delete bindings no longer declared.
    ///
    /// A failing resource is recorded and the run continues; `state` always
    /// reflects what was actually created or deleted.
    pub async fn apply(&self, manifest: &Manifest, state: &mut GlobalState) -> Result<ApplyResult> {
        let start = Instant::now();
        let mut result = ApplyResult::new();

        for target in &manifest.targets {
            let mut reconciler = self.reconciler::<TargetKind>(state, &target.name);
            let planned = planned_type(state, TargetKind::KIND, &target.name);
            match reconciler.converge(&target.name, target).await {
                Ok(action) => result.add_success(&action),
                Err(e) => {
                    tracing::warn!("Target {} failed: {}", target.name, e);
                    let action = Action::new(planned, TargetKind::KIND, &target.name);
                    result.add_failure(action.id, planned, e.to_string());
                }
            }
            let crn = reconciler.observed().and_then(|t| t.crn.clone());
            record(state, TargetKind::KIND, &target.name, reconciler.identity(), crn);
        }

        for route in &manifest.routes {
            let planned = planned_type(state, RouteKind::KIND, &route.name);
            let action_id = Action::new(planned, RouteKind::KIND, &route.name).id;
            let resolved = match manifest.resolve_route(route, state) {
                Ok(Some(resolved)) => resolved,
                Ok(None) => {
                    result.add_failure(
                        action_id,
                        planned,
                        "a referenced target is not available".to_string(),
                    );
                    continue;
                }
                Err(e) => {
                    result.add_failure(action_id, planned, e.to_string());
                    continue;
                }
            };

            let mut reconciler = self.reconciler::<RouteKind>(state, &route.name);
            match reconciler.converge(&route.name, &resolved).await {
                Ok(action) => result.add_success(&action),
                Err(e) => {
                    tracing::warn!("Route {} failed: {}", route.name, e);
                    result.add_failure(action_id, planned, e.to_string());
                }
            }
            let crn = reconciler.observed().and_then(|r| r.crn.clone());
            record(state, RouteKind::KIND, &route.name, reconciler.identity(), crn);
        }

        for action in orphans(manifest, state) {
            self.delete_binding(&action, state, &mut result).await;
        }

        if let Some(settings) = &manifest.settings {
            let action_id =
                Action::new(ActionType::Update, SettingsKind::KIND, SettingsKind::KIND).id;
            match manifest.resolve_settings(settings, state) {
                Ok(Some(resolved)) => match self.settings_reconciler().converge(&resolved).await {
                    Ok(action) => result.add_success(&action),
                    Err(e) => result.add_failure(action_id, ActionType::Update, e.to_string()),
                },
                Ok(None) => result.add_failure(
                    action_id,
                    ActionType::Update,
                    "a referenced target is not available".to_string(),
                ),
                Err(e) => result.add_failure(action_id, ActionType::Update, e.to_string()),
            }
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        Ok(result)
    }

    /// Delete every bound route and target, and reset settings when the
    /// manifest declares them
    pub async fn destroy(
        &self,
        manifest: &Manifest,
        state: &mut GlobalState,
    ) -> Result<ApplyResult> {
        let start = Instant::now();
        let mut result = ApplyResult::new();

        if manifest.settings.is_some() {
            let action = Action::new(ActionType::Reset, SettingsKind::KIND, SettingsKind::KIND);
            match self.settings_reconciler().reset().await {
                Ok(_) => result.add_success(&action),
                Err(e) => result.add_failure(action.id, ActionType::Reset, e.to_string()),
            }
        }

        let mut actions: Vec<Action> = Vec::new();
        for kind in [RouteKind::KIND, TargetKind::KIND] {
            actions.extend(state.bindings_of(kind).map(delete_action));
        }
        for action in actions {
            self.delete_binding(&action, state, &mut result).await;
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        Ok(result)
    }

    async fn delete_binding(
        &self,
        action: &Action,
        state: &mut GlobalState,
        result: &mut ApplyResult,
    ) {
        let outcome = if action.resource_type == RouteKind::KIND {
            let mut reconciler = self.reconciler::<RouteKind>(state, &action.resource_name);
            reconciler.delete().await
        } else {
            let mut reconciler = self.reconciler::<TargetKind>(state, &action.resource_name);
            reconciler.delete().await
        };

        match outcome {
            Ok(()) => {
                state.unbind(&action.resource_type, &action.resource_name);
                result.add_success(action);
            }
            Err(e) => {
                tracing::warn!(
                    "Deleting {} {} failed: {}",
                    action.resource_type,
                    action.resource_name,
                    e
                );
                result.add_failure(action.id.clone(), ActionType::Delete, e.to_string());
            }
        }
    }

    /// Adopt an existing remote object.
    ///
    /// The binding is keyed by the remote name, so the returned spec can be
    /// pasted into the manifest as-is and plans as a no-op.
    pub async fn import(
        &self,
        kind: ImportKind,
        id: &str,
        state: &mut GlobalState,
    ) -> Result<Imported> {
        let identity = ResourceIdentity::new(id);
        match kind {
            ImportKind::Target => {
                let mut reconciler: ResourceReconciler<TargetKind, AtrackerClient> =
                    ResourceReconciler::new(self.client.clone(), self.rules.clone());
                let spec = reconciler
                    .import(identity)
                    .await?
                    .ok_or_else(|| not_found(TargetKind::KIND, id))?;
                ensure_unbound(state, TargetKind::KIND, &spec.name)?;
                let crn = reconciler.observed().and_then(|t| t.crn.clone());
                record(state, TargetKind::KIND, &spec.name, reconciler.identity(), crn);
                Ok(Imported::Target(spec))
            }
            ImportKind::Route => {
                let mut reconciler: ResourceReconciler<RouteKind, AtrackerClient> =
                    ResourceReconciler::new(self.client.clone(), self.rules.clone());
                let mut spec = reconciler
                    .import(identity)
                    .await?
                    .ok_or_else(|| not_found(RouteKind::KIND, id))?;
                ensure_unbound(state, RouteKind::KIND, &spec.name)?;
                for rule in &mut spec.rules {
                    rule.target_ids = reference_target_ids(&rule.target_ids, state);
                }
                let crn = reconciler.observed().and_then(|r| r.crn.clone());
                record(state, RouteKind::KIND, &spec.name, reconciler.identity(), crn);
                Ok(Imported::Route(spec))
            }
        }
    }

    pub async fn list_targets(&self, region: Option<String>) -> Result<Vec<Target>> {
        let options = ListTargetsOptions {
            region,
            ..Default::default()
        };
        let mut pager = Pager::new(self.client.as_ref(), options)?;
        Ok(pager.get_all().await?)
    }

    pub async fn list_routes(&self) -> Result<Vec<Route>> {
        let mut pager = Pager::new(self.client.as_ref(), ListRoutesOptions::default())?;
        Ok(pager.get_all().await?)
    }

    pub async fn validate_target(&self, id: &str) -> Result<Target> {
        Ok(self.client.validate_target(id).await?)
    }

    pub async fn settings(&self) -> Result<Option<Settings>> {
        let mut reconciler = self.settings_reconciler();
        let settings = reconciler.read().await?.cloned();
        Ok(settings)
    }

    pub async fn reset_settings(&self) -> Result<Settings> {
        let mut reconciler = self.settings_reconciler();
        let settings = reconciler.reset().await?.clone();
        Ok(settings)
    }
}

fn not_found(kind: &str, id: &str) -> AtrackerError {
    AtrackerError::NotFound(format!("{} {}", kind, id))
}

fn ensure_unbound(state: &GlobalState, kind: &str, name: &str) -> Result<()> {
    match state.get(kind, name) {
        Some(existing) => Err(AtrackerError::InvalidConfig(format!(
            "{} '{}' is already bound to {}",
            kind, name, existing.identity
        ))),
        None => Ok(()),
    }
}

fn planned_type(state: &GlobalState, kind: &str, name: &str) -> ActionType {
    if state.get(kind, name).is_some() {
        ActionType::Update
    } else {
        ActionType::Create
    }
}

fn pending_action(kind: &str, name: &str, state: &GlobalState) -> Action {
    let action_type = planned_type(state, kind, name);
    let action = Action::new(action_type, kind, name);
    let description = format!("{} (after referenced targets are created)", action.description);
    action.with_description(description)
}

fn delete_action(binding: &Binding) -> Action {
    Action::new(ActionType::Delete, binding.kind.clone(), binding.name.clone())
        .with_resource_id(binding.identity.to_string())
}

/// Delete actions for bindings whose manifest entry is gone, routes first
fn orphans(manifest: &Manifest, state: &GlobalState) -> Vec<Action> {
    let routes = state
        .bindings_of(RouteKind::KIND)
        .filter(|b| manifest.route(&b.name).is_none());
    let targets = state
        .bindings_of(TargetKind::KIND)
        .filter(|b| manifest.target(&b.name).is_none());
    routes.chain(targets).map(delete_action).collect()
}

fn record(
    state: &mut GlobalState,
    kind: &str,
    name: &str,
    identity: Option<&ResourceIdentity>,
    crn: Option<String>,
) {
    match identity {
        Some(identity) => state.bind(Binding::new(kind, name, identity.clone()).with_crn(crn)),
        None => {
            if state.unbind(kind, name).is_some() {
                tracing::info!("{} {} no longer exists, binding removed", kind, name);
            }
        }
    }
}
