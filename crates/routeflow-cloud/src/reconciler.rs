//! Lifecycle state machine for a single remote resource
//!
//! ```text
//! Absent ──create──▶ Creating ──▶ Present ──reconcile──▶ Updating ──▶ Present
//!   ▲                                │
//!   │                                ├──delete──▶ Deleting ──▶ Absent
//!   └──────── read: not found ───────┘
//! ```
//!
//! A read that finds the object gone is a normal transition back to
//! `Absent`, never an error.

use crate::action::{Action, ActionType};
use crate::client::RemoteClient;
use crate::error::{CloudError, Result};
use crate::pager::Pager;
use crate::resource::{FieldSet, ResourceIdentity, ResourceKind};
use crate::suppress::{DiffSuppressor, FieldChange};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;

/// Lifecycle state of a reconciled resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Absent,
    Creating,
    Present,
    Updating,
    Deleting,
}

impl std::fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lifecycle::Absent => write!(f, "absent"),
            Lifecycle::Creating => write!(f, "creating"),
            Lifecycle::Present => write!(f, "present"),
            Lifecycle::Updating => write!(f, "updating"),
            Lifecycle::Deleting => write!(f, "deleting"),
        }
    }
}

/// Fields that were sent to the backend in a whole-object replace
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSet {
    pub kind: &'static str,
    pub identity: ResourceIdentity,
    pub changes: Vec<FieldChange>,
}

impl ChangeSet {
    pub fn fields(&self) -> Vec<&str> {
        self.changes.iter().map(|c| c.field.as_str()).collect()
    }
}

/// Outcome of [`ResourceReconciler::reconcile`]
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// Every field compared equal; no remote call was made
    NoOp,
    /// The full desired state was sent with a replace call
    Updated(ChangeSet),
    /// The object disappeared remotely; the reconciler is `Absent` again
    Gone,
}

/// Drives create/read/update/delete for one resource instance.
///
/// The reconciler owns the lifecycle of its identity exclusively. It makes
/// one remote call at a time and never retries.
pub struct ResourceReconciler<K, C>
where
    K: ResourceKind,
    C: RemoteClient<K>,
{
    client: Arc<C>,
    rules: Arc<DiffSuppressor>,
    lifecycle: Lifecycle,
    identity: Option<ResourceIdentity>,
    observed: Option<K::Observed>,
    _kind: PhantomData<fn() -> K>,
}

impl<K, C> ResourceReconciler<K, C>
where
    K: ResourceKind,
    C: RemoteClient<K>,
{
    /// Reconciler for a resource that has not been created yet
    pub fn new(client: Arc<C>, rules: Arc<DiffSuppressor>) -> Self {
        Self {
            client,
            rules,
            lifecycle: Lifecycle::Absent,
            identity: None,
            observed: None,
            _kind: PhantomData,
        }
    }

    /// Reconciler for an identity recorded by an earlier run
    pub fn bind(client: Arc<C>, rules: Arc<DiffSuppressor>, identity: ResourceIdentity) -> Self {
        Self {
            lifecycle: Lifecycle::Present,
            identity: Some(identity),
            ..Self::new(client, rules)
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn identity(&self) -> Option<&ResourceIdentity> {
        self.identity.as_ref()
    }

    /// Last observed state, if any
    pub fn observed(&self) -> Option<&K::Observed> {
        self.observed.as_ref()
    }

    fn expect_lifecycle(&self, expected: Lifecycle, operation: &str) -> Result<()> {
        if self.lifecycle != expected {
            return Err(CloudError::InvalidState(format!(
                "cannot {} {} while {}",
                operation,
                K::KIND,
                self.lifecycle
            )));
        }
        Ok(())
    }

    fn require_identity(&self, operation: &str) -> Result<ResourceIdentity> {
        self.identity.clone().ok_or_else(|| {
            CloudError::InvalidState(format!(
                "cannot {} {} without an identity",
                operation,
                K::KIND
            ))
        })
    }

    fn unbind(&mut self) {
        self.identity = None;
        self.observed = None;
        self.lifecycle = Lifecycle::Absent;
    }

    /// Create the resource and bind the identity the backend assigns
    pub async fn create(&mut self, desired: &K::Desired) -> Result<ResourceIdentity> {
        self.expect_lifecycle(Lifecycle::Absent, "create")?;
        K::validate(desired)?;
        self.ensure_unique(desired).await?;

        self.lifecycle = Lifecycle::Creating;
        let observed = match self.client.create(desired).await {
            Ok(observed) => observed,
            Err(e) => {
                self.lifecycle = Lifecycle::Absent;
                return Err(e);
            }
        };

        let identity = K::identity(&observed);
        tracing::info!("Created {} {}", K::KIND, identity);
        self.identity = Some(identity.clone());
        self.observed = Some(observed);
        self.lifecycle = Lifecycle::Present;
        Ok(identity)
    }

    /// Reject a create whose natural key is already taken remotely
    async fn ensure_unique(&self, desired: &K::Desired) -> Result<()> {
        let Some(key) = K::natural_key(desired) else {
            return Ok(());
        };

        let mut pager = Pager::new(self.client.as_ref(), K::ListOptions::default())?;
        while pager.has_next() {
            for existing in pager.get_next().await? {
                if K::natural_key(&K::import(&existing)).as_deref() == Some(key.as_str()) {
                    return Err(CloudError::Conflict(format!(
                        "{} '{}' already exists with id {}",
                        K::KIND,
                        key,
                        K::identity(&existing)
                    )));
                }
            }
        }
        Ok(())
    }

    /// Refresh the observed state.
    ///
    /// Returns `Ok(None)` and transitions to `Absent` when the backend no
    /// longer has the object.
    pub async fn read(&mut self) -> Result<Option<&K::Observed>> {
        let identity = self.require_identity("read")?;

        match self.client.read(&identity).await? {
            Some(observed) => {
                self.observed = Some(observed);
                self.lifecycle = Lifecycle::Present;
                Ok(self.observed.as_ref())
            }
            None => {
                tracing::info!("{} {} no longer exists remotely", K::KIND, identity);
                self.unbind();
                Ok(None)
            }
        }
    }

    /// Fields of `desired` that differ from `observed` under the registered rules.
    ///
    /// Fails with `ImmutableFieldChanged` when a create-only field differs.
    pub fn diff(&self, desired: &K::Desired, observed: &K::Observed) -> Result<Vec<FieldChange>> {
        let declared = FieldSet::from_serialize(desired)?;
        let current = FieldSet::from_serialize(&K::import(observed))?;
        let changes = self.rules.diff(K::KIND, &declared, &current);

        if let Some(change) = changes
            .iter()
            .find(|c| K::immutable_fields().contains(&c.field.as_str()))
        {
            return Err(CloudError::ImmutableFieldChanged {
                kind: K::KIND.to_string(),
                field: change.field.clone(),
            });
        }

        Ok(changes)
    }

    /// Bring the remote object in line with `desired`.
    ///
    /// Any difference sends the complete desired state; the backend only
    /// supports whole-object replace.
    pub async fn reconcile(&mut self, desired: &K::Desired) -> Result<ReconcileOutcome> {
        let identity = self.require_identity("reconcile")?;

        if self.observed.is_none() && self.read().await?.is_none() {
            return Ok(ReconcileOutcome::Gone);
        }
        let Some(observed) = self.observed.as_ref() else {
            return Ok(ReconcileOutcome::Gone);
        };

        let changes = self.diff(desired, observed)?;
        if changes.is_empty() {
            tracing::debug!("{} {} is up to date", K::KIND, identity);
            return Ok(ReconcileOutcome::NoOp);
        }
        K::validate(desired)?;

        self.lifecycle = Lifecycle::Updating;
        let replaced = match self.client.replace(&identity, desired).await {
            Ok(replaced) => replaced,
            Err(CloudError::ResourceNotFound(_)) => {
                tracing::info!("{} {} disappeared before replace", K::KIND, identity);
                self.unbind();
                return Ok(ReconcileOutcome::Gone);
            }
            Err(e) => {
                self.lifecycle = Lifecycle::Present;
                return Err(e);
            }
        };
        self.lifecycle = Lifecycle::Present;

        let returned = K::identity(&replaced);
        if returned != identity {
            return Err(CloudError::ApiError(format!(
                "backend returned {} {} when replacing {}",
                K::KIND,
                returned,
                identity
            )));
        }

        tracing::info!(
            "Replaced {} {} ({} changed field(s))",
            K::KIND,
            identity,
            changes.len()
        );
        self.observed = Some(replaced);
        Ok(ReconcileOutcome::Updated(ChangeSet {
            kind: K::KIND,
            identity,
            changes,
        }))
    }

    /// Delete the remote object. Not-found counts as already deleted.
    pub async fn delete(&mut self) -> Result<()> {
        self.expect_lifecycle(Lifecycle::Present, "delete")?;
        let identity = self.require_identity("delete")?;

        self.lifecycle = Lifecycle::Deleting;
        match self.client.delete(&identity).await {
            Ok(removal) => {
                tracing::info!("Deleted {} {} ({:?})", K::KIND, identity, removal);
                self.unbind();
                Ok(())
            }
            Err(e) => {
                self.lifecycle = Lifecycle::Present;
                Err(e)
            }
        }
    }

    /// Adopt an existing remote object and rebuild its desired state.
    ///
    /// Returns `Ok(None)` and stays `Absent` when the backend has no such
    /// object.
    pub async fn import(&mut self, identity: ResourceIdentity) -> Result<Option<K::Desired>> {
        self.expect_lifecycle(Lifecycle::Absent, "import")?;

        let Some(observed) = self.client.read(&identity).await? else {
            tracing::debug!("{} {} does not exist, nothing to import", K::KIND, identity);
            return Ok(None);
        };

        let desired = K::import(&observed);
        tracing::info!("Imported {} {}", K::KIND, identity);
        self.identity = Some(identity);
        self.observed = Some(observed);
        self.lifecycle = Lifecycle::Present;
        Ok(Some(desired))
    }

    /// Compute the action `converge` would take, without changing remote state
    pub async fn plan(&mut self, name: &str, desired: &K::Desired) -> Result<Action> {
        K::validate(desired)?;

        if self.identity.is_some() {
            if let Some(observed) = self.read().await? {
                let identity = K::identity(observed);
                let observed = observed.clone();
                let changes = self.diff(desired, &observed)?;
                let action_type = if changes.is_empty() {
                    ActionType::NoOp
                } else {
                    ActionType::Update
                };
                return Ok(Action::new(action_type, K::KIND, name)
                    .with_resource_id(identity.to_string())
                    .with_changes(changes));
            }
        }

        Ok(Action::new(ActionType::Create, K::KIND, name))
    }

    /// Create when absent, reconcile when present
    pub async fn converge(&mut self, name: &str, desired: &K::Desired) -> Result<Action> {
        if self.identity.is_some() {
            match self.reconcile(desired).await? {
                ReconcileOutcome::NoOp => {
                    let id = self.require_identity("converge")?;
                    return Ok(Action::new(ActionType::NoOp, K::KIND, name)
                        .with_resource_id(id.to_string()));
                }
                ReconcileOutcome::Updated(change_set) => {
                    return Ok(Action::new(ActionType::Update, K::KIND, name)
                        .with_resource_id(change_set.identity.to_string())
                        .with_changes(change_set.changes));
                }
                ReconcileOutcome::Gone => {
                    tracing::warn!("{} {} was removed out-of-band, recreating", K::KIND, name);
                }
            }
        }

        let identity = self.create(desired).await?;
        Ok(Action::new(ActionType::Create, K::KIND, name).with_resource_id(identity.to_string()))
    }
}
