//! Reconciliation of singleton resources
//!
//! A singleton exists exactly once per account and supports only Read and
//! Put. There is no remote delete; "deleting" it means writing back a reset
//! payload derived from the currently observed state.

use crate::action::{Action, ActionType};
use crate::client::SingletonClient;
use crate::error::{CloudError, Result};
use crate::resource::{FieldSet, ResourceKind};
use crate::suppress::{DiffSuppressor, FieldChange};
use std::marker::PhantomData;
use std::sync::Arc;

/// A resource kind with exactly one live instance
pub trait SingletonKind: ResourceKind {
    /// Payload that resets the singleton: required and optional scalar
    /// fields keep their observed values, optional collections become empty.
    fn reset_payload(observed: &Self::Observed) -> Self::Desired;

    /// Whether every optional field of `observed` is empty or at its default.
    /// Required fields do not count.
    fn is_default(observed: &Self::Observed) -> bool;
}

/// Observable states of a singleton. There is no absent state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsState {
    /// Some optional field holds a non-default value
    Configured,
    /// Every optional field is empty or default, or never initialized
    Default,
}

impl SettingsState {
    fn of<K: SingletonKind>(observed: Option<&K::Observed>) -> Self {
        match observed {
            Some(observed) if !K::is_default(observed) => SettingsState::Configured,
            _ => SettingsState::Default,
        }
    }
}

impl std::fmt::Display for SettingsState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsState::Configured => write!(f, "configured"),
            SettingsState::Default => write!(f, "default"),
        }
    }
}

pub struct SettingsReconciler<K, C>
where
    K: SingletonKind,
    C: SingletonClient<K>,
{
    client: Arc<C>,
    rules: Arc<DiffSuppressor>,
    state: SettingsState,
    observed: Option<K::Observed>,
    _kind: PhantomData<fn() -> K>,
}

impl<K, C> SettingsReconciler<K, C>
where
    K: SingletonKind,
    C: SingletonClient<K>,
{
    pub fn new(client: Arc<C>, rules: Arc<DiffSuppressor>) -> Self {
        Self {
            client,
            rules,
            state: SettingsState::Default,
            observed: None,
            _kind: PhantomData,
        }
    }

    /// State as of the last read, put or reset
    pub fn state(&self) -> SettingsState {
        self.state
    }

    pub fn observed(&self) -> Option<&K::Observed> {
        self.observed.as_ref()
    }

    /// Current settings, `None` when the account was never initialized
    pub async fn read(&mut self) -> Result<Option<&K::Observed>> {
        self.observed = self.client.get().await?;
        self.state = SettingsState::of::<K>(self.observed.as_ref());
        Ok(self.observed.as_ref())
    }

    /// Overwrite the singleton with `desired` in full
    pub async fn put(&mut self, desired: &K::Desired) -> Result<&K::Observed> {
        K::validate(desired)?;
        let observed = self.client.put(desired).await?;
        tracing::info!("Updated {}", K::KIND);
        self.state = SettingsState::of::<K>(Some(&observed));
        Ok(self.observed.insert(observed))
    }

    /// Reset the singleton to its default state.
    ///
    /// Always re-reads first and always issues the Put, even when the
    /// settings already hold their defaults.
    pub async fn reset(&mut self) -> Result<&K::Observed> {
        let current = match self.client.get().await {
            Ok(Some(current)) => current,
            Ok(None) => {
                return Err(CloudError::PreconditionFailed(format!(
                    "{} has never been initialized",
                    K::KIND
                )));
            }
            Err(e @ (CloudError::AuthDenied(_) | CloudError::Transport(_))) => return Err(e),
            Err(e) => {
                return Err(CloudError::PreconditionFailed(format!(
                    "cannot read {} before reset: {}",
                    K::KIND,
                    e
                )));
            }
        };

        let payload = K::reset_payload(&current);
        let observed = self.client.put(&payload).await?;
        tracing::info!("Reset {} to defaults", K::KIND);
        self.state = SettingsState::of::<K>(Some(&observed));
        Ok(self.observed.insert(observed))
    }

    /// Fields of `desired` that differ from the live singleton
    pub async fn diff(&mut self, desired: &K::Desired) -> Result<Vec<FieldChange>> {
        let declared = FieldSet::from_serialize(desired)?;
        let current = match self.read().await? {
            Some(observed) => FieldSet::from_serialize(&K::import(observed))?,
            None => FieldSet::default(),
        };
        Ok(self.rules.diff(K::KIND, &declared, &current))
    }

    /// Put `desired` only when it differs from the live singleton
    pub async fn reconcile(&mut self, desired: &K::Desired) -> Result<Option<Vec<FieldChange>>> {
        let changes = self.diff(desired).await?;
        if changes.is_empty() {
            tracing::debug!("{} is up to date", K::KIND);
            return Ok(None);
        }
        self.put(desired).await?;
        Ok(Some(changes))
    }

    pub async fn plan(&mut self, desired: &K::Desired) -> Result<Action> {
        K::validate(desired)?;
        let changes = self.diff(desired).await?;
        let action_type = if changes.is_empty() {
            ActionType::NoOp
        } else {
            ActionType::Update
        };
        Ok(Action::new(action_type, K::KIND, K::KIND).with_changes(changes))
    }

    /// Apply `desired`, returning the action that was taken
    pub async fn converge(&mut self, desired: &K::Desired) -> Result<Action> {
        match self.reconcile(desired).await? {
            None => Ok(Action::new(ActionType::NoOp, K::KIND, K::KIND)),
            Some(changes) => {
                Ok(Action::new(ActionType::Update, K::KIND, K::KIND).with_changes(changes))
            }
        }
    }
}
