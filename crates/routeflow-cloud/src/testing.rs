//! In-memory resource kinds and clients for reconciler tests

use crate::client::{ListOptions, Page, PageSource, RemoteClient, Removal, SingletonClient};
use crate::error::{CloudError, Result};
use crate::resource::{ResourceIdentity, ResourceKind};
use crate::settings::SingletonKind;
use crate::suppress::{ComparisonRule, DiffSuppressor};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use std::sync::Mutex;

pub const WIDGET_CRN: &str = "crn:v1:bluemix:public:cos:global:a/ACCT:INST::";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WidgetSpec {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backing_crn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    pub tags: Vec<String>,
}

impl WidgetSpec {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            backing_crn: Some(WIDGET_CRN.to_string()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Widget {
    pub id: String,
    pub name: String,
    pub zone: String,
    pub backing_crn: Option<String>,
    pub tier: String,
    pub tags: Vec<String>,
    pub revision: u32,
}

#[derive(Debug, Clone, Default)]
pub struct ListWidgetsOptions {
    pub start: Option<String>,
}

impl ListOptions for ListWidgetsOptions {
    fn start(&self) -> Option<&str> {
        self.start.as_deref()
    }

    fn set_start(&mut self, start: Option<String>) {
        self.start = start;
    }
}

pub struct WidgetKind;

impl ResourceKind for WidgetKind {
    const KIND: &'static str = "widget";

    type Desired = WidgetSpec;
    type Observed = Widget;
    type ListOptions = ListWidgetsOptions;

    fn identity(observed: &Widget) -> ResourceIdentity {
        ResourceIdentity::new(observed.id.clone())
    }

    fn import(observed: &Widget) -> WidgetSpec {
        WidgetSpec {
            name: observed.name.clone(),
            zone: Some(observed.zone.clone()),
            backing_crn: observed.backing_crn.clone(),
            tier: Some(observed.tier.clone()),
            tags: observed.tags.clone(),
        }
    }

    fn natural_key(desired: &WidgetSpec) -> Option<String> {
        Some(desired.name.clone())
    }

    fn immutable_fields() -> &'static [&'static str] {
        &["zone"]
    }

    fn validate(desired: &WidgetSpec) -> Result<()> {
        if desired.name.is_empty() {
            return Err(CloudError::InvalidConfig("widget name must not be empty".to_string()));
        }
        Ok(())
    }
}

pub fn widget_rules() -> DiffSuppressor {
    DiffSuppressor::new()
        .with_rule("widget", "zone", ComparisonRule::ServerComputed)
        .with_rule("widget", "backing_crn", ComparisonRule::StructuredIdentifierPrefix(8))
        .with_rule("widget", "tier", ComparisonRule::DefaultValueEquivalent(json!("standard")))
}

#[derive(Default)]
struct WidgetStore {
    objects: Vec<Widget>,
    calls: Vec<String>,
    next_id: u32,
    reject_create: Option<String>,
    deny_all: bool,
}

/// Fake backend for [`WidgetKind`] that pages its list endpoint
pub struct FakeWidgetClient {
    store: Mutex<WidgetStore>,
    page_size: usize,
}

impl FakeWidgetClient {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(WidgetStore::default()),
            page_size: 2,
        }
    }

    /// Insert an object as if created out-of-band
    pub fn seed(&self, spec: &WidgetSpec) -> Widget {
        let mut store = self.store.lock().unwrap();
        let widget = materialize(&mut store, spec);
        store.objects.push(widget.clone());
        widget
    }

    /// Remove an object as if deleted out-of-band
    pub fn remove(&self, id: &str) {
        self.store.lock().unwrap().objects.retain(|w| w.id != id);
    }

    pub fn reject_create(&self, message: &str) {
        self.store.lock().unwrap().reject_create = Some(message.to_string());
    }

    pub fn deny_all(&self) {
        self.store.lock().unwrap().deny_all = true;
    }

    pub fn calls(&self) -> Vec<String> {
        self.store.lock().unwrap().calls.clone()
    }

    /// Calls other than reads and lists
    pub fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| !c.starts_with("read") && !c.starts_with("list"))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.store.lock().unwrap().calls.clear();
    }

    pub fn get(&self, id: &str) -> Option<Widget> {
        self.store
            .lock()
            .unwrap()
            .objects
            .iter()
            .find(|w| w.id == id)
            .cloned()
    }
}

fn materialize(store: &mut WidgetStore, spec: &WidgetSpec) -> Widget {
    store.next_id += 1;
    Widget {
        id: format!("widget-{}", store.next_id),
        name: spec.name.clone(),
        zone: spec.zone.clone().unwrap_or_else(|| "us-south".to_string()),
        backing_crn: spec.backing_crn.clone(),
        tier: spec.tier.clone().unwrap_or_else(|| "standard".to_string()),
        tags: spec.tags.clone(),
        revision: 0,
    }
}

#[async_trait]
impl PageSource<ListWidgetsOptions> for FakeWidgetClient {
    type Item = Widget;

    async fn list_page(&self, options: &ListWidgetsOptions) -> Result<Page<Widget>> {
        let mut store = self.store.lock().unwrap();
        store
            .calls
            .push(format!("list:{}", options.start.as_deref().unwrap_or("")));

        let offset: usize = match options.start.as_deref() {
            Some(start) => start
                .parse()
                .map_err(|_| CloudError::ApiError(format!("bad cursor {}", start)))?,
            None => 0,
        };
        let end = (offset + self.page_size).min(store.objects.len());
        let items = store.objects[offset.min(end)..end].to_vec();

        if end < store.objects.len() {
            Ok(Page::with_next(
                items,
                format!("https://widgets.example.com/v1/widgets?limit={}&start={}", self.page_size, end),
            ))
        } else {
            Ok(Page::last(items))
        }
    }
}

#[async_trait]
impl RemoteClient<WidgetKind> for FakeWidgetClient {
    async fn create(&self, payload: &WidgetSpec) -> Result<Widget> {
        let mut store = self.store.lock().unwrap();
        store.calls.push("create".to_string());
        if store.deny_all {
            return Err(CloudError::AuthDenied("token lacks writer role".to_string()));
        }
        if let Some(message) = store.reject_create.clone() {
            return Err(CloudError::RemoteRejected {
                status: 400,
                message,
            });
        }
        let widget = materialize(&mut store, payload);
        store.objects.push(widget.clone());
        Ok(widget)
    }

    async fn read(&self, id: &ResourceIdentity) -> Result<Option<Widget>> {
        let mut store = self.store.lock().unwrap();
        store.calls.push(format!("read:{}", id));
        Ok(store.objects.iter().find(|w| w.id == id.as_str()).cloned())
    }

    async fn replace(&self, id: &ResourceIdentity, payload: &WidgetSpec) -> Result<Widget> {
        let mut store = self.store.lock().unwrap();
        store.calls.push(format!("replace:{}", id));
        let Some(existing) = store.objects.iter_mut().find(|w| w.id == id.as_str()) else {
            return Err(CloudError::ResourceNotFound(format!("widget {}", id)));
        };
        existing.name = payload.name.clone();
        existing.backing_crn = payload.backing_crn.clone();
        existing.tier = payload.tier.clone().unwrap_or_else(|| "standard".to_string());
        existing.tags = payload.tags.clone();
        existing.revision += 1;
        Ok(existing.clone())
    }

    async fn delete(&self, id: &ResourceIdentity) -> Result<Removal> {
        let mut store = self.store.lock().unwrap();
        store.calls.push(format!("delete:{}", id));
        let before = store.objects.len();
        store.objects.retain(|w| w.id != id.as_str());
        if store.objects.len() < before {
            Ok(Removal::Deleted)
        } else {
            Ok(Removal::AlreadyGone)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PrefsSpec {
    pub primary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<String>,
    pub default_targets: Vec<String>,
    pub permitted_regions: Vec<String>,
    pub private_only: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prefs {
    pub spec: PrefsSpec,
    pub api_version: u32,
}

pub struct PrefsKind;

impl ResourceKind for PrefsKind {
    const KIND: &'static str = "prefs";

    type Desired = PrefsSpec;
    type Observed = Prefs;
    type ListOptions = ();

    fn identity(_observed: &Prefs) -> ResourceIdentity {
        ResourceIdentity::new("prefs")
    }

    fn import(observed: &Prefs) -> PrefsSpec {
        observed.spec.clone()
    }
}

impl SingletonKind for PrefsKind {
    fn reset_payload(observed: &Prefs) -> PrefsSpec {
        PrefsSpec {
            primary: observed.spec.primary.clone(),
            backup: observed.spec.backup.clone(),
            default_targets: Vec::new(),
            permitted_regions: Vec::new(),
            private_only: observed.spec.private_only,
        }
    }

    fn is_default(observed: &Prefs) -> bool {
        observed.spec.default_targets.is_empty() && observed.spec.permitted_regions.is_empty()
    }
}

pub fn prefs_rules() -> DiffSuppressor {
    DiffSuppressor::new()
        .with_rule("prefs", "backup", ComparisonRule::ServerComputed)
        .with_rule("prefs", "default_targets", ComparisonRule::DefaultValueEquivalent(json!([])))
}

/// Fake singleton backend
pub struct FakePrefsClient {
    current: Mutex<Option<Prefs>>,
    puts: Mutex<Vec<PrefsSpec>>,
    fail_get: Mutex<bool>,
}

impl FakePrefsClient {
    pub fn uninitialized() -> Self {
        Self {
            current: Mutex::new(None),
            puts: Mutex::new(Vec::new()),
            fail_get: Mutex::new(false),
        }
    }

    pub fn with(spec: PrefsSpec) -> Self {
        let client = Self::uninitialized();
        *client.current.lock().unwrap() = Some(Prefs {
            spec,
            api_version: 2,
        });
        client
    }

    pub fn fail_get(&self) {
        *self.fail_get.lock().unwrap() = true;
    }

    pub fn puts(&self) -> Vec<PrefsSpec> {
        self.puts.lock().unwrap().clone()
    }

    pub fn current(&self) -> Option<Prefs> {
        self.current.lock().unwrap().clone()
    }
}

#[async_trait]
impl SingletonClient<PrefsKind> for FakePrefsClient {
    async fn get(&self) -> Result<Option<Prefs>> {
        if *self.fail_get.lock().unwrap() {
            return Err(CloudError::ApiError("settings service unavailable".to_string()));
        }
        Ok(self.current.lock().unwrap().clone())
    }

    async fn put(&self, payload: &PrefsSpec) -> Result<Prefs> {
        self.puts.lock().unwrap().push(payload.clone());
        let mut spec = payload.clone();
        if spec.backup.is_none() {
            spec.backup = Some("eu-de".to_string());
        }
        let prefs = Prefs {
            spec,
            api_version: 2,
        };
        *self.current.lock().unwrap() = Some(prefs.clone());
        Ok(prefs)
    }
}
