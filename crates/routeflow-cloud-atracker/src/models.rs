//! Typed resources of the activity tracker v2 API
//!
//! Each resource has a declared form (`*Spec`, what the manifest says and
//! what is sent on create/replace) and an observed form (what the service
//! returns, including server-assigned metadata).

use chrono::{DateTime, Utc};
use routeflow_cloud::{
    CloudError, ComparisonRule, DiffSuppressor, ListOptions, ResourceIdentity, ResourceKind,
    SingletonKind,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

const NAME_MAX_LEN: usize = 1000;
const REGION_MIN_LEN: usize = 3;

/// Number of CRN segments that identify a storage target
pub const COS_CRN_PARTS: usize = 8;

// ============ Targets ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    CloudObjectStorage,
    EventStreams,
    CloudLogs,
}

impl std::fmt::Display for TargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetType::CloudObjectStorage => write!(f, "cloud_object_storage"),
            TargetType::EventStreams => write!(f, "event_streams"),
            TargetType::CloudLogs => write!(f, "cloud_logs"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CosEndpoint {
    pub endpoint: String,
    pub target_crn: String,
    pub bucket: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_to_service_enabled: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventStreamsEndpoint {
    pub target_crn: String,
    pub brokers: Vec<String>,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_to_service_enabled: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudLogsEndpoint {
    pub target_crn: String,
}

/// Declared target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub name: String,
    pub target_type: TargetType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cos_endpoint: Option<CosEndpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eventstreams_endpoint: Option<EventStreamsEndpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloudlogs_endpoint: Option<CloudLogsEndpoint>,
    /// Region the target lives in; the service picks the caller's region when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_failure: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_for_last_failure: Option<String>,
}

/// Target as returned by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub crn: Option<String>,
    pub target_type: TargetType,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cos_endpoint: Option<CosEndpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eventstreams_endpoint: Option<EventStreamsEndpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloudlogs_endpoint: Option<CloudLogsEndpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_status: Option<WriteStatus>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub api_version: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct ListTargetsOptions {
    /// Only targets in this region
    pub region: Option<String>,
    pub limit: Option<u32>,
    pub start: Option<String>,
}

impl ListOptions for ListTargetsOptions {
    fn start(&self) -> Option<&str> {
        self.start.as_deref()
    }

    fn set_start(&mut self, start: Option<String>) {
        self.start = start;
    }
}

pub struct TargetKind;

impl ResourceKind for TargetKind {
    const KIND: &'static str = "target";

    type Desired = TargetSpec;
    type Observed = Target;
    type ListOptions = ListTargetsOptions;

    fn identity(observed: &Target) -> ResourceIdentity {
        ResourceIdentity::new(observed.id.clone())
    }

    fn import(observed: &Target) -> TargetSpec {
        // api keys come back masked and cannot be reconstructed
        TargetSpec {
            name: observed.name.clone(),
            target_type: observed.target_type,
            cos_endpoint: observed.cos_endpoint.clone().map(|e| CosEndpoint {
                api_key: None,
                ..e
            }),
            eventstreams_endpoint: observed
                .eventstreams_endpoint
                .clone()
                .map(|e| EventStreamsEndpoint { api_key: None, ..e }),
            cloudlogs_endpoint: observed.cloudlogs_endpoint.clone(),
            region: observed.region.clone(),
        }
    }

    fn natural_key(desired: &TargetSpec) -> Option<String> {
        Some(desired.name.clone())
    }

    fn immutable_fields() -> &'static [&'static str] {
        &["target_type", "region"]
    }

    fn validate(desired: &TargetSpec) -> routeflow_cloud::Result<()> {
        validate_name("target", &desired.name)?;
        if let Some(region) = &desired.region {
            validate_region(region)?;
        }

        let endpoint_field = match desired.target_type {
            TargetType::CloudObjectStorage => "cos_endpoint",
            TargetType::EventStreams => "eventstreams_endpoint",
            TargetType::CloudLogs => "cloudlogs_endpoint",
        };
        let declared: Vec<&str> = [
            ("cos_endpoint", desired.cos_endpoint.is_some()),
            ("eventstreams_endpoint", desired.eventstreams_endpoint.is_some()),
            ("cloudlogs_endpoint", desired.cloudlogs_endpoint.is_some()),
        ]
        .into_iter()
        .filter_map(|(field, present)| present.then_some(field))
        .collect();

        if declared != [endpoint_field] {
            return Err(CloudError::InvalidConfig(format!(
                "target '{}' of type {} needs exactly {} (found: {})",
                desired.name,
                desired.target_type,
                endpoint_field,
                if declared.is_empty() {
                    "none".to_string()
                } else {
                    declared.join(", ")
                }
            )));
        }

        if let Some(es) = &desired.eventstreams_endpoint {
            if es.brokers.is_empty() {
                return Err(CloudError::InvalidConfig(format!(
                    "target '{}': eventstreams_endpoint needs at least one broker",
                    desired.name
                )));
            }
        }
        Ok(())
    }
}

// ============ Routes ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub target_ids: Vec<String>,
    /// Source locations; empty means the route's default locations
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<String>,
}

/// Declared route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSpec {
    pub name: String,
    pub rules: Vec<Rule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_by: Option<String>,
}

/// Route as returned by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub crn: Option<String>,
    #[serde(default)]
    pub version: Option<i64>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_by: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub api_version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ListRoutesOptions {
    pub limit: Option<u32>,
    pub start: Option<String>,
}

impl ListOptions for ListRoutesOptions {
    fn start(&self) -> Option<&str> {
        self.start.as_deref()
    }

    fn set_start(&mut self, start: Option<String>) {
        self.start = start;
    }
}

pub struct RouteKind;

impl ResourceKind for RouteKind {
    const KIND: &'static str = "route";

    type Desired = RouteSpec;
    type Observed = Route;
    type ListOptions = ListRoutesOptions;

    fn identity(observed: &Route) -> ResourceIdentity {
        ResourceIdentity::new(observed.id.clone())
    }

    fn import(observed: &Route) -> RouteSpec {
        RouteSpec {
            name: observed.name.clone(),
            rules: observed.rules.clone(),
            managed_by: observed.managed_by.clone(),
        }
    }

    fn natural_key(desired: &RouteSpec) -> Option<String> {
        Some(desired.name.clone())
    }

    fn validate(desired: &RouteSpec) -> routeflow_cloud::Result<()> {
        validate_name("route", &desired.name)?;
        if desired.rules.is_empty() {
            return Err(CloudError::InvalidConfig(format!(
                "route '{}' needs at least one rule",
                desired.name
            )));
        }
        if let Some(i) = desired.rules.iter().position(|r| r.target_ids.is_empty()) {
            return Err(CloudError::InvalidConfig(format!(
                "route '{}': rule {} has no target_ids",
                desired.name,
                i + 1
            )));
        }
        Ok(())
    }
}

// ============ Settings ============

/// Declared account settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsSpec {
    pub metadata_region_primary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_region_backup: Option<String>,
    #[serde(default)]
    pub private_api_endpoint_only: bool,
    #[serde(default)]
    pub default_targets: Vec<String>,
    #[serde(default)]
    pub permitted_target_regions: Vec<String>,
}

/// Account settings as returned by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(flatten)]
    pub spec: SettingsSpec,
    #[serde(default)]
    pub api_version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub struct SettingsKind;

impl ResourceKind for SettingsKind {
    const KIND: &'static str = "settings";

    type Desired = SettingsSpec;
    type Observed = Settings;
    type ListOptions = ();

    fn identity(_observed: &Settings) -> ResourceIdentity {
        ResourceIdentity::new("settings")
    }

    fn import(observed: &Settings) -> SettingsSpec {
        observed.spec.clone()
    }

    fn validate(desired: &SettingsSpec) -> routeflow_cloud::Result<()> {
        validate_region(&desired.metadata_region_primary)?;
        if let Some(backup) = &desired.metadata_region_backup {
            validate_region(backup)?;
        }
        for region in &desired.permitted_target_regions {
            validate_region(region)?;
        }
        Ok(())
    }
}

impl SingletonKind for SettingsKind {
    fn reset_payload(observed: &Settings) -> SettingsSpec {
        SettingsSpec {
            metadata_region_primary: observed.spec.metadata_region_primary.clone(),
            metadata_region_backup: observed.spec.metadata_region_backup.clone(),
            private_api_endpoint_only: observed.spec.private_api_endpoint_only,
            default_targets: Vec::new(),
            permitted_target_regions: Vec::new(),
        }
    }

    /// The primary region and the endpoint restriction are always sent, and
    /// the backup region is filled by the service, so only the collections
    /// decide.
    fn is_default(observed: &Settings) -> bool {
        observed.spec.default_targets.is_empty()
            && observed.spec.permitted_target_regions.is_empty()
    }
}

// ============ Comparison rules ============

/// Comparison rules for every activity tracker kind
pub fn rules() -> DiffSuppressor {
    DiffSuppressor::new()
        .with_rule(
            TargetKind::KIND,
            "cos_endpoint.target_crn",
            ComparisonRule::StructuredIdentifierPrefix(COS_CRN_PARTS),
        )
        .with_rule(TargetKind::KIND, "cos_endpoint.api_key", ComparisonRule::ApplyOnce)
        .with_rule(
            TargetKind::KIND,
            "eventstreams_endpoint.api_key",
            ComparisonRule::ApplyOnce,
        )
        .with_rule(
            TargetKind::KIND,
            "cos_endpoint.service_to_service_enabled",
            ComparisonRule::DefaultValueEquivalent(json!(false)),
        )
        .with_rule(
            TargetKind::KIND,
            "eventstreams_endpoint.service_to_service_enabled",
            ComparisonRule::DefaultValueEquivalent(json!(false)),
        )
        .with_rule(TargetKind::KIND, "region", ComparisonRule::ServerComputed)
        .with_rule(
            RouteKind::KIND,
            "managed_by",
            ComparisonRule::DefaultValueEquivalent(json!("account")),
        )
        .with_rule(
            SettingsKind::KIND,
            "default_targets",
            ComparisonRule::DefaultValueEquivalent(json!([])),
        )
        .with_rule(
            SettingsKind::KIND,
            "permitted_target_regions",
            ComparisonRule::DefaultValueEquivalent(json!([])),
        )
        .with_rule(
            SettingsKind::KIND,
            "private_api_endpoint_only",
            ComparisonRule::DefaultValueEquivalent(json!(false)),
        )
        .with_rule(
            SettingsKind::KIND,
            "metadata_region_backup",
            ComparisonRule::ServerComputed,
        )
}

// ============ Validation ============

fn is_allowed_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '.' | '_' | ':')
}

fn validate_name(kind: &str, name: &str) -> routeflow_cloud::Result<()> {
    let len = name.chars().count();
    if len == 0 || len > NAME_MAX_LEN {
        return Err(CloudError::InvalidConfig(format!(
            "{} name must be 1-{} characters, got {}",
            kind, NAME_MAX_LEN, len
        )));
    }
    if let Some(c) = name.chars().find(|c| !is_allowed_char(*c)) {
        return Err(CloudError::InvalidConfig(format!(
            "{} name '{}' contains invalid character '{}'",
            kind, name, c
        )));
    }
    Ok(())
}

fn validate_region(region: &str) -> routeflow_cloud::Result<()> {
    let len = region.chars().count();
    if !(REGION_MIN_LEN..=NAME_MAX_LEN).contains(&len) || !region.chars().all(is_allowed_char) {
        return Err(CloudError::InvalidConfig(format!(
            "invalid region '{}'",
            region
        )));
    }
    Ok(())
}
