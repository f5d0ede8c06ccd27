//! Activity tracker v2 REST client
//!
//! Direct API implementation with Bearer token authentication. Every call
//! maps the HTTP status onto [`CloudError`]: 404 becomes `None` (or
//! [`Removal::AlreadyGone`]), 401/403 `AuthDenied`, 400/422 `RemoteRejected`
//! with the service's first error message, 409 `Conflict`, anything else
//! `ApiError`.

use crate::config::AtrackerConfig;
use crate::error::Result;
use crate::models::{
    ListRoutesOptions, ListTargetsOptions, Route, RouteKind, RouteSpec, Settings, SettingsKind,
    SettingsSpec, Target, TargetKind, TargetSpec,
};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use routeflow_cloud::{
    CloudError, Page, PageSource, RemoteClient, Removal, ResourceIdentity, SingletonClient,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;

const API_PREFIX: &str = "/api/v2";

type CloudResult<T> = routeflow_cloud::Result<T>;

/// Client for one regional activity tracker endpoint
pub struct AtrackerClient {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl AtrackerClient {
    pub fn new(config: &AtrackerConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("routeflow/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.service_url(),
            api_token: config.api_token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    /// Send a request. `Ok(None)` means the service answered 404.
    async fn execute(&self, request: RequestBuilder) -> CloudResult<Option<Response>> {
        let response = request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        tracing::debug!("{} {}", status.as_u16(), response.url().path());

        if status.is_success() {
            return Ok(Some(response));
        }
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body = response.text().await.map_err(transport_error)?;
        Err(status_error(status, &body))
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> CloudResult<Option<T>> {
        match self.execute(request).await? {
            Some(response) => Ok(Some(decode(response).await?)),
            None => Ok(None),
        }
    }

    /// Like `fetch`, but a 404 is an error
    async fn fetch_existing<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: impl FnOnce() -> String,
    ) -> CloudResult<T> {
        self.fetch(request)
            .await?
            .ok_or_else(|| CloudError::ResourceNotFound(what()))
    }

    async fn remove(&self, path: &str, what: &str) -> CloudResult<Removal> {
        let Some(response) = self.execute(self.http.delete(self.url(path))).await? else {
            tracing::debug!("{} already gone", what);
            return Ok(Removal::AlreadyGone);
        };

        let body = response.text().await.map_err(transport_error)?;
        if let Ok(report) = serde_json::from_str::<WarningReport>(&body) {
            for warning in report.warnings {
                tracing::warn!(
                    "Deleting {}: {} ({})",
                    what,
                    warning.message,
                    warning.code.unwrap_or_default()
                );
            }
        }
        Ok(Removal::Deleted)
    }

    // ============ Targets ============

    pub async fn create_target(&self, spec: &TargetSpec) -> CloudResult<Target> {
        tracing::debug!("Creating target {}", spec.name);
        let request = self.http.post(self.url("/targets")).json(spec);
        self.fetch_existing(request, || "targets endpoint".to_string())
            .await
    }

    pub async fn get_target(&self, id: &str) -> CloudResult<Option<Target>> {
        self.fetch(self.http.get(self.url(&format!("/targets/{}", id))))
            .await
    }

    pub async fn replace_target(&self, id: &str, spec: &TargetSpec) -> CloudResult<Target> {
        let request = self
            .http
            .put(self.url(&format!("/targets/{}", id)))
            .json(spec);
        self.fetch_existing(request, || format!("target {}", id)).await
    }

    pub async fn delete_target(&self, id: &str) -> CloudResult<Removal> {
        self.remove(&format!("/targets/{}", id), &format!("target {}", id))
            .await
    }

    pub async fn list_targets(&self, options: &ListTargetsOptions) -> CloudResult<Page<Target>> {
        let mut query = Vec::new();
        if let Some(region) = &options.region {
            query.push(("region", region.clone()));
        }
        push_paging(&mut query, options.limit, options.start.as_deref());

        let request = self.http.get(self.url("/targets")).query(&query);
        let list: TargetList = self
            .fetch_existing(request, || "targets endpoint".to_string())
            .await?;
        Ok(page(list.targets, list.next))
    }

    /// Ask the service to test-write to a target; the response carries the
    /// resulting `write_status`
    pub async fn validate_target(&self, id: &str) -> CloudResult<Target> {
        let request = self.http.post(self.url(&format!("/targets/{}/validate", id)));
        self.fetch_existing(request, || format!("target {}", id)).await
    }

    // ============ Routes ============

    pub async fn create_route(&self, spec: &RouteSpec) -> CloudResult<Route> {
        tracing::debug!("Creating route {}", spec.name);
        let request = self.http.post(self.url("/routes")).json(spec);
        self.fetch_existing(request, || "routes endpoint".to_string())
            .await
    }

    pub async fn get_route(&self, id: &str) -> CloudResult<Option<Route>> {
        self.fetch(self.http.get(self.url(&format!("/routes/{}", id))))
            .await
    }

    pub async fn replace_route(&self, id: &str, spec: &RouteSpec) -> CloudResult<Route> {
        let request = self
            .http
            .put(self.url(&format!("/routes/{}", id)))
            .json(spec);
        self.fetch_existing(request, || format!("route {}", id)).await
    }

    pub async fn delete_route(&self, id: &str) -> CloudResult<Removal> {
        self.remove(&format!("/routes/{}", id), &format!("route {}", id))
            .await
    }

    pub async fn list_routes(&self, options: &ListRoutesOptions) -> CloudResult<Page<Route>> {
        let mut query = Vec::new();
        push_paging(&mut query, options.limit, options.start.as_deref());

        let request = self.http.get(self.url("/routes")).query(&query);
        let list: RouteList = self
            .fetch_existing(request, || "routes endpoint".to_string())
            .await?;
        Ok(page(list.routes, list.next))
    }

    // ============ Settings ============

    pub async fn get_settings(&self) -> CloudResult<Option<Settings>> {
        self.fetch(self.http.get(self.url("/settings"))).await
    }

    pub async fn put_settings(&self, spec: &SettingsSpec) -> CloudResult<Settings> {
        let request = self.http.put(self.url("/settings")).json(spec);
        self.fetch_existing(request, || "settings".to_string()).await
    }
}

fn push_paging(query: &mut Vec<(&'static str, String)>, limit: Option<u32>, start: Option<&str>) {
    if let Some(limit) = limit {
        query.push(("limit", limit.to_string()));
    }
    if let Some(start) = start {
        query.push(("start", start.to_string()));
    }
}

fn page<T>(items: Vec<T>, next: Option<PageLink>) -> Page<T> {
    match next {
        Some(link) => Page::with_next(items, link.href),
        None => Page::last(items),
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> CloudResult<T> {
    let body = response.text().await.map_err(transport_error)?;
    serde_json::from_str(&body)
        .map_err(|e| CloudError::ApiError(format!("unexpected response body: {}", e)))
}

fn transport_error(e: reqwest::Error) -> CloudError {
    if e.is_timeout() {
        CloudError::Transport(format!("request timed out: {}", e))
    } else {
        CloudError::Transport(e.to_string())
    }
}

fn status_error(status: StatusCode, body: &str) -> CloudError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.errors.into_iter().next())
        .map(|e| e.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            } else {
                body.trim().to_string()
            }
        });

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CloudError::AuthDenied(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => CloudError::RemoteRejected {
            status: status.as_u16(),
            message,
        },
        StatusCode::CONFLICT => CloudError::Conflict(message),
        _ => CloudError::ApiError(format!("HTTP {}: {}", status.as_u16(), message)),
    }
}

#[async_trait]
impl PageSource<ListTargetsOptions> for AtrackerClient {
    type Item = Target;

    async fn list_page(&self, options: &ListTargetsOptions) -> CloudResult<Page<Target>> {
        self.list_targets(options).await
    }
}

#[async_trait]
impl RemoteClient<TargetKind> for AtrackerClient {
    async fn create(&self, payload: &TargetSpec) -> CloudResult<Target> {
        self.create_target(payload).await
    }

    async fn read(&self, id: &ResourceIdentity) -> CloudResult<Option<Target>> {
        self.get_target(id.as_str()).await
    }

    async fn replace(&self, id: &ResourceIdentity, payload: &TargetSpec) -> CloudResult<Target> {
        self.replace_target(id.as_str(), payload).await
    }

    async fn delete(&self, id: &ResourceIdentity) -> CloudResult<Removal> {
        self.delete_target(id.as_str()).await
    }
}

#[async_trait]
impl PageSource<ListRoutesOptions> for AtrackerClient {
    type Item = Route;

    async fn list_page(&self, options: &ListRoutesOptions) -> CloudResult<Page<Route>> {
        self.list_routes(options).await
    }
}

#[async_trait]
impl RemoteClient<RouteKind> for AtrackerClient {
    async fn create(&self, payload: &RouteSpec) -> CloudResult<Route> {
        self.create_route(payload).await
    }

    async fn read(&self, id: &ResourceIdentity) -> CloudResult<Option<Route>> {
        self.get_route(id.as_str()).await
    }

    async fn replace(&self, id: &ResourceIdentity, payload: &RouteSpec) -> CloudResult<Route> {
        self.replace_route(id.as_str(), payload).await
    }

    async fn delete(&self, id: &ResourceIdentity) -> CloudResult<Removal> {
        self.delete_route(id.as_str()).await
    }
}

#[async_trait]
impl SingletonClient<SettingsKind> for AtrackerClient {
    async fn get(&self) -> CloudResult<Option<Settings>> {
        self.get_settings().await
    }

    async fn put(&self, payload: &SettingsSpec) -> CloudResult<Settings> {
        self.put_settings(payload).await
    }
}

// ============ API Types ============

#[derive(Debug, Deserialize)]
struct PageLink {
    href: String,
}

#[derive(Debug, Deserialize)]
struct TargetList {
    #[serde(default)]
    targets: Vec<Target>,
    #[serde(default)]
    next: Option<PageLink>,
}

#[derive(Debug, Deserialize)]
struct RouteList {
    #[serde(default)]
    routes: Vec<Route>,
    #[serde(default)]
    next: Option<PageLink>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    errors: Vec<ApiErrorItem>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorItem {
    message: String,
}

#[derive(Debug, Deserialize)]
struct WarningReport {
    #[serde(default)]
    warnings: Vec<Warning>,
}

#[derive(Debug, Deserialize)]
struct Warning {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CosEndpoint, Rule, TargetType, rules};
    use routeflow_cloud::{Pager, ReconcileOutcome, ResourceReconciler, SettingsReconciler};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TARGET_ID: &str = "f7dcfae6-e7c5-08ca-451b-fdfa696c9bb6";
    const BUCKET_CRN: &str = "crn:v1:bluemix:public:cloud-object-storage:global:a/11111111111111111111111111111111:22222222-2222-2222-2222-222222222222::";

    fn client_for(server: &MockServer) -> AtrackerClient {
        let config = AtrackerConfig::new("test-token").with_endpoint(server.uri());
        AtrackerClient::new(&config).unwrap()
    }

    fn cos_spec(name: &str) -> TargetSpec {
        TargetSpec {
            name: name.to_string(),
            target_type: TargetType::CloudObjectStorage,
            cos_endpoint: Some(CosEndpoint {
                endpoint: "s3.private.us-east.cloud-object-storage.appdomain.cloud".to_string(),
                target_crn: BUCKET_CRN.to_string(),
                bucket: "my-atracker-bucket".to_string(),
                api_key: Some("xxxxxxxxxxxxxx".to_string()),
                service_to_service_enabled: None,
            }),
            eventstreams_endpoint: None,
            cloudlogs_endpoint: None,
            region: None,
        }
    }

    fn target_json(id: &str, name: &str, crn_suffix: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "crn": format!("crn:v1:bluemix:public:atracker:us-south:a/11111111111111111111111111111111:b6eec08b-5201-08ca-451b-cd71523e3626:target:{}", id),
            "target_type": "cloud_object_storage",
            "region": "us-south",
            "cos_endpoint": {
                "endpoint": "s3.private.us-east.cloud-object-storage.appdomain.cloud",
                "target_crn": format!("{}{}", BUCKET_CRN, crn_suffix),
                "bucket": "my-atracker-bucket",
                "service_to_service_enabled": false
            },
            "write_status": {"status": "success"},
            "created_at": "2021-05-18T20:15:12.353Z",
            "updated_at": "2021-05-18T20:15:12.353Z",
            "api_version": 2
        })
    }

    fn error_json(message: &str) -> Value {
        json!({
            "errors": [{"code": "bad_request", "message": message, "more_info": "https://cloud.ibm.com/apidocs/atracker"}],
            "trace": "1a2b3c",
            "status_code": 400
        })
    }

    #[tokio::test]
    async fn test_create_target_sends_spec_with_bearer_token() {
        let server = MockServer::start().await;
        let spec = cos_spec("a-cos-target-us-south");

        Mock::given(method("POST"))
            .and(path("/api/v2/targets"))
            .and(header("authorization", "Bearer test-token"))
            .and(body_json(serde_json::to_value(&spec).unwrap()))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(target_json(TARGET_ID, "a-cos-target-us-south", "")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let target = client_for(&server).create_target(&spec).await.unwrap();
        assert_eq!(target.id, TARGET_ID);
        assert_eq!(target.region.as_deref(), Some("us-south"));
    }

    #[tokio::test]
    async fn test_get_missing_target_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/targets/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(error_json("Target not found")))
            .mount(&server)
            .await;

        assert!(client_for(&server).get_target("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejection_carries_first_message_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/targets"))
            .respond_with(ResponseTemplate::new(400).set_body_json(error_json(
                "The bucket my-atracker-bucket does not exist.",
            )))
            .mount(&server)
            .await;

        match client_for(&server).create_target(&cos_spec("t")).await {
            Err(CloudError::RemoteRejected { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "The bucket my-atracker-bucket does not exist.");
            }
            other => panic!("expected RemoteRejected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/targets/denied"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/v2/targets/busy"))
            .respond_with(ResponseTemplate::new(409).set_body_json(error_json("name in use")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v2/targets/broken"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(matches!(
            client.get_target("denied").await,
            Err(CloudError::AuthDenied(_))
        ));
        match client.replace_target("busy", &cos_spec("t")).await {
            Err(CloudError::Conflict(message)) => assert_eq!(message, "name in use"),
            other => panic!("expected Conflict, got {:?}", other),
        }
        match client.get_target("broken").await {
            Err(CloudError::ApiError(message)) => {
                assert_eq!(message, "HTTP 503: upstream unavailable")
            }
            other => panic!("expected ApiError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_replace_of_missing_target_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/v2/targets/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(matches!(
            client_for(&server).replace_target("gone", &cos_spec("t")).await,
            Err(CloudError::ResourceNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_timeout_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/settings"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let config = AtrackerConfig::new("test-token")
            .with_endpoint(server.uri())
            .with_timeout(Duration::from_millis(100));
        let client = AtrackerClient::new(&config).unwrap();

        assert!(matches!(
            client.get_settings().await,
            Err(CloudError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_truncated_error_body_is_transport_error() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            // promises 64 bytes, sends fewer, then hangs up
            let _ = socket
                .write_all(
                    b"HTTP/1.1 500 Internal Server Error\r\n\
                      Content-Type: application/json\r\n\
                      Content-Length: 64\r\n\r\n{\"errors\":",
                )
                .await;
        });

        let config = AtrackerConfig::new("test-token").with_endpoint(format!("http://{}", addr));
        let client = AtrackerClient::new(&config).unwrap();

        assert!(matches!(
            client.get_settings().await,
            Err(CloudError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_treats_not_found_as_already_gone() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(format!("/api/v2/targets/{}", TARGET_ID)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status_code": 200,
                "trace": "Trace",
                "warnings": [{"code": "default_target", "message": "Target was a default target"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/v2/routes/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/v2/routes/plain"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(client.delete_target(TARGET_ID).await.unwrap(), Removal::Deleted);
        assert_eq!(client.delete_route("gone").await.unwrap(), Removal::AlreadyGone);
        assert_eq!(client.delete_route("plain").await.unwrap(), Removal::Deleted);
    }

    #[tokio::test]
    async fn test_pager_follows_next_href() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/targets"))
            .and(query_param("region", "us-south"))
            .and(query_param_is_missing("start"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "targets": [target_json("t1", "first", ""), target_json("t2", "second", "")],
                "next": {"href": format!("{}/api/v2/targets?limit=2&region=us-south&start=cursor-2", server.uri())}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v2/targets"))
            .and(query_param("region", "us-south"))
            .and(query_param("start", "cursor-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "targets": [target_json("t3", "third", "")]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let options = ListTargetsOptions {
            region: Some("us-south".to_string()),
            limit: Some(2),
            start: None,
        };
        let mut pager = Pager::new(&client, options).unwrap();
        let targets = pager.get_all().await.unwrap();

        let ids: Vec<&str> = targets.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t2", "t3"]);
        assert_eq!(pager.pages_fetched(), 2);
    }

    #[tokio::test]
    async fn test_list_routes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/routes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "routes": [{
                    "id": "c3af557f-fb0e-4476-85c3-0889e7fe7bc4",
                    "name": "my-route",
                    "crn": "crn:v1:bluemix:public:atracker:global:a/11111111111111111111111111111111:b6eec08b-5201-08ca-451b-cd71523e3626:route:c3af557f-fb0e-4476-85c3-0889e7fe7bc4",
                    "version": 0,
                    "rules": [{"target_ids": [TARGET_ID], "locations": ["us-south"]}],
                    "created_at": "2021-05-18T20:15:12.353Z",
                    "updated_at": "2021-05-18T20:15:12.353Z",
                    "api_version": 2,
                    "message": "Route was created successfully."
                }]
            })))
            .mount(&server)
            .await;

        let page = client_for(&server)
            .list_routes(&ListRoutesOptions::default())
            .await
            .unwrap();
        assert!(page.next_url.is_none());
        assert_eq!(page.items.len(), 1);
        assert_eq!(
            page.items[0].rules,
            vec![Rule {
                target_ids: vec![TARGET_ID.to_string()],
                locations: vec!["us-south".to_string()],
            }]
        );
    }

    #[tokio::test]
    async fn test_validate_target() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/api/v2/targets/{}/validate", TARGET_ID)))
            .respond_with(ResponseTemplate::new(200).set_body_json(target_json(TARGET_ID, "t", "")))
            .expect(1)
            .mount(&server)
            .await;

        let target = client_for(&server).validate_target(TARGET_ID).await.unwrap();
        assert_eq!(target.write_status.unwrap().status, "success");
    }

    #[tokio::test]
    async fn test_reconcile_suppressed_crn_suffix_issues_no_put() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/api/v2/targets/{}", TARGET_ID)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(target_json(TARGET_ID, "audit", "extra-suffix")),
            )
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = Arc::new(client_for(&server));
        let mut reconciler: ResourceReconciler<TargetKind, AtrackerClient> =
            ResourceReconciler::bind(client, Arc::new(rules()), TARGET_ID.into());

        let outcome = reconciler.reconcile(&cos_spec("audit")).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::NoOp);
    }

    #[tokio::test]
    async fn test_settings_reset_puts_cleared_collections() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/settings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "default_targets": [TARGET_ID],
                "permitted_target_regions": ["us-south"],
                "metadata_region_primary": "us-south",
                "metadata_region_backup": "eu-de",
                "private_api_endpoint_only": false,
                "api_version": 2
            })))
            .mount(&server)
            .await;

        let expected = json!({
            "metadata_region_primary": "us-south",
            "metadata_region_backup": "eu-de",
            "private_api_endpoint_only": false,
            "default_targets": [],
            "permitted_target_regions": []
        });
        let mut stored = expected.clone();
        stored["api_version"] = json!(2);
        Mock::given(method("PUT"))
            .and(path("/api/v2/settings"))
            .and(body_json(expected))
            .respond_with(ResponseTemplate::new(200).set_body_json(stored))
            .expect(2)
            .mount(&server)
            .await;

        let client = Arc::new(client_for(&server));
        let mut reconciler: SettingsReconciler<SettingsKind, AtrackerClient> =
            SettingsReconciler::new(client, Arc::new(rules()));

        let first = reconciler.reset().await.unwrap().clone();
        let second = reconciler.reset().await.unwrap().clone();
        assert_eq!(first, second);
        assert!(first.spec.default_targets.is_empty());
    }

    #[tokio::test]
    async fn test_uninitialized_settings() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/settings"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.get_settings().await.unwrap().is_none());
    }
}
