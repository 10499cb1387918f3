use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::client::model::{MessageBody, UpdateRequestResp};
use crate::config::Config;
use crate::context::{RequestContext, Role};
use crate::model::{
    AuditLogEntry, Event, NewWfhRequest, Profile, RequestAction, RequestUpdate, ScheduleEntry,
    WfhRequest,
};

pub mod model;
pub mod retry;

pub use retry::with_retry;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
    #[error("invalid {service} URL: {detail}")]
    InvalidUrl { service: &'static str, detail: String },
    #[error("failed to reach {service}: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{service} error {status}: {message}")]
    Status {
        service: &'static str,
        status: StatusCode,
        message: String,
    },
    #[error("invalid {service} response: {source}")]
    Decode {
        service: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl ClientError {
    /// Message suitable for showing to the user: the server's own text
    /// for rejected calls, the error itself otherwise.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

const PROFILE: &str = "profile service";
const SCHEDULE: &str = "schedule service";
const REQUEST: &str = "request service";
const AUDIT: &str = "audit log service";
const EVENT: &str = "event service";

/// Which schedules a view asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleScope {
    All,
    Staff(i64),
    Manager(i64),
}

impl ScheduleScope {
    /// Managers see their team, staff see their own schedule, HR and
    /// directors see everything.
    pub fn for_context(ctx: &RequestContext) -> Self {
        match ctx.role() {
            Role::Manager => ScheduleScope::Manager(ctx.staff_id()),
            Role::Staff => ScheduleScope::Staff(ctx.staff_id()),
            Role::Hr | Role::Director => ScheduleScope::All,
        }
    }

    fn path(&self) -> String {
        match self {
            ScheduleScope::All => "schedules".to_string(),
            ScheduleScope::Staff(id) => format!("schedules/{}", id),
            ScheduleScope::Manager(id) => format!("schedules/manager/{}", id),
        }
    }
}

#[async_trait]
pub trait ScheduleService: Send + Sync {
    async fn schedules(&self, scope: ScheduleScope) -> Result<Vec<ScheduleEntry>, ClientError>;
}

#[async_trait]
pub trait ProfileService: Send + Sync {
    async fn profile(&self, staff_id: i64) -> Result<Profile, ClientError>;

    async fn profiles(&self) -> Result<Vec<Profile>, ClientError>;
}

#[async_trait]
pub trait RequestService: Send + Sync {
    /// Apply `action` to a request; returns the service's acknowledgement.
    async fn transition_request(
        &self,
        ctx: &RequestContext,
        request_id: i64,
        action: RequestAction,
    ) -> Result<String, ClientError>;
}

#[derive(Debug, Clone)]
pub struct ServiceUrls {
    pub profile: Url,
    pub schedule: Url,
    pub request: Url,
    pub audit: Url,
    pub event: Url,
}

impl ServiceUrls {
    pub fn from_config(cfg: &Config) -> Result<Self, ClientError> {
        let s = &cfg.services;
        Ok(Self {
            profile: base_url(PROFILE, &s.profile)?,
            schedule: base_url(SCHEDULE, &s.schedule)?,
            request: base_url(REQUEST, &s.request)?,
            audit: base_url(AUDIT, &s.audit)?,
            event: base_url(EVENT, &s.event)?,
        })
    }
}

/// Parse a base URL so that `join` appends to its path instead of
/// replacing the last segment.
fn base_url(service: &'static str, raw: &str) -> Result<Url, ClientError> {
    let mut raw = raw.trim().to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    Url::parse(&raw).map_err(|e| ClientError::InvalidUrl {
        service,
        detail: e.to_string(),
    })
}

/// HTTP client for all WorkNest services.
#[derive(Clone)]
pub struct WorknestClient {
    http: Client,
    urls: ServiceUrls,
}

impl fmt::Debug for WorknestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorknestClient")
            .field("urls", &self.urls)
            .finish_non_exhaustive()
    }
}

impl WorknestClient {
    pub fn from_config(cfg: &Config) -> Result<Self, ClientError> {
        let http = Client::builder()
            .user_agent(concat!("worknest/", env!("CARGO_PKG_VERSION")))
            .timeout(cfg.app.request_timeout())
            .no_proxy()
            .build()
            .map_err(ClientError::Build)?;
        Ok(Self::with_urls(http, ServiceUrls::from_config(cfg)?))
    }

    pub fn with_urls(http: Client, urls: ServiceUrls) -> Self {
        Self { http, urls }
    }

    pub fn urls(&self) -> &ServiceUrls {
        &self.urls
    }

    fn endpoint(&self, service: &'static str, base: &Url, path: &str) -> Result<Url, ClientError> {
        base.join(path).map_err(|e| ClientError::InvalidUrl {
            service,
            detail: e.to_string(),
        })
    }

    fn with_identity(builder: RequestBuilder, ctx: &RequestContext) -> RequestBuilder {
        ctx.identity_headers()
            .into_iter()
            .fold(builder, |b, (name, value)| b.header(name, value))
    }

    /// Build the PUT that withdraws or cancels a request, carrying the
    /// caller's identity headers.
    pub fn build_transition_request(
        &self,
        ctx: &RequestContext,
        request_id: i64,
        action: RequestAction,
    ) -> Result<reqwest::Request, ClientError> {
        let url = self.endpoint(
            REQUEST,
            &self.urls.request,
            &format!("requests/{}/{}", request_id, action.as_str()),
        )?;
        Self::with_identity(self.http.request(Method::PUT, url), ctx)
            .header("Content-Type", "application/json")
            .build()
            .map_err(|source| ClientError::Transport {
                service: REQUEST,
                source,
            })
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        service: &'static str,
        request: reqwest::Request,
    ) -> Result<T, ClientError> {
        debug!(method = %request.method(), url = %request.url(), "{} request", service);
        let res = self
            .http
            .execute(request)
            .await
            .map_err(|source| ClientError::Transport { service, source })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|source| ClientError::Transport { service, source })?;
        debug!(%status, bytes = body.len(), "{} response", service);

        if !status.is_success() {
            let message = serde_json::from_str::<MessageBody>(&body)
                .ok()
                .and_then(|m| m.text().map(str::to_string))
                .unwrap_or(body);
            warn!(%status, %message, "{} returned an error", service);
            return Err(ClientError::Status {
                service,
                status,
                message,
            });
        }

        serde_json::from_str(&body).map_err(|source| ClientError::Decode { service, source })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        service: &'static str,
        base: &Url,
        path: &str,
    ) -> Result<T, ClientError> {
        let url = self.endpoint(service, base, path)?;
        let request = self
            .http
            .get(url)
            .build()
            .map_err(|source| ClientError::Transport { service, source })?;
        self.execute(service, request).await
    }

    /// JSON request carrying the caller's identity headers.
    fn build_json<B: Serialize + ?Sized>(
        &self,
        service: &'static str,
        method: Method,
        url: Url,
        ctx: &RequestContext,
        body: &B,
    ) -> Result<reqwest::Request, ClientError> {
        Self::with_identity(self.http.request(method, url), ctx)
            .json(body)
            .build()
            .map_err(|source| ClientError::Transport { service, source })
    }

    pub fn build_all_requests(&self) -> Result<reqwest::Request, ClientError> {
        let url = self.endpoint(REQUEST, &self.urls.request, "request")?;
        self.http
            .get(url)
            .build()
            .map_err(|source| ClientError::Transport {
                service: REQUEST,
                source,
            })
    }

    pub fn build_submit_request(
        &self,
        ctx: &RequestContext,
        request: &NewWfhRequest,
    ) -> Result<reqwest::Request, ClientError> {
        let url = self.endpoint(REQUEST, &self.urls.request, "requests")?;
        self.build_json(REQUEST, Method::POST, url, ctx, request)
    }

    pub fn build_update_request(
        &self,
        ctx: &RequestContext,
        request_id: i64,
        update: &RequestUpdate,
    ) -> Result<reqwest::Request, ClientError> {
        let url = self.endpoint(
            REQUEST,
            &self.urls.request,
            &format!("request/update/{}", request_id),
        )?;
        self.build_json(REQUEST, Method::PUT, url, ctx, update)
    }

    pub fn build_create_event(
        &self,
        ctx: &RequestContext,
        event: &Event,
    ) -> Result<reqwest::Request, ClientError> {
        let url = self.endpoint(EVENT, &self.urls.event, "events")?;
        self.build_json(EVENT, Method::POST, url, ctx, event)
    }

    #[instrument(skip(self))]
    pub async fn staff_requests(&self, staff_id: i64) -> Result<Vec<WfhRequest>, ClientError> {
        self.get(REQUEST, &self.urls.request, &format!("requests/{}", staff_id))
            .await
    }

    /// Every request across departments.
    #[instrument(skip(self))]
    pub async fn all_requests(&self) -> Result<Vec<WfhRequest>, ClientError> {
        let request = self.build_all_requests()?;
        self.execute(REQUEST, request).await
    }

    #[instrument(skip_all, fields(staff_id = request.staff_id))]
    pub async fn submit_request(
        &self,
        ctx: &RequestContext,
        request: &NewWfhRequest,
    ) -> Result<String, ClientError> {
        let built = self.build_submit_request(ctx, request)?;
        let body: MessageBody = self.execute(REQUEST, built).await?;
        Ok(body.text().unwrap_or("Request submitted.").to_string())
    }

    /// Returns the request as stored after the update.
    #[instrument(skip(self, ctx, update))]
    pub async fn update_request(
        &self,
        ctx: &RequestContext,
        request_id: i64,
        update: &RequestUpdate,
    ) -> Result<WfhRequest, ClientError> {
        let request = self.build_update_request(ctx, request_id, update)?;
        let resp: UpdateRequestResp = self.execute(REQUEST, request).await?;
        if let Some(message) = resp.message.as_deref() {
            debug!(request_id, message, "request updated");
        }
        Ok(resp.request)
    }

    #[instrument(skip(self))]
    pub async fn audit_log(&self) -> Result<Vec<AuditLogEntry>, ClientError> {
        self.get(AUDIT, &self.urls.audit, "audit_log").await
    }

    #[instrument(skip(self))]
    pub async fn events(&self) -> Result<Vec<Event>, ClientError> {
        self.get(EVENT, &self.urls.event, "events").await
    }

    #[instrument(skip_all, fields(department = %event.department))]
    pub async fn create_event(&self, ctx: &RequestContext, event: &Event) -> Result<String, ClientError> {
        let request = self.build_create_event(ctx, event)?;
        let body: MessageBody = self.execute(EVENT, request).await?;
        Ok(body.text().unwrap_or("Event created.").to_string())
    }
}

#[async_trait]
impl ScheduleService for WorknestClient {
    #[instrument(skip(self))]
    async fn schedules(&self, scope: ScheduleScope) -> Result<Vec<ScheduleEntry>, ClientError> {
        self.get(SCHEDULE, &self.urls.schedule, &scope.path()).await
    }
}

#[async_trait]
impl ProfileService for WorknestClient {
    #[instrument(skip(self))]
    async fn profile(&self, staff_id: i64) -> Result<Profile, ClientError> {
        self.get(PROFILE, &self.urls.profile, &format!("profile/{}", staff_id))
            .await
    }

    #[instrument(skip(self))]
    async fn profiles(&self) -> Result<Vec<Profile>, ClientError> {
        self.get(PROFILE, &self.urls.profile, "profile").await
    }
}

#[async_trait]
impl RequestService for WorknestClient {
    #[instrument(skip(self, ctx))]
    async fn transition_request(
        &self,
        ctx: &RequestContext,
        request_id: i64,
        action: RequestAction,
    ) -> Result<String, ClientError> {
        let request = self.build_transition_request(ctx, request_id, action)?;
        let body: MessageBody = self.execute(REQUEST, request).await?;
        Ok(body
            .text()
            .map(str::to_string)
            .unwrap_or_else(|| match action {
                RequestAction::Withdraw => "Request withdrawn successfully.".to_string(),
                RequestAction::Cancel => "Request cancelled successfully.".to_string(),
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use crate::model::Status;

    fn client() -> WorknestClient {
        let cfg: Config = serde_yaml::from_str(config::example()).unwrap();
        WorknestClient::from_config(&cfg).unwrap()
    }

    #[test]
    fn scope_paths() {
        assert_eq!(ScheduleScope::All.path(), "schedules");
        assert_eq!(ScheduleScope::Staff(7).path(), "schedules/7");
        assert_eq!(ScheduleScope::Manager(140001).path(), "schedules/manager/140001");
    }

    #[test]
    fn scope_follows_role() {
        let mgr = RequestContext::new(140001, Role::Manager, "Sales").unwrap();
        assert_eq!(ScheduleScope::for_context(&mgr), ScheduleScope::Manager(140001));
        let staff = RequestContext::new(140002, Role::Staff, "Sales").unwrap();
        assert_eq!(ScheduleScope::for_context(&staff), ScheduleScope::Staff(140002));
        let hr = RequestContext::new(160008, Role::Hr, "HR").unwrap();
        assert_eq!(ScheduleScope::for_context(&hr), ScheduleScope::All);
    }

    #[test]
    fn base_url_keeps_path_prefix() {
        let url = base_url(PROFILE, "http://localhost:5002/api").unwrap();
        assert_eq!(url.join("profile/3").unwrap().path(), "/api/profile/3");
        assert!(matches!(
            base_url(PROFILE, "::nope"),
            Err(ClientError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn transition_request_carries_identity_headers() {
        let ctx = RequestContext::new(140008, Role::Manager, "Sales").unwrap();
        let request = client()
            .build_transition_request(&ctx, 42, RequestAction::Withdraw)
            .unwrap();
        assert_eq!(request.method(), Method::PUT);
        assert_eq!(request.url().path(), "/requests/42/withdraw");
        assert_eq!(request.url().port(), Some(5003));
        let headers = request.headers();
        let header = |name: &str| headers.get(name).and_then(|h| h.to_str().ok()).unwrap().to_string();
        assert_eq!(header("X-Role"), "3");
        assert_eq!(header("X-Staff-ID"), "140008");
        assert_eq!(header("X-Department"), "Sales");
        assert_eq!(header("Content-Type"), "application/json");

        let cancel = client()
            .build_transition_request(&ctx, 42, RequestAction::Cancel)
            .unwrap();
        assert_eq!(cancel.url().path(), "/requests/42/cancel");
    }

    fn json_body(request: &reqwest::Request) -> serde_json::Value {
        let bytes = request.body().and_then(|b| b.as_bytes()).unwrap();
        serde_json::from_slice(bytes).unwrap()
    }

    fn header(request: &reqwest::Request, name: &str) -> String {
        request
            .headers()
            .get(name)
            .and_then(|h| h.to_str().ok())
            .unwrap()
            .to_string()
    }

    #[test]
    fn all_requests_targets_request_listing() {
        let request = client().build_all_requests().unwrap();
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.url().path(), "/request");
        assert_eq!(request.url().port(), Some(5003));
        assert!(request.body().is_none());
    }

    #[test]
    fn submit_request_posts_new_request_json() {
        let ctx = RequestContext::new(140002, Role::Staff, "Sales").unwrap();
        let new = NewWfhRequest {
            staff_id: 140002,
            department: "Sales".into(),
            start_date: "2024-10-01".into(),
            reason: "Plumber visit".into(),
            duration: "full_day".into(),
            reporting_manager_id: 140001,
            reporting_manager_name: "Derek Tan".into(),
        };
        let request = client().build_submit_request(&ctx, &new).unwrap();
        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.url().path(), "/requests");
        assert_eq!(header(&request, "Content-Type"), "application/json");
        assert_eq!(header(&request, "X-Role"), "2");
        assert_eq!(header(&request, "X-Staff-ID"), "140002");
        let body = json_body(&request);
        assert_eq!(body["start_date"], "2024-10-01");
        assert_eq!(body["reporting_manager_id"], 140001);
        assert_eq!(body["reporting_manager_name"], "Derek Tan");
    }

    #[test]
    fn update_request_puts_full_fields() {
        let ctx = RequestContext::new(140002, Role::Staff, "Sales").unwrap();
        let update = RequestUpdate {
            start_date: "2024-10-02".into(),
            duration: "am".into(),
            reason: "Dentist".into(),
            status: Some(Status::Pending),
        };
        let request = client().build_update_request(&ctx, 31, &update).unwrap();
        assert_eq!(request.method(), Method::PUT);
        assert_eq!(request.url().path(), "/request/update/31");
        assert_eq!(header(&request, "X-Department"), "Sales");
        let body = json_body(&request);
        assert_eq!(body["start_date"], "2024-10-02");
        assert_eq!(body["duration"], "am");
        assert_eq!(body["reason"], "Dentist");
        assert_eq!(body["status"], "Pending");

        let unchanged_status = RequestUpdate { status: None, ..update };
        let request = client().build_update_request(&ctx, 31, &unchanged_status).unwrap();
        assert!(json_body(&request).get("status").is_none());
    }

    #[test]
    fn create_event_posts_to_event_service() {
        let ctx = RequestContext::new(160008, Role::Hr, "HR").unwrap();
        let event = Event {
            id: None,
            department: "Sales".into(),
            event_name: "Quarterly review".into(),
            event_date: "2024-10-04".into(),
        };
        let request = client().build_create_event(&ctx, &event).unwrap();
        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.url().path(), "/events");
        assert_eq!(request.url().port(), Some(5001));
        assert_eq!(header(&request, "X-Role"), "1");
        let body = json_body(&request);
        assert_eq!(body["event_name"], "Quarterly review");
        assert!(body.get("id").is_none());
    }

    #[test]
    fn update_response_yields_stored_request() {
        let resp: UpdateRequestResp = serde_json::from_str(
            r#"{"message": "Request updated successfully.",
                "request": {"request_id": 31, "staff_id": 140002, "department": "Sales",
                            "start_date": "2024-10-02", "reason": "Dentist",
                            "duration": "am", "status": "Pending"}}"#,
        )
        .unwrap();
        assert_eq!(resp.request.request_id, 31);
        assert_eq!(resp.request.status, Status::Pending);
    }

    #[test]
    fn message_body_prefers_message_then_error() {
        let body: MessageBody = serde_json::from_str(r#"{"error": "boom"}"#).unwrap();
        assert_eq!(body.text(), Some("boom"));
        let body: MessageBody =
            serde_json::from_str(r#"{"message": "Request withdrawn successfully.", "error": "x"}"#).unwrap();
        assert_eq!(body.text(), Some("Request withdrawn successfully."));
        let body: MessageBody = serde_json::from_str("{}").unwrap();
        assert_eq!(body.text(), None);
    }

    #[test]
    fn user_message_uses_server_text() {
        let err = ClientError::Status {
            service: REQUEST,
            status: StatusCode::FORBIDDEN,
            message: "Unauthorized to withdraw this request or request already processed.".into(),
        };
        assert_eq!(
            err.user_message(),
            "Unauthorized to withdraw this request or request already processed."
        );
    }
}
