//! Legacy CRM REST adapter
//!
//! This module implements the `CrmPort` trait against the external CRM's
//! legacy REST dialect: a single `rest.php`-style entry point that accepts a
//! form-encoded envelope (`method`, `input_type`, `response_type`,
//! `rest_data`) and returns loosely-shaped JSON.
//!
//! # Session lifecycle
//!
//! The client owns an in-memory session id: lazily obtained by a `login`
//! call before the first operation, reused until the server reports it
//! invalid, then discarded so the next operation logs in again. The session
//! is never persisted and never supplied by callers.
//!
//! # Availability gating
//!
//! A failed login (missing session id or a server-side scripting error in
//! the response body) and any transport failure mark the client
//! **server-unavailable**. While unavailable, operations fail locally
//! without a network attempt; after a reset window the next operation is
//! allowed through to retry, and a successful login clears the flag. This
//! keeps a down CRM from being hammered by every pending record.
//!
//! # Response handling
//!
//! Every raw response is decoded into the tagged [`CrmCallResult`] and
//! matched exhaustively; there is no optional-chaining through untyped
//! JSON. Expected CRM-side rejections surface as `SyncOutcome::Rejected`,
//! transport/auth problems as `PortError`.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use core_kernel::{DomainPort, PortError};

use crate::ports::{
    ConnectionReport, CrmConsultationData, CrmContactData, CrmPort, EndpointStatus, SyncOutcome,
};

/// Default per-request timeout
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// How long the unavailable flag blocks operations before one retry is let through
const UNAVAILABLE_RESET_SECS: u64 = 60;

/// Entry points probed during capability discovery, in preference order
const ENTRY_POINT_CANDIDATES: &[&str] = &[
    "service/v4_1/rest.php",
    "service/v4/rest.php",
    "service/v2/rest.php",
];

/// Markers of a server-side scripting error leaking into a response body.
/// Their presence means the endpoint itself is broken, not that the request
/// was merely rejected.
const SCRIPTING_ERROR_MARKERS: &[&str] = &[
    "<b>Fatal error</b>",
    "<b>Parse error</b>",
    "<b>Warning</b>",
    "Call to undefined function",
];

/// Configuration for the legacy CRM adapter
#[derive(Clone)]
pub struct LegacyCrmConfig {
    /// Base URL of the CRM installation (e.g. "https://crm.example.com")
    pub base_url: String,
    /// CRM user the site integration logs in as
    pub username: String,
    /// Password for the integration user
    pub password: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Application name reported at login
    pub application_name: String,
}

impl LegacyCrmConfig {
    /// Creates a configuration with defaults for timeout and application name
    ///
    /// # Errors
    ///
    /// Returns `PortError::Validation` if the base URL is empty or missing
    /// an http/https scheme.
    pub fn new(
        base_url: impl AsRef<str>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, PortError> {
        Ok(Self {
            base_url: normalize_base_url(base_url.as_ref())?,
            username: username.into(),
            password: password.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            application_name: "playhouse-site".to_string(),
        })
    }

    /// Overrides the per-request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for LegacyCrmConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("LegacyCrmConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .field("application_name", &self.application_name)
            .finish()
    }
}

/// Fixed endpoint mapping consumed by the client
///
/// The legacy CRM is deployed behind several path layouts depending on its
/// version. Discovery is a one-time concern: [`CrmCapabilities::probe`] finds
/// the working entry point once (at startup or offline) and the client uses
/// the resulting mapping for every subsequent request. It never re-probes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrmCapabilities {
    /// Path of the REST entry point, relative to the base URL
    pub entry_point: String,
}

impl Default for CrmCapabilities {
    fn default() -> Self {
        Self {
            entry_point: ENTRY_POINT_CANDIDATES[0].to_string(),
        }
    }
}

impl CrmCapabilities {
    /// Discovers the working entry point by trying known candidates
    ///
    /// Each candidate receives a cheap `get_server_info` call; the first one
    /// that answers with parseable JSON (and no scripting-error markers)
    /// wins.
    ///
    /// # Errors
    ///
    /// `PortError::ServiceUnavailable` if no candidate responds usably.
    pub async fn probe(config: &LegacyCrmConfig) -> Result<Self, PortError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|error| PortError::Internal {
                message: "failed to build HTTP client".to_string(),
                source: Some(Box::new(error)),
            })?;

        for candidate in ENTRY_POINT_CANDIDATES {
            let url = format!("{}/{}", config.base_url, candidate);
            debug!(%url, "Probing CRM entry point");

            let response = match client
                .post(&url)
                .form(&envelope("get_server_info", &json!({})))
                .send()
                .await
            {
                Ok(response) => response,
                Err(error) => {
                    debug!(%url, %error, "CRM entry point candidate unreachable");
                    continue;
                }
            };

            if !response.status().is_success() {
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            if contains_scripting_error(&body) {
                continue;
            }
            if serde_json::from_str::<Value>(&body).is_ok() {
                debug!(entry_point = candidate, "CRM entry point discovered");
                return Ok(Self {
                    entry_point: (*candidate).to_string(),
                });
            }
        }

        Err(PortError::unavailable("legacy-crm"))
    }
}

/// Tagged decoding of a raw CRM response
///
/// The legacy API reports everything over HTTP 200; the body shape is the
/// only discriminator.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CrmCallResult {
    /// A record was created/fetched; carries its remote id
    Entry { id: String },
    /// A query returned a (possibly empty) list of record ids
    EntryList { ids: Vec<String> },
    /// A relationship call was acknowledged
    Acknowledged { created: u64 },
    /// The session id was rejected
    InvalidSession,
    /// The CRM processed the call but refused the operation
    Fault { name: String, description: String },
    /// The response matched no known shape
    Malformed { detail: String },
}

/// Classifies a decoded JSON body into a [`CrmCallResult`]
fn classify_response(value: &Value) -> CrmCallResult {
    let Some(object) = value.as_object() else {
        return CrmCallResult::Malformed {
            detail: format!("expected a JSON object, got: {value}"),
        };
    };

    // Fault shapes carry name/description/number; the invalid-session fault
    // is number 11 in every dialect we speak.
    let fault_name = object.get("name").and_then(Value::as_str);
    let fault_number = object.get("number").and_then(Value::as_u64);
    if fault_number == Some(11) || fault_name == Some("Invalid Session ID") {
        return CrmCallResult::InvalidSession;
    }

    if let Some(id) = object.get("id").and_then(Value::as_str) {
        if !id.is_empty() && id != "-1" {
            return CrmCallResult::Entry { id: id.to_string() };
        }
    }

    if let Some(entries) = object.get("entry_list").and_then(Value::as_array) {
        let ids = entries
            .iter()
            .filter_map(|entry| entry.get("id").and_then(Value::as_str))
            .map(str::to_string)
            .collect();
        return CrmCallResult::EntryList { ids };
    }

    if let Some(created) = object.get("created").and_then(Value::as_u64) {
        return CrmCallResult::Acknowledged { created };
    }

    if let (Some(name), Some(description)) = (
        fault_name,
        object.get("description").and_then(Value::as_str),
    ) {
        return CrmCallResult::Fault {
            name: name.to_string(),
            description: description.to_string(),
        };
    }

    CrmCallResult::Malformed {
        detail: format!("unrecognised response shape: {value}"),
    }
}

/// Builds the form-encoded request envelope
fn envelope(method: &str, rest_data: &Value) -> Vec<(String, String)> {
    vec![
        ("method".to_string(), method.to_string()),
        ("input_type".to_string(), "JSON".to_string()),
        ("response_type".to_string(), "JSON".to_string()),
        ("rest_data".to_string(), rest_data.to_string()),
    ]
}

fn contains_scripting_error(body: &str) -> bool {
    SCRIPTING_ERROR_MARKERS
        .iter()
        .any(|marker| body.contains(marker))
}

/// Escapes a string for embedding in a CRM query literal
fn escape_query_literal(raw: &str) -> String {
    raw.replace('\'', "''")
}

/// Legacy CRM client implementing the `CrmPort` trait
///
/// One instance per process, shared behind an `Arc`; the session and the
/// availability flag are interior state.
pub struct LegacyCrmClient {
    config: LegacyCrmConfig,
    capabilities: CrmCapabilities,
    client: Client,
    session: Mutex<Option<String>>,
    server_available: AtomicBool,
    unavailable_since: RwLock<Option<Instant>>,
    reset_window: Duration,
}

impl fmt::Debug for LegacyCrmClient {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("LegacyCrmClient")
            .field("config", &self.config)
            .field("capabilities", &self.capabilities)
            .field(
                "server_available",
                &self.server_available.load(Ordering::SeqCst),
            )
            .finish_non_exhaustive()
    }
}

impl LegacyCrmClient {
    /// Creates a client with the default capability mapping
    pub fn new(config: LegacyCrmConfig) -> Result<Self, PortError> {
        Self::with_capabilities(config, CrmCapabilities::default())
    }

    /// Creates a client with an explicit (probed or configured) mapping
    pub fn with_capabilities(
        config: LegacyCrmConfig,
        capabilities: CrmCapabilities,
    ) -> Result<Self, PortError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|error| PortError::Internal {
                message: "failed to build HTTP client".to_string(),
                source: Some(Box::new(error)),
            })?;

        Ok(Self {
            config,
            capabilities,
            client,
            session: Mutex::new(None),
            server_available: AtomicBool::new(true),
            unavailable_since: RwLock::new(None),
            reset_window: Duration::from_secs(UNAVAILABLE_RESET_SECS),
        })
    }

    /// Whether operations are currently allowed to reach the network
    ///
    /// `false` means the client is short-circuiting after a failure and the
    /// reset window has not yet elapsed.
    pub async fn is_available(&self) -> bool {
        if self.server_available.load(Ordering::SeqCst) {
            return true;
        }

        // Half-open: once the reset window elapses, let one attempt through.
        let since = self.unavailable_since.read().await;
        matches!(*since, Some(instant) if instant.elapsed() > self.reset_window)
    }

    async fn ensure_available(&self, operation: &str) -> Result<(), PortError> {
        if self.is_available().await {
            Ok(())
        } else {
            debug!(operation, "CRM marked unavailable, failing locally");
            Err(PortError::unavailable("legacy-crm"))
        }
    }

    async fn mark_unavailable(&self, reason: &str) {
        if self.server_available.swap(false, Ordering::SeqCst) {
            warn!(reason, "Marking CRM server unavailable");
        }
        *self.unavailable_since.write().await = Some(Instant::now());
    }

    fn mark_available(&self) {
        if !self.server_available.swap(true, Ordering::SeqCst) {
            debug!("CRM server available again");
        }
    }

    fn endpoint_url(&self) -> String {
        format!("{}/{}", self.config.base_url, self.capabilities.entry_point)
    }

    fn login_rest_data(&self) -> Value {
        json!({
            "user_auth": {
                "user_name": self.config.username,
                "password": self.config.password,
            },
            "application_name": self.config.application_name,
        })
    }

    async fn transport_error(&self, operation: &str, error: reqwest::Error) -> PortError {
        self.mark_unavailable(&error.to_string()).await;
        if error.is_timeout() {
            PortError::Timeout {
                operation: operation.to_string(),
                duration_ms: self.config.timeout.as_millis() as u64,
            }
        } else {
            PortError::Connection {
                message: format!("CRM request '{operation}' failed: {error}"),
                source: Some(Box::new(error)),
            }
        }
    }

    /// Sends one enveloped request and returns the raw status and body
    async fn send_envelope(
        &self,
        method: &str,
        rest_data: &Value,
    ) -> Result<(StatusCode, String), PortError> {
        let response = self
            .client
            .post(self.endpoint_url())
            .form(&envelope(method, rest_data))
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(error) => return Err(self.transport_error(method, error).await),
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(error) => return Err(self.transport_error(method, error).await),
        };

        Ok((status, body))
    }

    /// Logs in and returns a fresh session id (does not touch the cache)
    async fn login(&self) -> Result<String, PortError> {
        let (status, body) = self.send_envelope("login", &self.login_rest_data()).await?;

        if contains_scripting_error(&body) {
            self.mark_unavailable("login endpoint returned a scripting error")
                .await;
            return Err(PortError::unauthorized(
                "CRM login endpoint returned a server-side scripting error",
            ));
        }

        let value: Value = match serde_json::from_str(&body) {
            Ok(value) => value,
            Err(_) => {
                self.mark_unavailable("login response was not JSON").await;
                return Err(PortError::unauthorized(format!(
                    "CRM login returned an unparseable response (HTTP {})",
                    status.as_u16()
                )));
            }
        };

        match classify_response(&value) {
            CrmCallResult::Entry { id } => {
                self.mark_available();
                debug!("CRM login succeeded");
                Ok(id)
            }
            CrmCallResult::Fault { name, description } => {
                self.mark_unavailable("login rejected").await;
                Err(PortError::unauthorized(format!("{name}: {description}")))
            }
            _ => {
                self.mark_unavailable("login response missing session id")
                    .await;
                Err(PortError::unauthorized(
                    "CRM login response did not include a session id",
                ))
            }
        }
    }

    /// Returns the cached session, logging in first if necessary
    async fn session(&self) -> Result<String, PortError> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_ref() {
            return Ok(session.clone());
        }

        let session = self.login().await?;
        *guard = Some(session.clone());
        Ok(session)
    }

    async fn invalidate_session(&self) {
        *self.session.lock().await = None;
    }

    /// Sends one session-free call and classifies the response
    async fn call(&self, method: &str, rest_data: &Value) -> Result<CrmCallResult, PortError> {
        let (status, body) = self.send_envelope(method, rest_data).await?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(PortError::RateLimited {
                retry_after_secs: 60,
            });
        }
        if contains_scripting_error(&body) {
            return Err(PortError::transformation(format!(
                "CRM endpoint returned a server-side scripting error for '{method}'"
            )));
        }

        let value: Value = serde_json::from_str(&body).map_err(|_| {
            PortError::transformation(format!(
                "CRM returned non-JSON for '{method}' (HTTP {})",
                status.as_u16()
            ))
        })?;

        Ok(classify_response(&value))
    }

    /// Sends one session-carrying call
    ///
    /// An invalid-session response fails the whole logical operation: the
    /// cached session is discarded and the error propagates, so the engine's
    /// next attempt redoes the operation from scratch with a fresh login.
    async fn call_with_session<F>(&self, method: &str, build: F) -> Result<CrmCallResult, PortError>
    where
        F: FnOnce(&str) -> Value,
    {
        let session = self.session().await?;
        let rest_data = build(&session);
        let result = self.call(method, &rest_data).await?;

        if result == CrmCallResult::InvalidSession {
            self.invalidate_session().await;
            return Err(PortError::unauthorized(format!(
                "CRM rejected the session during '{method}'"
            )));
        }
        Ok(result)
    }

    /// Finds the parent account by name, creating it when absent
    async fn find_or_create_account(&self, name: &str) -> Result<AccountStep, PortError> {
        let query = format!("accounts.name = '{}'", escape_query_literal(name));
        let lookup = self
            .call_with_session("get_entry_list", |session| {
                json!({
                    "session": session,
                    "module_name": "Accounts",
                    "query": query,
                    "order_by": "",
                    "offset": 0,
                    "select_fields": ["id"],
                    "max_results": 1,
                })
            })
            .await?;

        match lookup {
            CrmCallResult::EntryList { ids } => {
                if let Some(id) = ids.into_iter().next() {
                    return Ok(AccountStep::Resolved(id));
                }
            }
            CrmCallResult::Fault { name, description } => {
                return Ok(AccountStep::Rejected(format!("{name}: {description}")));
            }
            other => {
                return Err(PortError::transformation(format!(
                    "unexpected account lookup response: {other:?}"
                )));
            }
        }

        let created = self
            .call_with_session("set_entry", |session| {
                json!({
                    "session": session,
                    "module_name": "Accounts",
                    "name_value_list": name_value_list(&[("name", name.to_string())]),
                })
            })
            .await?;

        match created {
            CrmCallResult::Entry { id } => Ok(AccountStep::Resolved(id)),
            CrmCallResult::Fault { name, description } => {
                Ok(AccountStep::Rejected(format!("{name}: {description}")))
            }
            other => Err(PortError::transformation(format!(
                "unexpected account creation response: {other:?}"
            ))),
        }
    }

    /// Creates the CRM contact record itself; shared by both operations
    async fn create_contact_record(
        &self,
        name: &str,
        email: &str,
        phone: &str,
        notes: Option<&str>,
        account_id: Option<&str>,
    ) -> Result<RecordStep, PortError> {
        let mut fields = vec![
            ("last_name", name.to_string()),
            ("email1", email.to_string()),
            ("phone_work", phone.to_string()),
            ("lead_source", "Web Site".to_string()),
        ];
        if let Some(notes) = notes {
            fields.push(("description", notes.to_string()));
        }
        if let Some(account_id) = account_id {
            fields.push(("account_id", account_id.to_string()));
        }

        let result = self
            .call_with_session("set_entry", |session| {
                json!({
                    "session": session,
                    "module_name": "Contacts",
                    "name_value_list": name_value_list(&fields),
                })
            })
            .await?;

        match result {
            CrmCallResult::Entry { id } => Ok(RecordStep::Created(id)),
            CrmCallResult::Fault { name, description } => {
                Ok(RecordStep::Rejected(format!("{name}: {description}")))
            }
            other => Err(PortError::transformation(format!(
                "unexpected contact creation response: {other:?}"
            ))),
        }
    }
}

/// Outcome of the account step within a consultation operation
enum AccountStep {
    Resolved(String),
    Rejected(String),
}

/// Outcome of a record-creation step
enum RecordStep {
    Created(String),
    Rejected(String),
}

fn name_value_list(fields: &[(&str, String)]) -> Value {
    Value::Array(
        fields
            .iter()
            .map(|(name, value)| json!({ "name": name, "value": value }))
            .collect(),
    )
}

impl DomainPort for LegacyCrmClient {}

#[async_trait]
impl CrmPort for LegacyCrmClient {
    async fn create_contact(&self, data: &CrmContactData) -> Result<SyncOutcome, PortError> {
        self.ensure_available("create_contact").await?;

        let step = self
            .create_contact_record(
                &data.name,
                &data.email,
                &data.phone,
                data.notes.as_deref(),
                None,
            )
            .await?;

        match step {
            RecordStep::Created(id) => Ok(SyncOutcome::Created { remote_id: id }),
            RecordStep::Rejected(message) => Ok(SyncOutcome::Rejected { message }),
        }
    }

    async fn create_consultation_meeting(
        &self,
        data: &CrmConsultationData,
    ) -> Result<SyncOutcome, PortError> {
        self.ensure_available("create_consultation_meeting").await?;

        let account_id = match self.find_or_create_account(&data.name).await? {
            AccountStep::Resolved(id) => id,
            AccountStep::Rejected(message) => return Ok(SyncOutcome::Rejected { message }),
        };

        let contact_id = match self
            .create_contact_record(
                &data.name,
                &data.email,
                &data.phone,
                data.notes.as_deref(),
                Some(&account_id),
            )
            .await?
        {
            RecordStep::Created(id) => id,
            RecordStep::Rejected(message) => return Ok(SyncOutcome::Rejected { message }),
        };

        // Only schedule a meeting when the visitor picked a concrete slot.
        let Some(slot) = data.meeting_slot() else {
            return Ok(SyncOutcome::Created {
                remote_id: contact_id,
            });
        };

        let meeting_fields = vec![
            ("name", format!("Design consultation - {}", data.name)),
            ("date_start", slot.format("%Y-%m-%d %H:%M:%S").to_string()),
            ("duration_hours", "1".to_string()),
            (
                "description",
                data.notes.clone().unwrap_or_else(|| {
                    format!("Requested through the website by {}", data.name)
                }),
            ),
        ];
        let meeting = self
            .call_with_session("set_entry", |session| {
                json!({
                    "session": session,
                    "module_name": "Meetings",
                    "name_value_list": name_value_list(&meeting_fields),
                })
            })
            .await?;

        let meeting_id = match meeting {
            CrmCallResult::Entry { id } => id,
            CrmCallResult::Fault { name, description } => {
                return Ok(SyncOutcome::Rejected {
                    message: format!("{name}: {description}"),
                });
            }
            other => {
                return Err(PortError::transformation(format!(
                    "unexpected meeting creation response: {other:?}"
                )));
            }
        };

        let link = self
            .call_with_session("set_relationship", |session| {
                json!({
                    "session": session,
                    "module_name": "Contacts",
                    "module_id": contact_id.clone(),
                    "link_field_name": "meetings",
                    "related_ids": [meeting_id.clone()],
                })
            })
            .await?;

        match link {
            CrmCallResult::Acknowledged { created } if created >= 1 => Ok(SyncOutcome::Created {
                remote_id: meeting_id,
            }),
            CrmCallResult::Acknowledged { .. } => Ok(SyncOutcome::Rejected {
                message: "CRM did not link the meeting to the contact".to_string(),
            }),
            CrmCallResult::Fault { name, description } => Ok(SyncOutcome::Rejected {
                message: format!("{name}: {description}"),
            }),
            other => Err(PortError::transformation(format!(
                "unexpected relationship response: {other:?}"
            ))),
        }
    }

    async fn test_connection(&self) -> ConnectionReport {
        let mut endpoints = Vec::new();
        let mut session: Option<String> = None;

        match self.send_envelope("login", &self.login_rest_data()).await {
            Ok((status, body)) => {
                if contains_scripting_error(&body) {
                    endpoints.push(EndpointStatus {
                        name: "login".to_string(),
                        status: Some(status.as_u16()),
                        status_text: status.to_string(),
                        error: Some("server-side scripting error in response".to_string()),
                    });
                } else {
                    let classified = serde_json::from_str::<Value>(&body)
                        .map(|value| classify_response(&value));
                    match classified {
                        Ok(CrmCallResult::Entry { id }) => {
                            self.mark_available();
                            session = Some(id);
                            endpoints.push(EndpointStatus {
                                name: "login".to_string(),
                                status: Some(status.as_u16()),
                                status_text: status.to_string(),
                                error: None,
                            });
                        }
                        Ok(CrmCallResult::Fault { name, description }) => {
                            endpoints.push(EndpointStatus {
                                name: "login".to_string(),
                                status: Some(status.as_u16()),
                                status_text: status.to_string(),
                                error: Some(format!("{name}: {description}")),
                            });
                        }
                        _ => {
                            endpoints.push(EndpointStatus {
                                name: "login".to_string(),
                                status: Some(status.as_u16()),
                                status_text: status.to_string(),
                                error: Some(
                                    "response did not include a session id".to_string(),
                                ),
                            });
                        }
                    }
                }
            }
            Err(error) => {
                endpoints.push(EndpointStatus {
                    name: "login".to_string(),
                    status: None,
                    status_text: "unreachable".to_string(),
                    error: Some(error.to_string()),
                });
            }
        }

        for (endpoint_name, module) in [("contacts_module", "Contacts"), ("meetings_module", "Meetings")]
        {
            let Some(session_id) = session.as_deref() else {
                endpoints.push(EndpointStatus {
                    name: endpoint_name.to_string(),
                    status: None,
                    status_text: "skipped".to_string(),
                    error: Some("skipped: no session".to_string()),
                });
                continue;
            };

            let rest_data = json!({ "session": session_id, "module_name": module });
            match self.send_envelope("get_module_fields", &rest_data).await {
                Ok((status, body)) => {
                    let usable = !contains_scripting_error(&body)
                        && serde_json::from_str::<Value>(&body)
                            .map(|value| value.get("module_fields").is_some())
                            .unwrap_or(false);
                    endpoints.push(EndpointStatus {
                        name: endpoint_name.to_string(),
                        status: Some(status.as_u16()),
                        status_text: status.to_string(),
                        error: if usable {
                            None
                        } else {
                            Some(format!("module '{module}' did not describe its fields"))
                        },
                    });
                }
                Err(error) => {
                    endpoints.push(EndpointStatus {
                        name: endpoint_name.to_string(),
                        status: None,
                        status_text: "unreachable".to_string(),
                        error: Some(error.to_string()),
                    });
                }
            }
        }

        if let Some(id) = session {
            *self.session.lock().await = Some(id);
        }

        let success = endpoints.iter().all(|endpoint| endpoint.error.is_none());
        ConnectionReport {
            success,
            message: if success {
                "All endpoints reachable".to_string()
            } else {
                "One or more endpoints failed".to_string()
            },
            endpoints,
        }
    }
}


/// Normalizes and validates the CRM base URL
fn normalize_base_url(raw: &str) -> Result<String, PortError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(PortError::validation_field(
            "CRM base URL must not be empty",
            "base_url",
        ));
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(PortError::validation_field(
            "CRM base URL must include http:// or https://",
            "base_url",
        ));
    }
    Ok(trimmed.to_string())
}
