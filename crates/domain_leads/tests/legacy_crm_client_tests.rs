//! Integration tests for the legacy CRM client
//!
//! These tests run the real reqwest-based client against an in-process stub
//! that emulates the CRM's `rest.php` dialect: form-encoded envelope in,
//! loosely-shaped JSON out, session ids handed out by `login` and checked on
//! every subsequent call.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Form, State};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{NaiveDate, NaiveTime};
use serde_json::{json, Value};

use domain_leads::{
    CrmCapabilities, CrmConsultationData, CrmContactData, CrmPort, LegacyCrmClient,
    LegacyCrmConfig, SyncOutcome,
};

/// How the stub answers login calls
#[derive(Clone, Copy, PartialEq)]
enum LoginMode {
    Normal,
    ScriptingError,
    InvalidCredentials,
}

/// Shared state of the stub CRM
struct StubCrm {
    login_mode: LoginMode,
    login_count: AtomicUsize,
    sessions: Mutex<HashSet<String>>,
    /// Modules that received a set_entry, in call order
    created_modules: Mutex<Vec<String>>,
    /// When set, the next session-checked call is rejected and all sessions dropped
    expire_session_once: AtomicBool,
    /// When true, every Contacts set_entry is answered with a validation fault
    reject_contacts: bool,
    /// Account id returned by lookups; None means "no matching account"
    existing_account: Option<String>,
}

impl StubCrm {
    fn new(login_mode: LoginMode) -> Self {
        Self {
            login_mode,
            login_count: AtomicUsize::new(0),
            sessions: Mutex::new(HashSet::new()),
            created_modules: Mutex::new(Vec::new()),
            expire_session_once: AtomicBool::new(false),
            reject_contacts: false,
            existing_account: None,
        }
    }

    fn logins(&self) -> usize {
        self.login_count.load(Ordering::SeqCst)
    }

    fn created_modules(&self) -> Vec<String> {
        self.created_modules.lock().unwrap().clone()
    }
}

async fn rest_endpoint(
    State(stub): State<Arc<StubCrm>>,
    Form(params): Form<HashMap<String, String>>,
) -> axum::response::Response {
    let method = params.get("method").cloned().unwrap_or_default();
    let rest_data: Value = params
        .get("rest_data")
        .and_then(|raw| serde_json::from_str(raw).ok())
        .unwrap_or(Value::Null);

    if method == "login" {
        let count = stub.login_count.fetch_add(1, Ordering::SeqCst) + 1;
        return match stub.login_mode {
            LoginMode::ScriptingError => {
                "<b>Fatal error</b>: Call to a member function getId() on null in rest.php on line 12"
                    .to_string()
                    .into_response()
            }
            LoginMode::InvalidCredentials => Json(json!({
                "name": "Invalid Login",
                "description": "The username or password is incorrect",
                "number": 10,
            }))
            .into_response(),
            LoginMode::Normal => {
                let session = format!("sess-{count}");
                stub.sessions.lock().unwrap().insert(session.clone());
                Json(json!({ "id": session, "module_name": "Users" })).into_response()
            }
        };
    }

    if method == "get_server_info" {
        return Json(json!({ "flavor": "CE", "version": "6.5.0" })).into_response();
    }

    // Everything else carries a session.
    let session = rest_data
        .get("session")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let session_valid = {
        let mut sessions = stub.sessions.lock().unwrap();
        if stub.expire_session_once.swap(false, Ordering::SeqCst) {
            sessions.clear();
            false
        } else {
            sessions.contains(&session)
        }
    };
    if !session_valid {
        return Json(json!({
            "name": "Invalid Session ID",
            "description": "The session ID is invalid",
            "number": 11,
        }))
        .into_response();
    }

    match method.as_str() {
        "get_entry_list" => match &stub.existing_account {
            Some(id) => Json(json!({
                "result_count": 1,
                "entry_list": [ { "id": id, "module_name": "Accounts" } ],
            }))
            .into_response(),
            None => Json(json!({ "result_count": 0, "entry_list": [] })).into_response(),
        },
        "set_entry" => {
            let module = rest_data
                .get("module_name")
                .and_then(Value::as_str)
                .unwrap_or("Unknown")
                .to_string();

            if module == "Contacts" && stub.reject_contacts {
                return Json(json!({
                    "name": "Invalid Data",
                    "description": "email1 is not a valid address",
                    "number": 40,
                }))
                .into_response();
            }

            let mut created = stub.created_modules.lock().unwrap();
            created.push(module.clone());
            let id = format!("{}-{}", module.to_lowercase(), created.len());
            Json(json!({ "id": id, "module_name": module })).into_response()
        }
        "set_relationship" => {
            Json(json!({ "created": 1, "failed": 0, "deleted": 0 })).into_response()
        }
        "get_module_fields" => Json(json!({
            "module_name": rest_data.get("module_name").cloned().unwrap_or(Value::Null),
            "module_fields": { "id": { "name": "id", "type": "id" } },
        }))
        .into_response(),
        other => Json(json!({
            "name": "Invalid Method",
            "description": format!("Method '{other}' does not exist"),
            "number": 20,
        }))
        .into_response(),
    }
}

/// Starts the stub on an ephemeral port and returns its base URL
async fn start_stub(stub: Arc<StubCrm>) -> String {
    let app = Router::new()
        .route("/service/v4_1/rest.php", post(rest_endpoint))
        .with_state(stub);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

fn client_for(base_url: &str) -> LegacyCrmClient {
    let config = LegacyCrmConfig::new(base_url, "site-integration", "secret")
        .unwrap()
        .with_timeout(Duration::from_secs(5));
    LegacyCrmClient::new(config).unwrap()
}

fn contact_data() -> CrmContactData {
    CrmContactData {
        name: "Test User".to_string(),
        email: "test@example.com".to_string(),
        phone: "1234567890".to_string(),
        notes: Some("Saw the castle model at the fair".to_string()),
    }
}

fn consultation_data() -> CrmConsultationData {
    CrmConsultationData {
        name: "Test User".to_string(),
        email: "test@example.com".to_string(),
        phone: "1234567890".to_string(),
        notes: None,
        preferred_date: NaiveDate::from_ymd_opt(2025, 2, 27),
        preferred_time: NaiveTime::from_hms_opt(15, 30, 0),
    }
}

#[tokio::test]
async fn consultation_runs_the_full_call_sequence() {
    let stub = Arc::new(StubCrm::new(LoginMode::Normal));
    let base_url = start_stub(stub.clone()).await;
    let client = client_for(&base_url);

    let outcome = client
        .create_consultation_meeting(&consultation_data())
        .await
        .unwrap();

    // Account created (no match), contact created, meeting created + linked.
    match outcome {
        SyncOutcome::Created { remote_id } => assert!(remote_id.starts_with("meetings-")),
        other => panic!("expected Created, got {other:?}"),
    }
    assert_eq!(
        stub.created_modules(),
        vec!["Accounts", "Contacts", "Meetings"]
    );
    assert_eq!(stub.logins(), 1);
}

#[tokio::test]
async fn session_is_reused_across_operations() {
    let stub = Arc::new(StubCrm::new(LoginMode::Normal));
    let base_url = start_stub(stub.clone()).await;
    let client = client_for(&base_url);

    let first = client.create_contact(&contact_data()).await.unwrap();
    let second = client.create_contact(&contact_data()).await.unwrap();

    assert!(matches!(first, SyncOutcome::Created { .. }));
    assert!(matches!(second, SyncOutcome::Created { .. }));
    assert_eq!(stub.logins(), 1, "one login should serve both operations");
}

#[tokio::test]
async fn existing_account_is_reused_not_duplicated() {
    let mut stub = StubCrm::new(LoginMode::Normal);
    stub.existing_account = Some("acc-existing".to_string());
    let stub = Arc::new(stub);
    let base_url = start_stub(stub.clone()).await;
    let client = client_for(&base_url);

    let mut data = consultation_data();
    data.preferred_date = None;
    data.preferred_time = None;

    let outcome = client.create_consultation_meeting(&data).await.unwrap();

    // No meeting slot: the contact is the primary record; no Accounts insert.
    match outcome {
        SyncOutcome::Created { remote_id } => assert!(remote_id.starts_with("contacts-")),
        other => panic!("expected Created, got {other:?}"),
    }
    assert_eq!(stub.created_modules(), vec!["Contacts"]);
}

#[tokio::test]
async fn mid_sequence_session_loss_fails_the_whole_operation() {
    let stub = Arc::new(StubCrm::new(LoginMode::Normal));
    let base_url = start_stub(stub.clone()).await;
    let client = client_for(&base_url);

    // Warm the session cache, then expire it server-side.
    client.create_contact(&contact_data()).await.unwrap();
    stub.expire_session_once.store(true, Ordering::SeqCst);

    let failed = client.create_consultation_meeting(&consultation_data()).await;
    assert!(failed.is_err(), "operation must fail as a whole");
    // The account lookup was rejected before any record was created.
    assert_eq!(stub.created_modules(), vec!["Contacts"]);

    // The next operation logs in again and succeeds from scratch.
    let retried = client
        .create_consultation_meeting(&consultation_data())
        .await
        .unwrap();
    assert!(matches!(retried, SyncOutcome::Created { .. }));
    assert_eq!(stub.logins(), 2);
}

#[tokio::test]
async fn scripting_error_at_login_marks_server_unavailable() {
    let stub = Arc::new(StubCrm::new(LoginMode::ScriptingError));
    let base_url = start_stub(stub.clone()).await;
    let client = client_for(&base_url);

    let first = client.create_contact(&contact_data()).await;
    assert!(first.is_err());
    assert!(!client.is_available().await);

    // Short-circuited locally: the stub sees no second login.
    let second = client.create_contact(&contact_data()).await;
    assert!(second.is_err());
    assert_eq!(stub.logins(), 1);
}

#[tokio::test]
async fn invalid_credentials_fail_authentication() {
    let stub = Arc::new(StubCrm::new(LoginMode::InvalidCredentials));
    let base_url = start_stub(stub.clone()).await;
    let client = client_for(&base_url);

    let result = client.create_contact(&contact_data()).await;

    match result {
        Err(error) => assert!(error.to_string().contains("Invalid Login")),
        Ok(outcome) => panic!("expected auth failure, got {outcome:?}"),
    }
    assert!(!client.is_available().await);
}

#[tokio::test]
async fn crm_side_rejection_is_reported_not_raised() {
    let mut stub = StubCrm::new(LoginMode::Normal);
    stub.reject_contacts = true;
    let stub = Arc::new(stub);
    let base_url = start_stub(stub.clone()).await;
    let client = client_for(&base_url);

    let outcome = client.create_contact(&contact_data()).await.unwrap();

    match outcome {
        SyncOutcome::Rejected { message } => {
            assert!(message.contains("email1 is not a valid address"));
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_connection_reports_all_endpoints_healthy() {
    let stub = Arc::new(StubCrm::new(LoginMode::Normal));
    let base_url = start_stub(stub.clone()).await;
    let client = client_for(&base_url);

    let report = client.test_connection().await;

    assert!(report.success);
    let names: Vec<_> = report
        .endpoints
        .iter()
        .map(|endpoint| endpoint.name.as_str())
        .collect();
    assert_eq!(names, vec!["login", "contacts_module", "meetings_module"]);
    assert!(report.endpoints.iter().all(|e| e.error.is_none()));
}

#[tokio::test]
async fn test_connection_clears_the_unavailable_flag() {
    let stub = Arc::new(StubCrm::new(LoginMode::Normal));
    let base_url = start_stub(stub.clone()).await;

    // Point at a dead port first to trip the flag, then swap to the stub by
    // building a fresh client; the flag is per-client state, so the check
    // here is that a successful login reports available again.
    let client = client_for(&base_url);
    assert!(client.is_available().await);

    let report = client.test_connection().await;
    assert!(report.success);
    assert!(client.is_available().await);
}

#[tokio::test]
async fn capability_probe_finds_the_entry_point() {
    let stub = Arc::new(StubCrm::new(LoginMode::Normal));
    let base_url = start_stub(stub.clone()).await;
    let config = LegacyCrmConfig::new(&base_url, "site-integration", "secret")
        .unwrap()
        .with_timeout(Duration::from_secs(5));

    let capabilities = CrmCapabilities::probe(&config).await.unwrap();

    assert_eq!(capabilities.entry_point, "service/v4_1/rest.php");
}

#[tokio::test]
async fn capability_probe_skips_broken_entry_points() {
    // v4_1 leaks a scripting error; v4 answers properly.
    let stub = Arc::new(StubCrm::new(LoginMode::Normal));
    let app = Router::new()
        .route(
            "/service/v4_1/rest.php",
            post(|| async {
                "<b>Parse error</b>: syntax error, unexpected end of file in rest.php".to_string()
            }),
        )
        .route("/service/v4/rest.php", post(rest_endpoint))
        .with_state(stub);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = LegacyCrmConfig::new(format!("http://{addr}"), "site-integration", "secret")
        .unwrap()
        .with_timeout(Duration::from_secs(5));

    let capabilities = CrmCapabilities::probe(&config).await.unwrap();

    assert_eq!(capabilities.entry_point, "service/v4/rest.php");
}
