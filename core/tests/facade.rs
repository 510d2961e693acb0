//! `PetDoctorApi` over reqwest against the mock backend, and over fake
//! transports for credential, timeout and cancellation behavior.

mod support;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pettodoctor_core::{
    ApiError, CancellationToken, ClientConfig, HttpRequest, HttpResponse, LoginRequest, NewUser,
    PasswordChange, PasswordCheck, PetDoctorApi, PetDoctorClient, ReqwestTransport, Transport,
    TreatmentId, UserId, UserUpdate,
};
use serde_json::json;

fn api_for(base_url: &str) -> PetDoctorApi {
    PetDoctorApi::from_config(&ClientConfig::new(base_url).with_timeout(5)).unwrap()
}

fn new_user(email: &str) -> NewUser {
    NewUser {
        email: email.to_string(),
        password: "pw".to_string(),
        name: "X".to_string(),
        phone: None,
        address: None,
    }
}

/// Records every request and answers each with the same canned response.
struct RecordingTransport {
    response: HttpResponse,
    requests: Mutex<Vec<HttpRequest>>,
}

impl RecordingTransport {
    fn new(status: u16, body: serde_json::Value) -> Self {
        Self {
            response: HttpResponse::new(status, body.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self.requests.lock().unwrap().push(request);
        Ok(self.response.clone())
    }
}

/// Never answers.
struct StalledTransport;

#[async_trait]
impl Transport for StalledTransport {
    async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse, ApiError> {
        std::future::pending().await
    }
}

fn fake_api(
    status: u16,
    body: serde_json::Value,
) -> (
    PetDoctorApi<Arc<RecordingTransport>>,
    Arc<RecordingTransport>,
) {
    let transport = Arc::new(RecordingTransport::new(status, body));
    let client = PetDoctorClient::new("http://backend.test/api").unwrap();
    (PetDoctorApi::new(client, transport.clone()), transport)
}

// ---------------------------------------------------------------------------
// Live backend
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_then_update_profile() {
    let api = api_for(&support::spawn_backend());

    let registered = api.register_user(&new_user("a@b.com")).await.unwrap();
    assert_eq!(registered.email, "a@b.com");
    assert_eq!(registered.name, "X");

    let session = api
        .login(&LoginRequest {
            email: "a@b.com".to_string(),
            password: "pw".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(session.user_id, registered.id);

    api.set_credential(session.access_token.clone());
    let updated = api
        .update_user(&UserUpdate {
            id: session.user_id,
            name: Some("Updated".to_string()),
            phone: None,
            address: None,
        })
        .await
        .unwrap();
    assert_eq!(updated.id, session.user_id);
    assert_eq!(updated.name, "Updated");

    assert_eq!(api.get_user(session.user_id).await.unwrap(), updated);
}

#[tokio::test]
async fn wrong_password_is_classified_as_unauthorized() {
    let api = api_for(&support::spawn_backend());
    api.register_user(&new_user("a@b.com")).await.unwrap();

    let err = api
        .login(&LoginRequest {
            email: "a@b.com".to_string(),
            password: "nope".to_string(),
        })
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
    assert!(matches!(
        err,
        ApiError::Http { status: 401, message: Some(ref m), .. } if m == "password mismatch"
    ));
}

#[tokio::test]
async fn duplicate_check_survives_reserved_characters() {
    let api = api_for(&support::spawn_backend());
    api.register_user(&new_user("a+b@x.com")).await.unwrap();

    assert!(api.check_email_duplication("a+b@x.com").await.unwrap());
    assert!(!api.check_email_duplication("a b@x.com").await.unwrap());
    assert!(!api.check_email_duplication("a+b@x.com&x=1").await.unwrap());
}

#[tokio::test]
async fn forged_credential_is_rejected_until_login() {
    let api = api_for(&support::spawn_backend());
    api.register_user(&new_user("a@b.com")).await.unwrap();

    api.set_credential("token-forged");
    let err = api
        .check_password(&PasswordCheck {
            password: "pw".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(401));

    let session = api
        .login(&LoginRequest {
            email: "a@b.com".to_string(),
            password: "pw".to_string(),
        })
        .await
        .unwrap();
    api.set_credential(session.access_token);
    assert!(api
        .check_password(&PasswordCheck {
            password: "pw".to_string(),
        })
        .await
        .unwrap());
}

#[tokio::test]
async fn unknown_treatment_is_not_found() {
    let api = api_for(&support::spawn_backend());
    assert_eq!(
        api.get_treatment(TreatmentId(404)).await.unwrap_err(),
        ApiError::NotFound
    );
}

#[tokio::test]
async fn caller_supplied_reqwest_client_reaches_the_backend() {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    let client = PetDoctorClient::new(&support::spawn_backend()).unwrap();
    let api = PetDoctorApi::new(client, ReqwestTransport::from_client(http));

    assert!(!api.check_email_duplication("a@b.com").await.unwrap());
    api.register_user(&new_user("a@b.com")).await.unwrap();
    assert!(api.check_email_duplication("a@b.com").await.unwrap());
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    let api = api_for(&format!("http://{}/api", support::dead_address()));
    let err = api.get_user(UserId(1)).await.unwrap_err();
    assert!(err.is_network(), "unexpected error: {err:?}");
}

// ---------------------------------------------------------------------------
// Fake transports
// ---------------------------------------------------------------------------

#[tokio::test]
async fn payload_is_returned_verbatim() {
    let data = json!({
        "id": 3,
        "email": "a@b.com",
        "name": "X",
        "phone": "010",
        "role": "ROLE_USER"
    });
    let (api, transport) = fake_api(200, json!({"message": "success", "data": data.clone()}));

    let user = api.get_user(UserId(3)).await.unwrap();
    assert_eq!(serde_json::to_value(&user).unwrap(), data);

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url, "http://backend.test/api/user/3");
}

#[tokio::test]
async fn missing_data_fails_instead_of_defaulting() {
    let (api, _) = fake_api(200, json!({"message": "success"}));
    assert!(api.get_user(UserId(3)).await.unwrap_err().is_unexpected_response());
    assert!(api
        .request_password_reset("a@b.com")
        .await
        .unwrap_err()
        .is_unexpected_response());
}

#[tokio::test]
async fn register_sends_json_body() {
    let data = json!({"id": 1, "email": "a@b.com", "name": "X"});
    let (api, transport) = fake_api(200, json!({"data": data.clone()}));

    let user = api.register_user(&new_user("a@b.com")).await.unwrap();
    assert_eq!(serde_json::to_value(&user).unwrap(), data);

    let requests = transport.requests();
    let sent = &requests[0];
    assert_eq!(sent.header("content-type"), Some("application/json"));
    let body: serde_json::Value = serde_json::from_str(sent.body.as_deref().unwrap()).unwrap();
    assert_eq!(body, json!({"email": "a@b.com", "password": "pw", "name": "X"}));
}

#[tokio::test]
async fn credential_switch_applies_to_the_next_call() {
    let (api, transport) = fake_api(200, json!({"data": null}));
    let change = PasswordChange {
        password: "old".to_string(),
        new_password: "new".to_string(),
    };

    api.set_credential("token-a");
    api.change_password(&change).await.unwrap();

    // Rotation through a clone is seen by the original handle.
    api.clone().set_credential("token-b");
    api.change_password(&change).await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].header("authorization"), Some("Bearer token-a"));
    assert_eq!(requests[1].header("authorization"), Some("Bearer token-b"));

    api.clear_credential();
    assert_eq!(
        api.change_password(&change).await.unwrap_err(),
        ApiError::MissingCredential
    );
    // Nothing was sent for the rejected call.
    assert_eq!(transport.requests().len(), 2);
}

#[tokio::test]
async fn dot_segment_email_is_rejected_before_sending() {
    let (api, transport) = fake_api(200, json!({"data": null}));
    assert_eq!(
        api.request_password_reset("..").await.unwrap_err(),
        ApiError::InvalidPathParameter("..".to_string())
    );
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn timeout_hook_bounds_the_call() {
    let client = PetDoctorClient::new("http://backend.test/api").unwrap();
    let api = PetDoctorApi::new(client, StalledTransport).with_timeout(Duration::from_millis(20));

    assert_eq!(api.get_user(UserId(1)).await.unwrap_err(), ApiError::Timeout);
}

#[tokio::test]
async fn cancellation_hook_aborts_the_call() {
    let client = PetDoctorClient::new("http://backend.test/api").unwrap();
    let token = CancellationToken::new();
    let api = PetDoctorApi::new(client, StalledTransport).with_cancellation(token.clone());

    let call = tokio::spawn(async move { api.get_treatment(TreatmentId(1)).await });
    token.cancel();

    assert_eq!(call.await.unwrap().unwrap_err(), ApiError::Cancelled);
}

#[tokio::test]
async fn handles_without_hooks_are_unaffected() {
    let (api, _) = fake_api(200, json!({"data": true}));
    let token = CancellationToken::new();
    token.cancel();

    let cancelled = api.with_cancellation(token);
    assert_eq!(
        cancelled.check_email_duplication("a@b.com").await.unwrap_err(),
        ApiError::Cancelled
    );
    assert!(api.check_email_duplication("a@b.com").await.unwrap());
}
