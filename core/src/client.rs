//! Request builder and response parser for the pet-to-doctor backend.
//!
//! # Design
//! `PetDoctorClient` holds the base URL and the shared credential slot, and
//! nothing else. Each backend operation is split into a `build_*` method
//! that produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse`. The caller (usually `PetDoctorApi`) executes the round
//! trip in between, so this module stays deterministic and free of I/O.
//!
//! Every response is an envelope `{ ..., "data": <payload> }`; the parsers
//! return the payload typed per operation and fail when `data` is absent or
//! does not fit.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::credential::CredentialStore;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    DoctorId, LoginRequest, LoginSession, NewTreatment, NewUser, PasswordChange, PasswordCheck,
    PaymentUpdate, Treatment, TreatmentId, TreatmentType, User, UserId, UserUpdate,
};

/// Builds requests and parses responses for every backend operation.
///
/// Clones share the credential slot, so `set_credential` on one clone is
/// seen by all of them.
#[derive(Debug, Clone)]
pub struct PetDoctorClient {
    base_url: Url,
    credentials: CredentialStore,
}

impl PetDoctorClient {
    /// Accepts an absolute http(s) URL such as `http://host:8080/api`. A
    /// trailing slash is ignored; query and fragment are dropped.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let mut url = Url::parse(base_url)
            .map_err(|e| ApiError::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        if url.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(format!(
                "{base_url}: not a hierarchical url"
            )));
        }
        url.set_query(None);
        url.set_fragment(None);
        Ok(Self {
            base_url: url,
            credentials: CredentialStore::default(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Replace the credential used by authenticated operations.
    pub fn set_credential(&self, token: impl Into<String>) {
        self.credentials.set(token);
    }

    pub fn clear_credential(&self) {
        self.credentials.clear();
    }

    pub fn credential(&self) -> Option<String> {
        self.credentials.current()
    }

    // -----------------------------------------------------------------------
    // Treatment
    // -----------------------------------------------------------------------

    pub fn build_get_treatment(&self, treatment_id: TreatmentId) -> HttpRequest {
        let url = self.endpoint(&["treatment", &treatment_id.to_string()]);
        anonymous(HttpMethod::Get, url)
    }

    pub fn build_get_user_treatments(&self, user_id: UserId, kind: TreatmentType) -> HttpRequest {
        let url = with_query(
            self.endpoint(&["treatment", "user", &user_id.to_string()]),
            &[("treatmentType", kind.as_str())],
        );
        anonymous(HttpMethod::Get, url)
    }

    pub fn build_get_doctor_treatments(&self, doctor_id: DoctorId) -> HttpRequest {
        let url = self.endpoint(&["treatment", "doctor", &doctor_id.to_string()]);
        anonymous(HttpMethod::Get, url)
    }

    pub fn build_get_doctor_all_treatments(&self, doctor_id: DoctorId) -> HttpRequest {
        let url = self.endpoint(&["treatment", "doctor", "all", &doctor_id.to_string()]);
        anonymous(HttpMethod::Get, url)
    }

    pub fn build_create_treatment(&self, input: &NewTreatment) -> Result<HttpRequest, ApiError> {
        let url = self.endpoint(&["treatment"]);
        anonymous_json(HttpMethod::Post, url, input)
    }

    /// Without `next`, the request carries no query and the backend picks
    /// the next state itself.
    pub fn build_update_treatment_state(
        &self,
        treatment_id: TreatmentId,
        next: Option<TreatmentType>,
    ) -> HttpRequest {
        let url = self.endpoint(&["treatment", &treatment_id.to_string()]);
        let url = match next {
            Some(kind) => with_query(url, &[("treatmentType", kind.as_str())]),
            None => url,
        };
        anonymous(HttpMethod::Post, url)
    }

    pub fn build_update_treatment_payment(
        &self,
        treatment_id: TreatmentId,
        payment: Option<&PaymentUpdate>,
    ) -> Result<HttpRequest, ApiError> {
        let url = self.endpoint(&["treatment", "payment", &treatment_id.to_string()]);
        match payment {
            Some(payment) => anonymous_json(HttpMethod::Post, url, payment),
            None => Ok(anonymous(HttpMethod::Post, url)),
        }
    }

    pub fn parse_get_treatment(&self, response: HttpResponse) -> Result<Treatment, ApiError> {
        unwrap_envelope(response)
    }

    pub fn parse_get_user_treatments(
        &self,
        response: HttpResponse,
    ) -> Result<Vec<Treatment>, ApiError> {
        unwrap_envelope(response)
    }

    pub fn parse_get_doctor_treatments(
        &self,
        response: HttpResponse,
    ) -> Result<Vec<Treatment>, ApiError> {
        unwrap_envelope(response)
    }

    pub fn parse_get_doctor_all_treatments(
        &self,
        response: HttpResponse,
    ) -> Result<Vec<Treatment>, ApiError> {
        unwrap_envelope(response)
    }

    pub fn parse_create_treatment(&self, response: HttpResponse) -> Result<TreatmentId, ApiError> {
        unwrap_envelope(response)
    }

    pub fn parse_update_treatment_state(
        &self,
        response: HttpResponse,
    ) -> Result<Treatment, ApiError> {
        unwrap_envelope(response)
    }

    pub fn parse_update_treatment_payment(
        &self,
        response: HttpResponse,
    ) -> Result<Treatment, ApiError> {
        unwrap_envelope(response)
    }

    // -----------------------------------------------------------------------
    // User
    // -----------------------------------------------------------------------

    pub fn build_update_user(&self, input: &UserUpdate) -> Result<HttpRequest, ApiError> {
        let url = self.endpoint(&["user"]);
        self.authenticated_json(HttpMethod::Put, url, input)
    }

    pub fn build_register_user(&self, input: &NewUser) -> Result<HttpRequest, ApiError> {
        let url = self.endpoint(&["user"]);
        anonymous_json(HttpMethod::Post, url, input)
    }

    pub fn build_delete_user(&self, user_id: UserId) -> HttpRequest {
        let url = self.endpoint(&["user", &user_id.to_string()]);
        anonymous(HttpMethod::Delete, url)
    }

    pub fn build_update_user_photo(&self, user_id: UserId) -> HttpRequest {
        let url = self.endpoint(&["user", "profile", &user_id.to_string()]);
        anonymous(HttpMethod::Post, url)
    }

    pub fn build_check_password(&self, input: &PasswordCheck) -> Result<HttpRequest, ApiError> {
        let url = self.endpoint(&["user", "password", "check"]);
        self.authenticated_json(HttpMethod::Post, url, input)
    }

    pub fn build_change_password(&self, input: &PasswordChange) -> Result<HttpRequest, ApiError> {
        let url = self.endpoint(&["user", "password", "change"]);
        self.authenticated_json(HttpMethod::Post, url, input)
    }

    pub fn build_login(&self, input: &LoginRequest) -> Result<HttpRequest, ApiError> {
        let url = self.endpoint(&["user", "login"]);
        anonymous_json(HttpMethod::Post, url, input)
    }

    pub fn build_get_user(&self, user_id: UserId) -> HttpRequest {
        let url = self.endpoint(&["user", &user_id.to_string()]);
        anonymous(HttpMethod::Get, url)
    }

    /// Fails with `InvalidPathParameter` for an empty, `.` or `..` email.
    pub fn build_request_password_reset(&self, email: &str) -> Result<HttpRequest, ApiError> {
        let email = path_param(email)?;
        let url = self.endpoint(&["user", "password", "sendToEmail", email]);
        Ok(anonymous(HttpMethod::Get, url))
    }

    pub fn build_check_email_duplication(&self, email: &str) -> HttpRequest {
        let url = with_query(self.endpoint(&["user", "duplication"]), &[("email", email)]);
        anonymous(HttpMethod::Get, url)
    }

    pub fn parse_update_user(&self, response: HttpResponse) -> Result<User, ApiError> {
        unwrap_envelope(response)
    }

    pub fn parse_register_user(&self, response: HttpResponse) -> Result<User, ApiError> {
        unwrap_envelope(response)
    }

    pub fn parse_delete_user(&self, response: HttpResponse) -> Result<(), ApiError> {
        unwrap_envelope(response)
    }

    pub fn parse_update_user_photo(&self, response: HttpResponse) -> Result<User, ApiError> {
        unwrap_envelope(response)
    }

    /// `true` when the password matches the signed-in user's.
    pub fn parse_check_password(&self, response: HttpResponse) -> Result<bool, ApiError> {
        unwrap_envelope(response)
    }

    pub fn parse_change_password(&self, response: HttpResponse) -> Result<(), ApiError> {
        unwrap_envelope(response)
    }

    pub fn parse_login(&self, response: HttpResponse) -> Result<LoginSession, ApiError> {
        unwrap_envelope(response)
    }

    pub fn parse_get_user(&self, response: HttpResponse) -> Result<User, ApiError> {
        unwrap_envelope(response)
    }

    pub fn parse_request_password_reset(&self, response: HttpResponse) -> Result<(), ApiError> {
        unwrap_envelope(response)
    }

    /// `true` when the email is already registered.
    pub fn parse_check_email_duplication(&self, response: HttpResponse) -> Result<bool, ApiError> {
        unwrap_envelope(response)
    }

    // -----------------------------------------------------------------------
    // Request assembly
    // -----------------------------------------------------------------------

    /// Base URL with `segments` appended, each percent-encoded on its own.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Cannot fail: `new` rejects cannot-be-a-base urls.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authenticated_json<B: Serialize>(
        &self,
        method: HttpMethod,
        url: Url,
        body: &B,
    ) -> Result<HttpRequest, ApiError> {
        let token = self.credentials.current().ok_or(ApiError::MissingCredential)?;
        let mut request = anonymous_json(method, url, body)?;
        request
            .headers
            .push(("authorization".to_string(), format!("Bearer {token}")));
        Ok(request)
    }
}

/// `url` drops dot segments and an empty segment changes the route.
fn path_param(value: &str) -> Result<&str, ApiError> {
    match value {
        "" | "." | ".." => Err(ApiError::InvalidPathParameter(value.to_string())),
        _ => Ok(value),
    }
}

fn with_query(mut url: Url, pairs: &[(&str, &str)]) -> Url {
    url.query_pairs_mut().extend_pairs(pairs);
    url
}

fn anonymous(method: HttpMethod, url: Url) -> HttpRequest {
    HttpRequest {
        method,
        url: url.into(),
        headers: Vec::new(),
        body: None,
    }
}

fn anonymous_json<B: Serialize>(
    method: HttpMethod,
    url: Url,
    body: &B,
) -> Result<HttpRequest, ApiError> {
    let body = serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
    Ok(HttpRequest {
        method,
        url: url.into(),
        headers: vec![("content-type".to_string(), "application/json".to_string())],
        body: Some(body),
    })
}

/// Check the status, then pull `data` out of the envelope and decode it.
fn unwrap_envelope<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ApiError> {
    check_status(&response)?;
    let envelope: serde_json::Value = serde_json::from_str(&response.body)
        .map_err(|e| ApiError::Envelope(format!("body is not JSON: {e}")))?;
    let serde_json::Value::Object(mut fields) = envelope else {
        return Err(ApiError::Envelope("body is not a JSON object".to_string()));
    };
    let data = fields
        .remove("data")
        .ok_or_else(|| ApiError::Envelope("missing `data` field".to_string()))?;
    serde_json::from_value(data)
        .map_err(|e| ApiError::Envelope(format!("`data` does not match schema: {e}")))
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    let message = serde_json::from_str::<ErrorBody>(&response.body)
        .ok()
        .map(|b| b.message);
    Err(ApiError::Http {
        status: response.status,
        message,
        body: response.body.clone(),
    })
}
