//! Async facade over `PetDoctorClient` and a `Transport`.
//!
//! Every method performs build, one network exchange, then parse. Nothing
//! is cached, retried or deduplicated; failures come back unchanged as
//! `ApiError`.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::client::PetDoctorClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{
    DoctorId, LoginRequest, LoginSession, NewTreatment, NewUser, PasswordChange, PasswordCheck,
    PaymentUpdate, Treatment, TreatmentId, TreatmentType, User, UserId, UserUpdate,
};

#[derive(Clone, Default)]
struct CallOptions {
    timeout: Option<Duration>,
    cancel: Option<CancellationToken>,
}

/// Entry point for UI code.
///
/// Cheap to clone; clones share the transport and the credential slot.
pub struct PetDoctorApi<T = ReqwestTransport> {
    client: PetDoctorClient,
    transport: Arc<T>,
    options: CallOptions,
}

// Manual impl: `T` itself need not be `Clone`.
impl<T> Clone for PetDoctorApi<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            transport: Arc::clone(&self.transport),
            options: self.options.clone(),
        }
    }
}

impl PetDoctorApi<ReqwestTransport> {
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = PetDoctorClient::new(&config.base_url)?;
        let transport = ReqwestTransport::new(config.timeout())?;
        tracing::debug!(
            base_url = %client.base_url(),
            timeout_secs = config.timeout_secs,
            "api client configured"
        );
        Ok(Self::new(client, transport))
    }
}

impl<T: Transport> PetDoctorApi<T> {
    pub fn new(client: PetDoctorClient, transport: T) -> Self {
        Self {
            client,
            transport: Arc::new(transport),
            options: CallOptions::default(),
        }
    }

    pub fn client(&self) -> &PetDoctorClient {
        &self.client
    }

    /// A handle whose calls fail with `ApiError::Timeout` after `timeout`.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let mut api = self.clone();
        api.options.timeout = Some(timeout);
        api
    }

    /// A handle whose calls fail with `ApiError::Cancelled` once `token`
    /// fires.
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        let mut api = self.clone();
        api.options.cancel = Some(token);
        api
    }

    pub fn set_credential(&self, token: impl Into<String>) {
        self.client.set_credential(token);
    }

    pub fn clear_credential(&self) {
        self.client.clear_credential();
    }

    // -----------------------------------------------------------------------
    // Treatment
    // -----------------------------------------------------------------------

    pub async fn get_treatment(&self, treatment_id: TreatmentId) -> Result<Treatment, ApiError> {
        let request = self.client.build_get_treatment(treatment_id);
        let response = self.send("get_treatment", request).await?;
        self.client.parse_get_treatment(response)
    }

    pub async fn get_user_treatments(
        &self,
        user_id: UserId,
        kind: TreatmentType,
    ) -> Result<Vec<Treatment>, ApiError> {
        let request = self.client.build_get_user_treatments(user_id, kind);
        let response = self.send("get_user_treatments", request).await?;
        self.client.parse_get_user_treatments(response)
    }

    pub async fn get_doctor_treatments(
        &self,
        doctor_id: DoctorId,
    ) -> Result<Vec<Treatment>, ApiError> {
        let request = self.client.build_get_doctor_treatments(doctor_id);
        let response = self.send("get_doctor_treatments", request).await?;
        self.client.parse_get_doctor_treatments(response)
    }

    pub async fn get_doctor_all_treatments(
        &self,
        doctor_id: DoctorId,
    ) -> Result<Vec<Treatment>, ApiError> {
        let request = self.client.build_get_doctor_all_treatments(doctor_id);
        let response = self.send("get_doctor_all_treatments", request).await?;
        self.client.parse_get_doctor_all_treatments(response)
    }

    pub async fn create_treatment(&self, input: &NewTreatment) -> Result<TreatmentId, ApiError> {
        let request = self.client.build_create_treatment(input)?;
        let response = self.send("create_treatment", request).await?;
        self.client.parse_create_treatment(response)
    }

    pub async fn update_treatment_state(
        &self,
        treatment_id: TreatmentId,
        next: Option<TreatmentType>,
    ) -> Result<Treatment, ApiError> {
        let request = self.client.build_update_treatment_state(treatment_id, next);
        let response = self.send("update_treatment_state", request).await?;
        self.client.parse_update_treatment_state(response)
    }

    pub async fn update_treatment_payment(
        &self,
        treatment_id: TreatmentId,
        payment: Option<&PaymentUpdate>,
    ) -> Result<Treatment, ApiError> {
        let request = self
            .client
            .build_update_treatment_payment(treatment_id, payment)?;
        let response = self.send("update_treatment_payment", request).await?;
        self.client.parse_update_treatment_payment(response)
    }

    // -----------------------------------------------------------------------
    // User
    // -----------------------------------------------------------------------

    pub async fn update_user(&self, input: &UserUpdate) -> Result<User, ApiError> {
        let request = self.client.build_update_user(input)?;
        let response = self.send("update_user", request).await?;
        self.client.parse_update_user(response)
    }

    pub async fn register_user(&self, input: &NewUser) -> Result<User, ApiError> {
        let request = self.client.build_register_user(input)?;
        let response = self.send("register_user", request).await?;
        self.client.parse_register_user(response)
    }

    pub async fn delete_user(&self, user_id: UserId) -> Result<(), ApiError> {
        let request = self.client.build_delete_user(user_id);
        let response = self.send("delete_user", request).await?;
        self.client.parse_delete_user(response)
    }

    pub async fn update_user_photo(&self, user_id: UserId) -> Result<User, ApiError> {
        let request = self.client.build_update_user_photo(user_id);
        let response = self.send("update_user_photo", request).await?;
        self.client.parse_update_user_photo(response)
    }

    pub async fn check_password(&self, input: &PasswordCheck) -> Result<bool, ApiError> {
        let request = self.client.build_check_password(input)?;
        let response = self.send("check_password", request).await?;
        self.client.parse_check_password(response)
    }

    pub async fn change_password(&self, input: &PasswordChange) -> Result<(), ApiError> {
        let request = self.client.build_change_password(input)?;
        let response = self.send("change_password", request).await?;
        self.client.parse_change_password(response)
    }

    /// Does not store the returned token; call `set_credential` with it.
    pub async fn login(&self, input: &LoginRequest) -> Result<LoginSession, ApiError> {
        let request = self.client.build_login(input)?;
        let response = self.send("login", request).await?;
        self.client.parse_login(response)
    }

    pub async fn get_user(&self, user_id: UserId) -> Result<User, ApiError> {
        let request = self.client.build_get_user(user_id);
        let response = self.send("get_user", request).await?;
        self.client.parse_get_user(response)
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<(), ApiError> {
        let request = self.client.build_request_password_reset(email)?;
        let response = self.send("request_password_reset", request).await?;
        self.client.parse_request_password_reset(response)
    }

    pub async fn check_email_duplication(&self, email: &str) -> Result<bool, ApiError> {
        let request = self.client.build_check_email_duplication(email);
        let response = self.send("check_email_duplication", request).await?;
        self.client.parse_check_email_duplication(response)
    }

    /// Run one exchange under this handle's timeout and cancellation.
    async fn send(
        &self,
        operation: &'static str,
        request: HttpRequest,
    ) -> Result<HttpResponse, ApiError> {
        let span = tracing::debug_span!(
            "api_call",
            operation,
            method = %request.method
        );

        async move {
            let exchange = async {
                match self.options.timeout {
                    Some(limit) => tokio::time::timeout(limit, self.transport.execute(request))
                        .await
                        .map_err(|_| ApiError::Timeout)?,
                    None => self.transport.execute(request).await,
                }
            };

            let result = match &self.options.cancel {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(ApiError::Cancelled),
                    result = exchange => result,
                },
                None => exchange.await,
            };

            match &result {
                Ok(response) => tracing::debug!(status = response.status, "response received"),
                Err(err) => tracing::warn!(error = %err, "request failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}
