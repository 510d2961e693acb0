use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

// --- wire types ---

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreatmentType {
    #[serde(rename = "RES_REQUEST")]
    Request,
    #[serde(rename = "RES_ACCEPTED")]
    Accepted,
    #[serde(rename = "RES_REJECTED")]
    Rejected,
    #[serde(rename = "RES_COMPLETED")]
    Completed,
    #[serde(rename = "RES_CANCELLED")]
    Cancelled,
}

impl TreatmentType {
    fn next(self) -> Option<Self> {
        match self {
            TreatmentType::Request => Some(TreatmentType::Accepted),
            TreatmentType::Accepted => Some(TreatmentType::Completed),
            _ => None,
        }
    }

    fn is_open(self) -> bool {
        matches!(self, TreatmentType::Request | TreatmentType::Accepted)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Treatment {
    pub id: u64,
    pub user_id: u64,
    pub doctor_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prescription_id: Option<u64>,
    pub hospital_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_code: Option<String>,
    pub schedule_date: String,
    #[serde(rename = "type")]
    pub kind: TreatmentType,
    pub re_visit: bool,
    pub pet_name: String,
    pub symptom: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pet_species: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pet_weight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTreatment {
    pub user_id: u64,
    pub doctor_id: u64,
    pub hospital_id: u64,
    pub schedule_date: String,
    #[serde(default)]
    pub re_visit: bool,
    pub pet_name: String,
    pub symptom: String,
    pub birth_date: Option<String>,
    pub pet_species: Option<String>,
    pub pet_weight: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReq {
    pub payment_code: String,
    pub price: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_img_url: Option<String>,
}

#[derive(Deserialize)]
pub struct SignupReq {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Deserialize)]
pub struct UserUpdateReq {
    pub id: u64,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginReq {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRes {
    pub user_id: u64,
    pub access_token: String,
}

#[derive(Deserialize)]
pub struct PasswordCheckReq {
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChangeReq {
    pub password: String,
    pub new_password: String,
}

/// Every success body is `{ "message": ..., "data": ... }`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub message: String,
    pub data: T,
}

fn ok<T>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        message: "success".to_string(),
        data,
    })
}

/// Error body `{ "message": ... }` with the backend's status conventions.
#[derive(Debug)]
pub struct Failure {
    status: StatusCode,
    message: String,
}

impl Failure {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn not_found(what: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("{what} not found"))
    }

    fn unauthorized(message: &str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "message": self.message });
        (self.status, Json(body)).into_response()
    }
}

type Reply<T> = Result<Json<Envelope<T>>, Failure>;

// --- store ---

#[derive(Clone, Debug)]
struct UserRecord {
    user: User,
    password: String,
}

#[derive(Debug, Default)]
pub struct Store {
    users: HashMap<u64, UserRecord>,
    treatments: BTreeMap<u64, Treatment>,
    tokens: HashMap<String, u64>,
    reset_requests: Vec<String>,
    next_user_id: u64,
    next_treatment_id: u64,
}

impl Store {
    /// Emails for which a password-reset mail was requested, oldest first.
    pub fn password_reset_requests(&self) -> &[String] {
        &self.reset_requests
    }

    fn user_by_email(&self, email: &str) -> Option<&UserRecord> {
        self.users.values().find(|r| r.user.email == email)
    }

    fn authenticate(&self, headers: &HeaderMap) -> Result<u64, Failure> {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| Failure::unauthorized("missing bearer token"))?;
        self.tokens
            .get(token)
            .copied()
            .ok_or_else(|| Failure::unauthorized("invalid token"))
    }
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    app_with_store(Db::default())
}

/// Router over a caller-owned store, so tests can inspect side effects.
pub fn app_with_store(db: Db) -> Router {
    let api = Router::new()
        .route("/treatment", post(create_treatment))
        .route("/treatment/{id}", get(get_treatment).post(update_treatment_state))
        .route("/treatment/user/{id}", get(user_treatments))
        .route("/treatment/doctor/{id}", get(doctor_treatments))
        .route("/treatment/doctor/all/{id}", get(doctor_all_treatments))
        .route("/treatment/payment/{id}", post(update_payment))
        .route("/user", post(register_user).put(update_user))
        .route("/user/{id}", get(get_user).delete(delete_user))
        .route("/user/profile/{id}", post(update_user_photo))
        .route("/user/login", post(login))
        .route("/user/password/check", post(check_password))
        .route("/user/password/change", post(change_password))
        .route("/user/password/sendToEmail/{email}", get(send_reset_email))
        .route("/user/duplication", get(check_duplication))
        .with_state(db);
    Router::new().nest("/api", api)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

// --- treatment handlers ---

async fn create_treatment(State(db): State<Db>, Json(input): Json<NewTreatment>) -> Reply<u64> {
    let mut store = db.write().await;
    store.next_treatment_id += 1;
    let id = store.next_treatment_id;
    let treatment = Treatment {
        id,
        user_id: input.user_id,
        doctor_id: input.doctor_id,
        prescription_id: None,
        hospital_id: input.hospital_id,
        payment_code: None,
        schedule_date: input.schedule_date,
        kind: TreatmentType::Request,
        re_visit: input.re_visit,
        pet_name: input.pet_name,
        symptom: input.symptom,
        birth_date: input.birth_date,
        pet_species: input.pet_species,
        pet_weight: input.pet_weight,
        price: None,
        url: None,
    };
    store.treatments.insert(id, treatment);
    tracing::info!(treatment_id = id, "treatment reserved");
    Ok(ok(id))
}

async fn get_treatment(State(db): State<Db>, Path(id): Path<u64>) -> Reply<Treatment> {
    let store = db.read().await;
    store
        .treatments
        .get(&id)
        .cloned()
        .map(ok)
        .ok_or_else(|| Failure::not_found("treatment"))
}

#[derive(Deserialize)]
struct UserTreatmentQuery {
    #[serde(rename = "treatmentType")]
    treatment_type: TreatmentType,
}

async fn user_treatments(
    State(db): State<Db>,
    Path(user_id): Path<u64>,
    Query(query): Query<UserTreatmentQuery>,
) -> Reply<Vec<Treatment>> {
    let store = db.read().await;
    let found = store
        .treatments
        .values()
        .filter(|t| t.user_id == user_id && t.kind == query.treatment_type)
        .cloned()
        .collect();
    Ok(ok(found))
}

/// Open (requested or accepted) treatments only.
async fn doctor_treatments(
    State(db): State<Db>,
    Path(doctor_id): Path<u64>,
) -> Reply<Vec<Treatment>> {
    let store = db.read().await;
    let found = store
        .treatments
        .values()
        .filter(|t| t.doctor_id == doctor_id && t.kind.is_open())
        .cloned()
        .collect();
    Ok(ok(found))
}

async fn doctor_all_treatments(
    State(db): State<Db>,
    Path(doctor_id): Path<u64>,
) -> Reply<Vec<Treatment>> {
    let store = db.read().await;
    let found = store
        .treatments
        .values()
        .filter(|t| t.doctor_id == doctor_id)
        .cloned()
        .collect();
    Ok(ok(found))
}

#[derive(Deserialize)]
struct StateQuery {
    #[serde(rename = "treatmentType")]
    treatment_type: Option<TreatmentType>,
}

async fn update_treatment_state(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Query(query): Query<StateQuery>,
) -> Reply<Treatment> {
    let mut store = db.write().await;
    let treatment = store
        .treatments
        .get_mut(&id)
        .ok_or_else(|| Failure::not_found("treatment"))?;
    let next = match query.treatment_type {
        Some(kind) => kind,
        None => treatment
            .kind
            .next()
            .ok_or_else(|| Failure::new(StatusCode::CONFLICT, "treatment already closed"))?,
    };
    treatment.kind = next;
    Ok(ok(treatment.clone()))
}

/// The body is optional; an empty one only confirms the treatment exists.
async fn update_payment(
    State(db): State<Db>,
    Path(id): Path<u64>,
    body: Bytes,
) -> Reply<Treatment> {
    let payment = if body.is_empty() {
        None
    } else {
        let payment: PaymentReq = serde_json::from_slice(&body)
            .map_err(|e| Failure::new(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;
        Some(payment)
    };

    let mut store = db.write().await;
    let treatment = store
        .treatments
        .get_mut(&id)
        .ok_or_else(|| Failure::not_found("treatment"))?;
    if let Some(payment) = payment {
        treatment.payment_code = Some(payment.payment_code);
        treatment.price = Some(payment.price);
    }
    Ok(ok(treatment.clone()))
}

// --- user handlers ---

async fn register_user(State(db): State<Db>, Json(input): Json<SignupReq>) -> Reply<User> {
    let mut store = db.write().await;
    if store.user_by_email(&input.email).is_some() {
        return Err(Failure::new(StatusCode::CONFLICT, "email already registered"));
    }
    store.next_user_id += 1;
    let user = User {
        id: store.next_user_id,
        email: input.email,
        name: input.name,
        phone: input.phone,
        address: input.address,
        role: "ROLE_USER".to_string(),
        profile_img_url: None,
    };
    store.users.insert(
        user.id,
        UserRecord {
            user: user.clone(),
            password: input.password,
        },
    );
    tracing::info!(user_id = user.id, "user registered");
    Ok(ok(user))
}

async fn update_user(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<UserUpdateReq>,
) -> Reply<User> {
    let mut store = db.write().await;
    let caller = store.authenticate(&headers)?;
    if caller != input.id {
        return Err(Failure::new(StatusCode::FORBIDDEN, "cannot modify another user"));
    }
    let record = store
        .users
        .get_mut(&input.id)
        .ok_or_else(|| Failure::not_found("user"))?;
    if let Some(name) = input.name {
        record.user.name = name;
    }
    if let Some(phone) = input.phone {
        record.user.phone = Some(phone);
    }
    if let Some(address) = input.address {
        record.user.address = Some(address);
    }
    Ok(ok(record.user.clone()))
}

async fn get_user(State(db): State<Db>, Path(id): Path<u64>) -> Reply<User> {
    let store = db.read().await;
    store
        .users
        .get(&id)
        .map(|r| ok(r.user.clone()))
        .ok_or_else(|| Failure::not_found("user"))
}

async fn delete_user(State(db): State<Db>, Path(id): Path<u64>) -> Reply<()> {
    let mut store = db.write().await;
    store
        .users
        .remove(&id)
        .ok_or_else(|| Failure::not_found("user"))?;
    store.tokens.retain(|_, user_id| *user_id != id);
    Ok(ok(()))
}

async fn update_user_photo(State(db): State<Db>, Path(id): Path<u64>) -> Reply<User> {
    let mut store = db.write().await;
    let record = store
        .users
        .get_mut(&id)
        .ok_or_else(|| Failure::not_found("user"))?;
    record.user.profile_img_url = Some(format!("/profile/{id}.png"));
    Ok(ok(record.user.clone()))
}

async fn login(State(db): State<Db>, Json(input): Json<LoginReq>) -> Reply<LoginRes> {
    let mut store = db.write().await;
    let record = store
        .user_by_email(&input.email)
        .ok_or_else(|| Failure::new(StatusCode::NOT_ACCEPTABLE, "unknown email"))?;
    if record.password != input.password {
        return Err(Failure::unauthorized("password mismatch"));
    }
    let user_id = record.user.id;
    let token = format!("token-{}", Uuid::new_v4());
    store.tokens.insert(token.clone(), user_id);
    tracing::info!(user_id, "login");
    Ok(ok(LoginRes {
        user_id,
        access_token: token,
    }))
}

async fn check_password(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<PasswordCheckReq>,
) -> Reply<bool> {
    let store = db.read().await;
    let caller = store.authenticate(&headers)?;
    let record = store
        .users
        .get(&caller)
        .ok_or_else(|| Failure::not_found("user"))?;
    Ok(ok(record.password == input.password))
}

async fn change_password(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<PasswordChangeReq>,
) -> Reply<()> {
    let mut store = db.write().await;
    let caller = store.authenticate(&headers)?;
    let record = store
        .users
        .get_mut(&caller)
        .ok_or_else(|| Failure::not_found("user"))?;
    if record.password != input.password {
        return Err(Failure::unauthorized("password mismatch"));
    }
    record.password = input.new_password;
    Ok(ok(()))
}

async fn send_reset_email(State(db): State<Db>, Path(email): Path<String>) -> Reply<()> {
    let mut store = db.write().await;
    if store.user_by_email(&email).is_none() {
        return Err(Failure::not_found("user"));
    }
    store.reset_requests.push(email);
    Ok(ok(()))
}

#[derive(Deserialize)]
struct DuplicationQuery {
    email: String,
}

async fn check_duplication(
    State(db): State<Db>,
    Query(query): Query<DuplicationQuery>,
) -> Reply<bool> {
    let store = db.read().await;
    Ok(ok(store.user_by_email(&query.email).is_some()))
}
