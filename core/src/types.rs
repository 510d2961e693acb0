//! Domain DTOs for the pet-to-doctor API.
//!
//! # Design
//! These types mirror the backend's JSON schema (camelCase keys, 64-bit ids)
//! but are defined independently from the mock-server crate. Integration
//! tests catch any schema drift between the two. Optional backend fields are
//! `Option` and skipped when absent, and keys a type does not model land in
//! its `extra` map, so a payload re-serializes to the same JSON it was
//! parsed from.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }
    };
}

id_type!(
    /// Backend id of a user account.
    UserId
);
id_type!(
    /// Backend id of a doctor.
    DoctorId
);
id_type!(
    /// Backend id of a treatment (a reservation and its consultation).
    TreatmentId
);
id_type!(HospitalId);
id_type!(PrescriptionId);

/// Lifecycle state of a treatment. The backend decides which transitions
/// are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TreatmentType {
    #[serde(rename = "RES_REQUEST")]
    Requested,
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
    /// Wire name, as used in query strings.
    pub fn as_str(self) -> &'static str {
        match self {
            TreatmentType::Requested => "RES_REQUEST",
            TreatmentType::Accepted => "RES_ACCEPTED",
            TreatmentType::Rejected => "RES_REJECTED",
            TreatmentType::Completed => "RES_COMPLETED",
            TreatmentType::Cancelled => "RES_CANCELLED",
        }
    }
}

impl fmt::Display for TreatmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A treatment record as returned by every `/treatment` read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Treatment {
    pub id: TreatmentId,
    pub user_id: UserId,
    pub doctor_id: DoctorId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prescription_id: Option<PrescriptionId>,
    pub hospital_id: HospitalId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_code: Option<String>,
    pub schedule_date: NaiveDateTime,
    #[serde(rename = "type")]
    pub kind: TreatmentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub re_visit: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pet_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symptom: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pet_species: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pet_weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Backend fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Request payload for reserving a treatment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTreatment {
    pub user_id: UserId,
    pub doctor_id: DoctorId,
    pub hospital_id: HospitalId,
    pub schedule_date: NaiveDateTime,
    #[serde(default)]
    pub re_visit: bool,
    pub pet_name: String,
    pub symptom: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pet_species: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pet_weight: Option<String>,
}

/// Payment details recorded against a treatment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentUpdate {
    pub payment_code: String,
    pub price: i32,
}

/// A user account as returned by `/user` reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_img_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Request payload for registering a new account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Request payload for updating a profile. Only the fields present in the
/// JSON are applied; omitted fields remain unchanged on the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Result of a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginSession {
    pub user_id: UserId,
    #[serde(alias = "access-token")]
    pub access_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordCheck {
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub password: String,
    pub new_password: String,
}
