//! Typed API client for the pet-to-doctor reservation backend.
//!
//! # Overview
//! `PetDoctorClient` builds `HttpRequest` values and parses `HttpResponse`
//! values without touching the network (host-does-IO pattern).
//! `PetDoctorApi` pairs it with a `Transport` and exposes one async method
//! per backend operation.
//!
//! # Design
//! - One long-lived client; the bearer credential lives in a shared slot
//!   that is read when each authenticated request is built.
//! - Responses are `{ ..., "data": <payload> }` envelopes; only the typed
//!   payload is surfaced, and a missing or ill-shaped `data` is an error.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod api;
pub mod client;
pub mod config;
pub mod credential;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;

pub use api::PetDoctorApi;
pub use client::PetDoctorClient;
pub use config::{ClientConfig, ConfigError};
pub use credential::CredentialStore;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use transport::{ReqwestTransport, Transport};
pub use types::{
    DoctorId, HospitalId, LoginRequest, LoginSession, NewTreatment, NewUser, PasswordChange,
    PasswordCheck, PaymentUpdate, PrescriptionId, Treatment, TreatmentId, TreatmentType, User,
    UserId, UserUpdate,
};
pub use tokio_util::sync::CancellationToken;
