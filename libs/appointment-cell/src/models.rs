// libs/appointment-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use shared_models::records::{ServiceItem, UserAccount};

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub service_id: Uuid,
    /// Optional reference; an unresolvable employee id is stored as an
    /// explicit null, never rejected.
    pub employee_id: Option<Uuid>,
    pub scheduled_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub payment_status: PaymentStatus,
    pub amount: f64,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Paid => write!(f, "paid"),
            PaymentStatus::Refunded => write!(f, "refunded"),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

/// Creation payload. Reference fields arrive as raw strings and are parsed
/// and resolved once, at the boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient_id: String,
    pub service_id: String,
    pub employee_id: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub status: Option<AppointmentStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub amount: Option<f64>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

/// Partial update. `location` and `notes` use a double Option so a supplied
/// null clears the field while an omitted field is left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub employee_id: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub status: Option<AppointmentStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub amount: Option<f64>,
    #[serde(
        default,
        deserialize_with = "clearable",
        skip_serializing_if = "Option::is_none"
    )]
    pub location: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "clearable",
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<Option<String>>,
}

/// Keeps an explicit `null` distinguishable from an omitted key: a present
/// value (including null) always lands in the outer `Some`, while `default`
/// leaves the outer `None` for keys the caller never sent.
fn clearable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Display projection: the appointment with its references dereferenced at
/// read time. A missing referent embeds as null; this is a read-time join,
/// not a constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentView {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub patient: Option<UserAccount>,
    pub service: Option<ServiceItem>,
    pub employee: Option<UserAccount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentPage {
    pub appointments: Vec<Appointment>,
    pub total_count: u64,
    pub total_pages: u64,
    pub current_page: u64,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    /// Missing or malformed required reference or field. Always raised
    /// before any write; never a partial mutation.
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
