// libs/analytics-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One dashboard invocation's worth of derived statistics. Every section
/// degrades independently to its zero value when its source collection is
/// unreachable; the snapshot itself is always produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub users: UserCounts,
    pub appointments: AppointmentCounts,
    /// Appointment counts for the current calendar year, buckets 1-12,
    /// zero-filled for empty months.
    pub monthly_appointments: Vec<u64>,
    /// Revenue summed over completed appointments.
    pub revenue_completed: f64,
    pub reports: ReportCounts,
    pub top_patients: Vec<TopPatient>,
    pub top_uploaders: Vec<TopUploader>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserCounts {
    pub total_patients: u64,
    pub active_patients: u64,
    pub blocked_patients: u64,
    pub total_employees: u64,
    pub total_admins: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentCounts {
    pub total: u64,
    pub scheduled: u64,
    pub completed: u64,
    pub cancelled: u64,
    pub no_show: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportCounts {
    pub total: u64,
    pub pending: u64,
    pub completed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopPatient {
    pub patient_id: Uuid,
    pub full_name: Option<String>,
    pub appointment_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopUploader {
    pub employee_id: Uuid,
    pub full_name: Option<String>,
    pub report_count: u64,
}
