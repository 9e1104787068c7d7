// libs/analytics-cell/src/services/dashboard.rs
use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Datelike, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::store::StoreClient;
use shared_models::records::UserAccount;

use crate::models::{
    AnalyticsSnapshot, AppointmentCounts, ReportCounts, TopPatient, TopUploader, UserCounts,
};

const USERS_COLLECTION: &str = "users";
const APPOINTMENTS_COLLECTION: &str = "appointments";
const REPORTS_COLLECTION: &str = "reports";

const TOP_N: usize = 5;
// In-memory aggregation over thin projections; plenty of headroom for a
// single-clinic dataset.
const SCAN_LIMIT: u64 = 10_000;

#[derive(Debug, Deserialize)]
struct ScheduledAtRow {
    scheduled_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct AmountRow {
    amount: f64,
}

#[derive(Debug, Deserialize)]
struct PatientIdRow {
    patient_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct EmployeeIdRow {
    employee_id: Uuid,
}

/// Read-only roll-up over the operational collections.
///
/// Every section of the snapshot is computed independently: when one source
/// collection is unreachable, that section degrades to its zero value and the
/// rest of the snapshot is still served.
pub struct DashboardService {
    store: StoreClient,
}

impl DashboardService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: StoreClient::new(config),
        }
    }

    pub async fn snapshot(&self) -> AnalyticsSnapshot {
        let users = self.user_counts().await.unwrap_or_else(|e| {
            warn!("Dashboard user counts unavailable: {}", e);
            UserCounts::default()
        });

        let appointments = self.appointment_counts().await.unwrap_or_else(|e| {
            warn!("Dashboard appointment counts unavailable: {}", e);
            AppointmentCounts::default()
        });

        let monthly_appointments = self.monthly_appointments().await.unwrap_or_else(|e| {
            warn!("Dashboard monthly histogram unavailable: {}", e);
            vec![0; 12]
        });

        let revenue_completed = self.revenue_completed().await.unwrap_or_else(|e| {
            warn!("Dashboard revenue unavailable: {}", e);
            0.0
        });

        let reports = self.report_counts().await.unwrap_or_else(|e| {
            warn!("Dashboard report counts unavailable: {}", e);
            ReportCounts::default()
        });

        let top_patients = self.top_patients().await.unwrap_or_else(|e| {
            warn!("Dashboard top patients unavailable: {}", e);
            Vec::new()
        });

        let top_uploaders = self.top_uploaders().await.unwrap_or_else(|e| {
            warn!("Dashboard top uploaders unavailable: {}", e);
            Vec::new()
        });

        AnalyticsSnapshot {
            users,
            appointments,
            monthly_appointments,
            revenue_completed,
            reports,
            top_patients,
            top_uploaders,
            generated_at: Utc::now(),
        }
    }

    /// Collection-wide match count without pulling the rows.
    async fn count(&self, collection: &str, filters: &str) -> Result<u64> {
        let path = format!("/rest/v1/{}?select=id&limit=1{}", collection, filters);
        let (_, total): (Vec<Value>, u64) = self.store.fetch_with_count(&path).await?;
        Ok(total)
    }

    async fn user_counts(&self) -> Result<UserCounts> {
        Ok(UserCounts {
            total_patients: self.count(USERS_COLLECTION, "&role=eq.user").await?,
            active_patients: self
                .count(USERS_COLLECTION, "&role=eq.user&status=eq.active")
                .await?,
            blocked_patients: self
                .count(USERS_COLLECTION, "&role=eq.user&status=eq.blocked")
                .await?,
            total_employees: self.count(USERS_COLLECTION, "&role=eq.employee").await?,
            total_admins: self.count(USERS_COLLECTION, "&role=eq.admin").await?,
        })
    }

    async fn appointment_counts(&self) -> Result<AppointmentCounts> {
        Ok(AppointmentCounts {
            total: self.count(APPOINTMENTS_COLLECTION, "").await?,
            scheduled: self
                .count(APPOINTMENTS_COLLECTION, "&status=eq.scheduled")
                .await?,
            completed: self
                .count(APPOINTMENTS_COLLECTION, "&status=eq.completed")
                .await?,
            cancelled: self
                .count(APPOINTMENTS_COLLECTION, "&status=eq.cancelled")
                .await?,
            no_show: self
                .count(APPOINTMENTS_COLLECTION, "&status=eq.no_show")
                .await?,
        })
    }

    /// Twelve buckets for the current calendar year, zero-filled.
    async fn monthly_appointments(&self) -> Result<Vec<u64>> {
        let year = Utc::now().year();
        let path = format!(
            "/rest/v1/{}?select=scheduled_at&scheduled_at=gte.{}&scheduled_at=lt.{}&limit={}",
            APPOINTMENTS_COLLECTION,
            urlencoding::encode(&format!("{}-01-01T00:00:00Z", year)),
            urlencoding::encode(&format!("{}-01-01T00:00:00Z", year + 1)),
            SCAN_LIMIT
        );

        let rows: Vec<ScheduledAtRow> = self
            .store
            .request(reqwest::Method::GET, &path, None)
            .await?;

        let mut buckets = vec![0u64; 12];
        for row in rows {
            let month = row.scheduled_at.month0() as usize;
            buckets[month] += 1;
        }
        Ok(buckets)
    }

    async fn revenue_completed(&self) -> Result<f64> {
        let path = format!(
            "/rest/v1/{}?select=amount&status=eq.completed&limit={}",
            APPOINTMENTS_COLLECTION, SCAN_LIMIT
        );

        let rows: Vec<AmountRow> = self
            .store
            .request(reqwest::Method::GET, &path, None)
            .await?;

        Ok(rows.iter().map(|r| r.amount).sum())
    }

    async fn report_counts(&self) -> Result<ReportCounts> {
        Ok(ReportCounts {
            total: self.count(REPORTS_COLLECTION, "").await?,
            pending: self.count(REPORTS_COLLECTION, "&status=eq.pending").await?,
            completed: self
                .count(REPORTS_COLLECTION, "&status=eq.completed")
                .await?,
        })
    }

    async fn top_patients(&self) -> Result<Vec<TopPatient>> {
        let path = format!(
            "/rest/v1/{}?select=patient_id&limit={}",
            APPOINTMENTS_COLLECTION, SCAN_LIMIT
        );

        let rows: Vec<PatientIdRow> = self
            .store
            .request(reqwest::Method::GET, &path, None)
            .await?;

        let ranked = rank_ids(rows.into_iter().map(|r| r.patient_id));

        let mut top = Vec::with_capacity(ranked.len());
        for (patient_id, appointment_count) in ranked {
            top.push(TopPatient {
                patient_id,
                full_name: self.lookup_name(patient_id).await,
                appointment_count,
            });
        }
        Ok(top)
    }

    async fn top_uploaders(&self) -> Result<Vec<TopUploader>> {
        let path = format!(
            "/rest/v1/{}?select=employee_id&employee_id=not.is.null&limit={}",
            REPORTS_COLLECTION, SCAN_LIMIT
        );

        let rows: Vec<EmployeeIdRow> = self
            .store
            .request(reqwest::Method::GET, &path, None)
            .await?;

        let ranked = rank_ids(rows.into_iter().map(|r| r.employee_id));

        let mut top = Vec::with_capacity(ranked.len());
        for (employee_id, report_count) in ranked {
            top.push(TopUploader {
                employee_id,
                full_name: self.lookup_name(employee_id).await,
                report_count,
            });
        }
        Ok(top)
    }

    /// A failed name lookup degrades that one entry, not the ranking.
    async fn lookup_name(&self, id: Uuid) -> Option<String> {
        match self
            .store
            .find_by_id::<UserAccount>(USERS_COLLECTION, id.into())
            .await
        {
            Ok(account) => account.map(|a| a.full_name),
            Err(e) => {
                warn!("Dashboard name lookup failed for {}: {}", id, e);
                None
            }
        }
    }
}

/// Count occurrences and keep the TOP_N heaviest. Ties break on the id so the
/// ordering is stable across invocations.
fn rank_ids(ids: impl Iterator<Item = Uuid>) -> Vec<(Uuid, u64)> {
    let mut counts: HashMap<Uuid, u64> = HashMap::new();
    for id in ids {
        *counts.entry(id).or_insert(0) += 1;
    }

    let mut ranked: Vec<(Uuid, u64)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(TOP_N);
    ranked
}
