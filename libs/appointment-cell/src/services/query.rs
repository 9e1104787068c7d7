// libs/appointment-cell/src/services/query.rs
use chrono::{DateTime, Utc};
use serde::Deserialize;

use shared_models::ids::EntityId;

use crate::models::AppointmentStatus;

pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Conjunctive read filter built from optional request parameters, with
/// offset pagination over a fixed descending date sort. No caller-specified
/// sort field exists at this level, and the server page order is
/// authoritative; nothing re-sorts a page after it is cut.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentQuery {
    pub status: Option<AppointmentStatus>,
    pub user_id: Option<EntityId>,
    pub employee_id: Option<EntityId>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub limit: Option<u64>,
    pub skip: Option<u64>,
}

impl AppointmentQuery {
    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).max(1)
    }

    pub fn skip(&self) -> u64 {
        self.skip.unwrap_or(0)
    }

    /// Compose the store read path: exact-match filters, an inclusive date
    /// range on `date_field`, fixed `date_field.desc` ordering, limit/offset.
    pub fn to_path(&self, collection: &str, date_field: &str) -> String {
        let mut query_parts = Vec::new();

        if let Some(status) = self.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some(user_id) = self.user_id {
            query_parts.push(format!("patient_id=eq.{}", user_id));
        }
        if let Some(employee_id) = self.employee_id {
            query_parts.push(format!("employee_id=eq.{}", employee_id));
        }
        if let Some(from_date) = self.from_date {
            let encoded = urlencoding::encode(&from_date.to_rfc3339()).into_owned();
            query_parts.push(format!("{}=gte.{}", date_field, encoded));
        }
        if let Some(to_date) = self.to_date {
            let encoded = urlencoding::encode(&to_date.to_rfc3339()).into_owned();
            query_parts.push(format!("{}=lte.{}", date_field, encoded));
        }

        query_parts.push(format!("order={}.desc", date_field));
        query_parts.push(format!("limit={}", self.limit()));
        query_parts.push(format!("offset={}", self.skip()));

        format!("/rest/v1/{}?{}", collection, query_parts.join("&"))
    }
}

pub fn total_pages(total_count: u64, limit: u64) -> u64 {
    total_count.div_ceil(limit.max(1))
}

pub fn current_page(skip: u64, limit: u64) -> u64 {
    skip / limit.max(1) + 1
}
