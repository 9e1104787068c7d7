use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub store_url: String,
    pub store_service_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            store_url: "http://localhost:54321".to_string(),
            store_service_key: "test-service-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            store_url: self.store_url.clone(),
            store_service_key: self.store_service_key.clone(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn employee(email: &str) -> Self {
        Self::new(email, "employee")
    }

    pub fn regular(email: &str) -> Self {
        Self::new(email, "user")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
        }
    }
}

/// Canned store rows for wiremock-backed tests.
pub struct MockStoreResponses;

impl MockStoreResponses {
    pub fn user_row(id: &str, full_name: &str, role: &str) -> serde_json::Value {
        json!({
            "id": id,
            "full_name": full_name,
            "email": format!("{}@example.com", role),
            "phone": "+10000000000",
            "status": "active",
            "referral_points": 0,
            "role": role,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn service_row(id: &str, name: &str, price: f64) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "price": price,
            "department_id": Uuid::new_v4().to_string(),
            "duration_minutes": 30,
            "is_active": true,
            "home_collection": false
        })
    }

    pub fn appointment_row(
        id: &str,
        patient_id: &str,
        service_id: &str,
        status: &str,
        amount: f64,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "patient_id": patient_id,
            "service_id": service_id,
            "employee_id": null,
            "scheduled_at": "2024-01-10T09:00:00Z",
            "status": status,
            "payment_status": "pending",
            "amount": amount,
            "location": null,
            "notes": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn report_row(id: &str, patient_id: &str, status: &str) -> serde_json::Value {
        json!({
            "id": id,
            "patient_id": patient_id,
            "appointment_id": null,
            "employee_id": null,
            "test_type": "cbc",
            "test_date": "2024-01-12T08:00:00Z",
            "status": status,
            "uploaded_at": "2024-01-12T10:00:00Z"
        })
    }
}
