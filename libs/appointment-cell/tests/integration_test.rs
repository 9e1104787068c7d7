use assert_matches::assert_matches;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::{
    AppointmentError, AppointmentStatus, CreateAppointmentRequest, UpdateAppointmentRequest,
};
use appointment_cell::services::appointments::AppointmentService;
use appointment_cell::services::query::AppointmentQuery;
use shared_config::AppConfig;
use shared_models::ids::EntityId;
use shared_utils::test_utils::MockStoreResponses;

fn config_for(mock_server: &MockServer) -> AppConfig {
    AppConfig {
        store_url: mock_server.uri(),
        store_service_key: "test-service-key".to_string(),
    }
}

fn actor() -> EntityId {
    Uuid::new_v4().into()
}

async fn mount_patient(mock_server: &MockServer, patient_id: &str) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{}", patient_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::user_row(patient_id, "Test Patient", "user")
        ])))
        .mount(mock_server)
        .await;
}

async fn mount_service(mock_server: &MockServer, service_id: &str, price: f64) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/services"))
        .and(query_param("id", format!("eq.{}", service_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::service_row(service_id, "Complete Blood Count", price)
        ])))
        .mount(mock_server)
        .await;
}

async fn mount_audit_sink(mock_server: &MockServer, expected_writes: u64) {
    Mock::given(method("POST"))
        .and(path("/rest/v1/audit_logs"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{}])))
        .expect(expected_writes)
        .mount(mock_server)
        .await;
}

fn create_request(patient_id: &str, service_id: &str) -> CreateAppointmentRequest {
    CreateAppointmentRequest {
        patient_id: patient_id.to_string(),
        service_id: service_id.to_string(),
        employee_id: None,
        scheduled_at: Utc::now(),
        status: None,
        payment_status: None,
        amount: None,
        location: None,
        notes: None,
    }
}

#[tokio::test]
async fn create_derives_amount_from_service_price() {
    let mock_server = MockServer::start().await;
    let patient_id = Uuid::new_v4().to_string();
    let service_id = Uuid::new_v4().to_string();
    let appointment_id = Uuid::new_v4().to_string();

    mount_patient(&mock_server, &patient_id).await;
    mount_service(&mock_server, &service_id, 1200.0).await;
    mount_audit_sink(&mock_server, 1).await;

    // The insert only matches when the caller-omitted amount arrives as the
    // service price with lifecycle defaults applied.
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(body_partial_json(json!({
            "amount": 1200.0,
            "status": "scheduled",
            "payment_status": "pending"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockStoreResponses::appointment_row(
                &appointment_id,
                &patient_id,
                &service_id,
                "scheduled",
                1200.0
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = AppointmentService::new(&config_for(&mock_server));
    let created = service
        .create_appointment(create_request(&patient_id, &service_id), actor())
        .await
        .unwrap();

    assert_eq!(created.amount, 1200.0);
    assert_eq!(created.status, AppointmentStatus::Scheduled);
}

#[tokio::test]
async fn create_coerces_blank_employee_to_null() {
    let mock_server = MockServer::start().await;
    let patient_id = Uuid::new_v4().to_string();
    let service_id = Uuid::new_v4().to_string();
    let appointment_id = Uuid::new_v4().to_string();

    mount_patient(&mock_server, &patient_id).await;
    mount_service(&mock_server, &service_id, 450.0).await;
    mount_audit_sink(&mock_server, 1).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(body_partial_json(json!({ "employee_id": null })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockStoreResponses::appointment_row(
                &appointment_id,
                &patient_id,
                &service_id,
                "scheduled",
                450.0
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut request = create_request(&patient_id, &service_id);
    request.employee_id = Some("   ".to_string());

    let service = AppointmentService::new(&config_for(&mock_server));
    let created = service.create_appointment(request, actor()).await.unwrap();

    assert!(created.employee_id.is_none());
}

#[tokio::test]
async fn create_coerces_unknown_employee_to_null() {
    let mock_server = MockServer::start().await;
    let patient_id = Uuid::new_v4().to_string();
    let service_id = Uuid::new_v4().to_string();
    let employee_id = Uuid::new_v4().to_string();
    let appointment_id = Uuid::new_v4().to_string();

    mount_patient(&mock_server, &patient_id).await;
    mount_service(&mock_server, &service_id, 450.0).await;
    mount_audit_sink(&mock_server, 1).await;

    // The employee lookup misses; the reference degrades instead of failing.
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{}", employee_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(body_partial_json(json!({ "employee_id": null })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockStoreResponses::appointment_row(
                &appointment_id,
                &patient_id,
                &service_id,
                "scheduled",
                450.0
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut request = create_request(&patient_id, &service_id);
    request.employee_id = Some(employee_id);

    let service = AppointmentService::new(&config_for(&mock_server));
    let created = service.create_appointment(request, actor()).await.unwrap();

    assert!(created.employee_id.is_none());
}

#[tokio::test]
async fn create_rejects_unknown_service_before_any_write() {
    let mock_server = MockServer::start().await;
    let patient_id = Uuid::new_v4().to_string();
    let service_id = Uuid::new_v4().to_string();

    mount_patient(&mock_server, &patient_id).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/services"))
        .and(query_param("id", format!("eq.{}", service_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{}])))
        .expect(0)
        .mount(&mock_server)
        .await;
    mount_audit_sink(&mock_server, 0).await;

    let service = AppointmentService::new(&config_for(&mock_server));
    let result = service
        .create_appointment(create_request(&patient_id, &service_id), actor())
        .await;

    assert_matches!(result, Err(AppointmentError::ValidationError(_)));
}

#[tokio::test]
async fn update_appends_one_audit_entry_naming_changed_fields() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4().to_string();
    let service_id = Uuid::new_v4().to_string();
    let id_str = appointment_id.to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_row(&id_str, &patient_id, &service_id, "scheduled", 500.0)
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_row(&id_str, &patient_id, &service_id, "completed", 500.0)
        ])))
        .mount(&mock_server)
        .await;

    // Exactly one append, carrying just the fields that actually differ.
    Mock::given(method("POST"))
        .and(path("/rest/v1/audit_logs"))
        .and(body_partial_json(json!({
            "action": "update",
            "resource_type": "appointment",
            "resource_id": id_str,
            "changes": ["status"]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{}])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = UpdateAppointmentRequest {
        status: Some(AppointmentStatus::Completed),
        ..Default::default()
    };

    let service = AppointmentService::new(&config_for(&mock_server));
    let updated = service
        .update_appointment(appointment_id.into(), request, actor())
        .await
        .unwrap();

    assert_eq!(updated.status, AppointmentStatus::Completed);
}

#[tokio::test]
async fn repeated_update_audits_each_call() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4().to_string();
    let service_id = Uuid::new_v4().to_string();
    let id_str = appointment_id.to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_row(&id_str, &patient_id, &service_id, "completed", 500.0)
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_row(&id_str, &patient_id, &service_id, "completed", 500.0)
        ])))
        .mount(&mock_server)
        .await;

    // A no-op repeat still appends; the trail records calls, not deltas.
    mount_audit_sink(&mock_server, 2).await;

    let request = UpdateAppointmentRequest {
        status: Some(AppointmentStatus::Completed),
        ..Default::default()
    };

    let service = AppointmentService::new(&config_for(&mock_server));
    service
        .update_appointment(appointment_id.into(), request.clone(), actor())
        .await
        .unwrap();
    service
        .update_appointment(appointment_id.into(), request, actor())
        .await
        .unwrap();
}

#[tokio::test]
async fn cancelled_appointment_can_be_completed() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4().to_string();
    let service_id = Uuid::new_v4().to_string();
    let id_str = appointment_id.to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_row(&id_str, &patient_id, &service_id, "cancelled", 500.0)
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_row(&id_str, &patient_id, &service_id, "completed", 500.0)
        ])))
        .mount(&mock_server)
        .await;

    mount_audit_sink(&mock_server, 1).await;

    let request = UpdateAppointmentRequest {
        status: Some(AppointmentStatus::Completed),
        ..Default::default()
    };

    let service = AppointmentService::new(&config_for(&mock_server));
    let updated = service
        .update_appointment(appointment_id.into(), request, actor())
        .await
        .unwrap();

    assert_eq!(updated.status, AppointmentStatus::Completed);
}

#[tokio::test]
async fn delete_miss_is_not_found_and_leaves_no_audit_entry() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    mount_audit_sink(&mock_server, 0).await;

    let service = AppointmentService::new(&config_for(&mock_server));
    let result = service
        .delete_appointment(appointment_id.into(), actor())
        .await;

    assert_matches!(result, Err(AppointmentError::NotFound));
}

#[tokio::test]
async fn delete_hit_audits_the_removed_row() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4().to_string();
    let service_id = Uuid::new_v4().to_string();
    let id_str = appointment_id.to_string();

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_row(&id_str, &patient_id, &service_id, "scheduled", 500.0)
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/audit_logs"))
        .and(body_partial_json(json!({
            "action": "delete",
            "resource_id": id_str,
            "after": null
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{}])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = AppointmentService::new(&config_for(&mock_server));
    service
        .delete_appointment(appointment_id.into(), actor())
        .await
        .unwrap();
}

#[tokio::test]
async fn list_reports_store_exact_totals() {
    let mock_server = MockServer::start().await;
    let patient_id = Uuid::new_v4().to_string();
    let service_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("order", "scheduled_at.desc"))
        .and(query_param("limit", "10"))
        .and(query_param("offset", "0"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-range", "0-1/42")
                .set_body_json(json!([
                    MockStoreResponses::appointment_row(
                        &Uuid::new_v4().to_string(),
                        &patient_id,
                        &service_id,
                        "scheduled",
                        500.0
                    ),
                    MockStoreResponses::appointment_row(
                        &Uuid::new_v4().to_string(),
                        &patient_id,
                        &service_id,
                        "completed",
                        750.0
                    )
                ])),
        )
        .mount(&mock_server)
        .await;

    let service = AppointmentService::new(&config_for(&mock_server));
    let page = service
        .list_appointments(AppointmentQuery::default())
        .await
        .unwrap();

    assert_eq!(page.appointments.len(), 2);
    assert_eq!(page.total_count, 42);
    assert_eq!(page.total_pages, 5);
    assert_eq!(page.current_page, 1);
}

/// Matches only when the JSON request body has no such top-level key,
/// which `body_partial_json` cannot express.
struct BodyLacksKey(&'static str);

impl wiremock::Match for BodyLacksKey {
    fn matches(&self, request: &wiremock::Request) -> bool {
        serde_json::from_slice::<serde_json::Value>(&request.body)
            .map(|body| body.get(self.0).is_none())
            .unwrap_or(false)
    }
}

#[tokio::test]
async fn explicit_null_clears_location_in_the_patch() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4().to_string();
    let service_id = Uuid::new_v4().to_string();
    let id_str = appointment_id.to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_row(&id_str, &patient_id, &service_id, "scheduled", 500.0)
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .and(body_partial_json(json!({ "location": null })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_row(&id_str, &patient_id, &service_id, "scheduled", 500.0)
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    mount_audit_sink(&mock_server, 1).await;

    // Deserialize from wire JSON so the null-vs-omitted distinction is the
    // one the boundary actually sees.
    let request: UpdateAppointmentRequest =
        serde_json::from_value(json!({ "location": null })).unwrap();

    let service = AppointmentService::new(&config_for(&mock_server));
    service
        .update_appointment(appointment_id.into(), request, actor())
        .await
        .unwrap();
}

#[tokio::test]
async fn omitted_location_never_reaches_the_patch() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4().to_string();
    let service_id = Uuid::new_v4().to_string();
    let id_str = appointment_id.to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_row(&id_str, &patient_id, &service_id, "scheduled", 500.0)
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .and(body_partial_json(json!({ "notes": "fasting sample" })))
        .and(BodyLacksKey("location"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_row(&id_str, &patient_id, &service_id, "scheduled", 500.0)
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    mount_audit_sink(&mock_server, 1).await;

    let request: UpdateAppointmentRequest =
        serde_json::from_value(json!({ "notes": "fasting sample" })).unwrap();

    let service = AppointmentService::new(&config_for(&mock_server));
    service
        .update_appointment(appointment_id.into(), request, actor())
        .await
        .unwrap();
}

#[tokio::test]
async fn list_without_a_count_header_falls_back_to_the_page_length() {
    let mock_server = MockServer::start().await;
    let patient_id = Uuid::new_v4().to_string();
    let service_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_row(
                &Uuid::new_v4().to_string(),
                &patient_id,
                &service_id,
                "scheduled",
                500.0
            )
        ])))
        .mount(&mock_server)
        .await;

    let service = AppointmentService::new(&config_for(&mock_server));
    let page = service
        .list_appointments(AppointmentQuery::default())
        .await
        .unwrap();

    assert_eq!(page.total_count, 1);
    assert_eq!(page.total_pages, 1);
}

#[tokio::test]
async fn list_beyond_the_last_page_is_empty_not_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("offset", "100"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-range", "*/42")
                .set_body_json(json!([])),
        )
        .mount(&mock_server)
        .await;

    let query = AppointmentQuery {
        skip: Some(100),
        ..Default::default()
    };

    let service = AppointmentService::new(&config_for(&mock_server));
    let page = service.list_appointments(query).await.unwrap();

    assert!(page.appointments.is_empty());
    assert_eq!(page.total_count, 42);
    assert_eq!(page.current_page, 11);
}
