// libs/appointment-cell/src/services/appointments.rs
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use audit_cell::models::ResourceType;
use audit_cell::services::recorder::AuditRecorderService;
use shared_config::AppConfig;
use shared_database::store::StoreClient;
use shared_models::ids::EntityId;

use crate::models::{
    Appointment, AppointmentError, AppointmentPage, AppointmentView, CreateAppointmentRequest,
    UpdateAppointmentRequest,
};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::query::{current_page, total_pages, AppointmentQuery};
use crate::services::refs::ReferenceResolverService;

const APPOINTMENTS_COLLECTION: &str = "appointments";

/// The appointment mutation pipeline: reference resolution, lifecycle
/// defaults, the primary store write, then a best-effort audit append.
///
/// The store gives single-document atomicity only. The primary write always
/// commits before the audit write is attempted, so a failure between the two
/// can leave a mutation unaudited but never an audit entry for a mutation
/// that did not happen. There is no concurrency token on appointments;
/// concurrent updates race under last-write-wins and each still audits.
pub struct AppointmentService {
    store: StoreClient,
    resolver: ReferenceResolverService,
    lifecycle: AppointmentLifecycleService,
    audit: AuditRecorderService,
}

impl AppointmentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: StoreClient::new(config),
            resolver: ReferenceResolverService::new(config),
            lifecycle: AppointmentLifecycleService::new(),
            audit: AuditRecorderService::new(config),
        }
    }

    pub async fn create_appointment(
        &self,
        request: CreateAppointmentRequest,
        actor_id: EntityId,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Creating appointment for patient {:?}", request.patient_id);

        // Required references resolve before anything is written.
        let patient = self.resolver.resolve_patient(&request.patient_id).await?;
        let service = self.resolver.resolve_service(&request.service_id).await?;
        let employee_id = self
            .resolver
            .resolve_optional_employee(request.employee_id.as_deref())
            .await;

        let status = self.lifecycle.initial_status(request.status);
        let payment_status = self.lifecycle.initial_payment_status(request.payment_status);
        let amount = self.lifecycle.derive_amount(request.amount, &service)?;

        let now = Utc::now();
        let document = json!({
            "id": Uuid::new_v4(),
            "patient_id": patient.id,
            "service_id": service.id,
            "employee_id": employee_id,
            "scheduled_at": request.scheduled_at.to_rfc3339(),
            "status": status.to_string(),
            "payment_status": payment_status.to_string(),
            "amount": amount,
            // Explicit nulls so later partial updates can clear the fields.
            "location": request.location,
            "notes": request.notes,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339(),
        });

        let appointment: Appointment = self
            .store
            .insert(APPOINTMENTS_COLLECTION, document)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let snapshot = snapshot_of(&appointment)?;
        self.audit
            .record_create(
                actor_id,
                ResourceType::Appointment,
                appointment.id.into(),
                &snapshot,
            )
            .await;

        info!("Appointment {} created by {}", appointment.id, actor_id);
        Ok(appointment)
    }

    /// Fetch one appointment with its references dereferenced for display.
    pub async fn get_appointment(
        &self,
        appointment_id: EntityId,
    ) -> Result<AppointmentView, AppointmentError> {
        let appointment: Appointment = self
            .store
            .find_by_id(APPOINTMENTS_COLLECTION, appointment_id)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?
            .ok_or(AppointmentError::NotFound)?;

        Ok(self.resolver.dereference(appointment).await)
    }

    pub async fn list_appointments(
        &self,
        query: AppointmentQuery,
    ) -> Result<AppointmentPage, AppointmentError> {
        let path = query.to_path(APPOINTMENTS_COLLECTION, "scheduled_at");

        let (appointments, total_count): (Vec<Appointment>, u64) = self
            .store
            .fetch_with_count(&path)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Ok(AppointmentPage {
            appointments,
            total_count,
            total_pages: total_pages(total_count, query.limit()),
            current_page: current_page(query.skip(), query.limit()),
        })
    }

    pub async fn update_appointment(
        &self,
        appointment_id: EntityId,
        request: UpdateAppointmentRequest,
        actor_id: EntityId,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Updating appointment {}", appointment_id);

        let current: Appointment = self
            .store
            .find_by_id(APPOINTMENTS_COLLECTION, appointment_id)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?
            .ok_or(AppointmentError::NotFound)?;

        let mut patch = serde_json::Map::new();

        if let Some(new_status) = request.status {
            self.lifecycle
                .validate_status_transition(current.status, new_status)?;
            patch.insert("status".to_string(), json!(new_status.to_string()));
        }

        if let Some(new_payment) = request.payment_status {
            self.lifecycle
                .validate_payment_transition(current.payment_status, new_payment)?;
            patch.insert("payment_status".to_string(), json!(new_payment.to_string()));
        }

        if let Some(amount) = request.amount {
            AppointmentLifecycleService::check_amount(amount)?;
            patch.insert("amount".to_string(), json!(amount));
        }

        if let Some(scheduled_at) = request.scheduled_at {
            patch.insert("scheduled_at".to_string(), json!(scheduled_at.to_rfc3339()));
        }

        // A supplied employee id is resolved or coerced to null; omitted
        // leaves the stored value untouched.
        if let Some(raw_employee) = request.employee_id.as_deref() {
            let employee_id = self
                .resolver
                .resolve_optional_employee(Some(raw_employee))
                .await;
            patch.insert("employee_id".to_string(), json!(employee_id));
        }

        if let Some(location) = request.location {
            patch.insert("location".to_string(), json!(location));
        }
        if let Some(notes) = request.notes {
            patch.insert("notes".to_string(), json!(notes));
        }

        patch.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let updated: Appointment = self
            .store
            .patch(APPOINTMENTS_COLLECTION, appointment_id, Value::Object(patch))
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?
            .ok_or(AppointmentError::NotFound)?;

        // One audit entry per update call, even for a no-op repeat.
        let before = snapshot_of(&current)?;
        let after = snapshot_of(&updated)?;
        self.audit
            .record_update(
                actor_id,
                ResourceType::Appointment,
                appointment_id,
                &before,
                &after,
            )
            .await;

        info!("Appointment {} updated by {}", appointment_id, actor_id);
        Ok(updated)
    }

    /// Hard delete; no tombstone remains. The audit entry captures the
    /// entity exactly as it existed before removal and becomes its only
    /// remaining trace.
    pub async fn delete_appointment(
        &self,
        appointment_id: EntityId,
        actor_id: EntityId,
    ) -> Result<(), AppointmentError> {
        debug!("Deleting appointment {}", appointment_id);

        let removed: Option<Value> = self
            .store
            .delete_returning(APPOINTMENTS_COLLECTION, appointment_id)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        // A miss appends nothing to the audit trail.
        let removed = removed.ok_or(AppointmentError::NotFound)?;

        self.audit
            .record_delete(actor_id, ResourceType::Appointment, appointment_id, &removed)
            .await;

        info!("Appointment {} deleted by {}", appointment_id, actor_id);
        Ok(())
    }
}

fn snapshot_of(appointment: &Appointment) -> Result<Value, AppointmentError> {
    serde_json::to_value(appointment)
        .map_err(|e| AppointmentError::DatabaseError(format!("Snapshot failed: {}", e)))
}
