// libs/appointment-cell/src/services/refs.rs
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_database::store::StoreClient;
use shared_models::ids::EntityId;
use shared_models::records::{ServiceItem, UserAccount};

use crate::models::{Appointment, AppointmentError, AppointmentView};

const USERS_COLLECTION: &str = "users";
const SERVICES_COLLECTION: &str = "services";

/// Turns the loosely-typed identifiers of a request body into validated
/// entity references.
///
/// Required references (patient, service) fail the whole operation with a
/// validation error when malformed, missing, or pointing at nothing — even
/// when the underlying cause is a store-driver failure on a malformed id.
/// The optional employee reference instead degrades to an explicit null.
pub struct ReferenceResolverService {
    store: StoreClient,
}

impl ReferenceResolverService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: StoreClient::new(config),
        }
    }

    /// Required patient reference: must parse and must exist.
    pub async fn resolve_patient(&self, raw: &str) -> Result<UserAccount, AppointmentError> {
        let id = EntityId::parse(raw)
            .map_err(|_| AppointmentError::ValidationError("Invalid patient id".to_string()))?;

        let patient: Option<UserAccount> = self
            .store
            .find_by_id(USERS_COLLECTION, id)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        patient.ok_or_else(|| {
            AppointmentError::ValidationError(format!("Patient {} does not exist", id))
        })
    }

    /// Required service reference: must parse and must exist.
    pub async fn resolve_service(&self, raw: &str) -> Result<ServiceItem, AppointmentError> {
        let id = EntityId::parse(raw)
            .map_err(|_| AppointmentError::ValidationError("Invalid service id".to_string()))?;

        let service: Option<ServiceItem> = self
            .store
            .find_by_id(SERVICES_COLLECTION, id)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        service.ok_or_else(|| {
            AppointmentError::ValidationError(format!("Service {} does not exist", id))
        })
    }

    /// Optional employee reference: absent, empty, malformed, or unresolvable
    /// values all normalize to null. The anomaly is logged, never raised.
    pub async fn resolve_optional_employee(&self, raw: Option<&str>) -> Option<EntityId> {
        let raw = match raw {
            Some(value) if !value.trim().is_empty() => value,
            _ => return None,
        };

        let id = match EntityId::parse(raw) {
            Ok(id) => id,
            Err(_) => {
                warn!("Malformed employee id {:?}, storing null", raw);
                return None;
            }
        };

        match self.store.find_by_id::<UserAccount>(USERS_COLLECTION, id).await {
            Ok(Some(_)) => Some(id),
            Ok(None) => {
                warn!("Employee {} does not exist, storing null", id);
                None
            }
            Err(err) => {
                warn!("Employee lookup for {} failed ({}), storing null", id, err);
                None
            }
        }
    }

    /// Read-time join used for display: embed patient/service/employee
    /// projections. Missing referents embed as null rather than failing.
    pub async fn dereference(&self, appointment: Appointment) -> AppointmentView {
        let patient = self.lookup_user(appointment.patient_id.into()).await;
        let service = self.lookup_service(appointment.service_id.into()).await;
        let employee = match appointment.employee_id {
            Some(id) => self.lookup_user(id.into()).await,
            None => None,
        };

        AppointmentView {
            appointment,
            patient,
            service,
            employee,
        }
    }

    async fn lookup_user(&self, id: EntityId) -> Option<UserAccount> {
        match self.store.find_by_id(USERS_COLLECTION, id).await {
            Ok(found) => found,
            Err(err) => {
                debug!("User projection lookup for {} failed: {}", id, err);
                None
            }
        }
    }

    async fn lookup_service(&self, id: EntityId) -> Option<ServiceItem> {
        match self.store.find_by_id(SERVICES_COLLECTION, id).await {
            Ok(found) => found,
            Err(err) => {
                debug!("Service projection lookup for {} failed: {}", id, err);
                None
            }
        }
    }
}
