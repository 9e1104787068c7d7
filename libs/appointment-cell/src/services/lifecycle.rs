// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use shared_models::records::ServiceItem;

use crate::models::{AppointmentError, AppointmentStatus, PaymentStatus};

/// Owns the two lifecycle dimensions of an appointment and the default-value
/// derivation applied at creation.
///
/// Transition policy: both `status` and `payment_status` accept any target
/// value from any current value. The permissiveness is deliberate back-office
/// behavior (an admin correcting a wrongly cancelled appointment must be able
/// to mark it completed); suspicious transitions are logged, not blocked.
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    pub fn initial_status(&self, requested: Option<AppointmentStatus>) -> AppointmentStatus {
        requested.unwrap_or(AppointmentStatus::Scheduled)
    }

    pub fn initial_payment_status(&self, requested: Option<PaymentStatus>) -> PaymentStatus {
        requested.unwrap_or(PaymentStatus::Pending)
    }

    /// A caller-supplied amount wins; otherwise the amount is derived from
    /// the resolved service's price. Negative amounts are rejected before
    /// any write.
    pub fn derive_amount(
        &self,
        requested: Option<f64>,
        service: &ServiceItem,
    ) -> Result<f64, AppointmentError> {
        let amount = requested.unwrap_or(service.price);
        Self::check_amount(amount)?;
        Ok(amount)
    }

    pub fn check_amount(amount: f64) -> Result<(), AppointmentError> {
        if amount < 0.0 || !amount.is_finite() {
            return Err(AppointmentError::ValidationError(
                "Amount must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }

    pub fn validate_status_transition(
        &self,
        current: AppointmentStatus,
        new: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        if current != new && Self::is_terminal(current) {
            warn!("Reopening appointment from terminal status {} to {}", current, new);
        } else {
            debug!("Status transition {} -> {}", current, new);
        }
        Ok(())
    }

    pub fn validate_payment_transition(
        &self,
        current: PaymentStatus,
        new: PaymentStatus,
    ) -> Result<(), AppointmentError> {
        if current == PaymentStatus::Refunded && new != PaymentStatus::Refunded {
            warn!("Payment status leaving refunded state for {}", new);
        } else {
            debug!("Payment transition {} -> {}", current, new);
        }
        Ok(())
    }

    fn is_terminal(status: AppointmentStatus) -> bool {
        matches!(
            status,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}
