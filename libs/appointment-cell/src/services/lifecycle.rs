use tracing::{debug, warn};

use shared_models::status::AppointmentStatus;

use crate::models::VisitError;

/// Local status changes made by the kiosk. Refreshes from the remote API bypass this.
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), VisitError> {
        debug!("Validating status transition from {:?} to {:?}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {:?} -> {:?}", current_status, new_status);
            return Err(VisitError::InvalidStatusTransition { from: current_status, to: new_status });
        }

        Ok(())
    }

    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Scheduled => vec![AppointmentStatus::Arrived],
            AppointmentStatus::Arrived => vec![AppointmentStatus::InSession],
            AppointmentStatus::InSession => vec![AppointmentStatus::Complete],
            // Terminal states - no transitions allowed
            AppointmentStatus::Complete => vec![],
            AppointmentStatus::Cancelled => vec![],
            AppointmentStatus::NoShow => vec![],
        }
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_forward_path_is_allowed() {
        let lifecycle = AppointmentLifecycleService::new();

        assert!(lifecycle.validate_status_transition(AppointmentStatus::Scheduled, AppointmentStatus::Arrived).is_ok());
        assert!(lifecycle.validate_status_transition(AppointmentStatus::Arrived, AppointmentStatus::InSession).is_ok());
        assert!(lifecycle.validate_status_transition(AppointmentStatus::InSession, AppointmentStatus::Complete).is_ok());
    }

    #[test]
    fn test_skips_and_reversals_are_rejected() {
        let lifecycle = AppointmentLifecycleService::new();

        assert_matches!(
            lifecycle.validate_status_transition(AppointmentStatus::Scheduled, AppointmentStatus::Complete),
            Err(VisitError::InvalidStatusTransition { from: AppointmentStatus::Scheduled, to: AppointmentStatus::Complete })
        );
        assert!(lifecycle.validate_status_transition(AppointmentStatus::InSession, AppointmentStatus::Arrived).is_err());
        assert!(lifecycle.validate_status_transition(AppointmentStatus::Arrived, AppointmentStatus::Arrived).is_err());
        assert!(lifecycle.get_valid_transitions(AppointmentStatus::Cancelled).is_empty());
    }
}
