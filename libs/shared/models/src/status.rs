use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Appointment state as tracked by the kiosk. Stored and sent upstream as its display string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppointmentStatus {
    Scheduled,
    Arrived,
    InSession,
    Complete,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "",
            AppointmentStatus::Arrived => "Arrived",
            AppointmentStatus::InSession => "In Session",
            AppointmentStatus::Complete => "Complete",
            AppointmentStatus::Cancelled => "Cancelled",
            AppointmentStatus::NoShow => "No Show",
        }
    }

    /// Maps a status string from the remote API onto the kiosk states.
    /// Unknown strings are treated as still scheduled.
    pub fn from_remote(raw: &str) -> Self {
        match raw.trim() {
            "Arrived" | "Checked In" => AppointmentStatus::Arrived,
            "In Session" | "In Room" => AppointmentStatus::InSession,
            "Complete" => AppointmentStatus::Complete,
            "Cancelled" => AppointmentStatus::Cancelled,
            "No Show" => AppointmentStatus::NoShow,
            _ => AppointmentStatus::Scheduled,
        }
    }

    /// Counted towards the waiting-room queue.
    pub fn is_queued(&self) -> bool {
        matches!(self, AppointmentStatus::Arrived | AppointmentStatus::InSession)
    }

    /// Contributes a waited duration to the wait-time average.
    pub fn counts_towards_wait(&self) -> bool {
        matches!(self, AppointmentStatus::InSession | AppointmentStatus::Complete)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "Scheduled"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

impl Serialize for AppointmentStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AppointmentStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map(|s| AppointmentStatus::from_remote(&s)).unwrap_or(AppointmentStatus::Scheduled))
    }
}
