use chrono::Duration;

use shared_database::Database;

use crate::models::VisitError;

/// Formats a wait as `H:MM:SS`, or `N day(s), H:MM:SS` past a day, dropping
/// fractions of a second.
pub fn format_wait(wait: Duration) -> String {
    let total = wait.num_seconds();
    let (sign, total) = if total < 0 { ("-", -total) } else { ("", total) };

    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    let clock = format!("{}:{:02}:{:02}", hours, minutes, seconds);
    match days {
        0 => format!("{}{}", sign, clock),
        1 => format!("{}1 day, {}", sign, clock),
        n => format!("{}{} days, {}", sign, n, clock),
    }
}

pub struct WaitTimeService<'a> {
    store: &'a Database,
}

impl<'a> WaitTimeService<'a> {
    pub fn new(store: &'a Database) -> Self {
        Self { store }
    }

    /// `None` when the doctor has no in-session or completed appointment with a recorded wait.
    pub fn average_wait_time(&self, doctor_id: i64) -> Result<Option<String>, VisitError> {
        Ok(self.store.average_wait(doctor_id)?.map(format_wait))
    }
}
