pub mod dashboard;
pub mod lifecycle;
pub mod visit;
pub mod wait_time;

pub use dashboard::DashboardService;
pub use lifecycle::AppointmentLifecycleService;
pub use visit::VisitService;
pub use wait_time::{format_wait, WaitTimeService};
