pub mod demographics;
pub mod intake;

pub use demographics::DemographicsService;
pub use intake::IntakeService;
