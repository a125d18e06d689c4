pub mod poll;

pub use poll::ArrivalPollService;
