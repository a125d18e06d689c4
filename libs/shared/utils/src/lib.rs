pub mod clock;
pub mod extractor;
pub mod jwt;
pub mod seal;
pub mod state;
pub mod test_utils;
