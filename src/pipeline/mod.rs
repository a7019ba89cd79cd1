pub mod driver;
pub mod progress;
pub mod state;
