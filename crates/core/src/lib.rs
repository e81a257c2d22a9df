#![forbid(unsafe_code)]

pub mod aggregate;
pub mod day;
pub mod error;
pub mod exam;
pub mod model;
pub mod report;
pub mod state;
pub mod streak;
pub mod time;
pub mod timer;

pub use error::Error;
pub use time::Clock;
