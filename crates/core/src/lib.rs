#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod time;

pub use error::SessionError;
pub use time::Clock;
