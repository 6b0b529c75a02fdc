pub mod ac;
pub mod clock;
pub mod error;
pub mod platform;
