#[cfg(feature = "ac")]
pub mod ac;
pub mod core;
pub mod sink;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod world;
