pub mod builder;
pub mod cache;
pub mod catalog;
pub mod compiler;
pub mod engine;
pub mod error;
pub mod grant;
pub mod matcher;
pub mod principal;
pub mod resolver;

pub use builder::{Builder, ClassBuilder};
pub use catalog::Catalog;
pub use engine::Engine;
pub use principal::{Context, Principal, Snapshot};
