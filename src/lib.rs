pub mod aggregation;
pub mod app;
pub mod cascade;
pub mod config;
pub mod db;
pub mod error;
pub mod ident;
pub mod logging;
pub mod model;
pub mod resort;
pub mod runtime_paths;
pub mod services;
pub mod store;

pub type Result<T> = std::result::Result<T, error::PlanboardError>;

pub use app::Planboard;
pub use error::PlanboardError;
pub use ident::ObjectRef;

/// Crate version with the git revision it was built from.
pub fn build_version() -> &'static str {
    concat!(env!("CARGO_PKG_VERSION"), " (", env!("PLANBOARD_GIT_SHA"), ")")
}
