pub mod configuration;
pub mod dataset;
pub mod error;
pub mod finding;
pub mod key_index;
pub mod normalize;
pub mod reconcile;
pub mod report;
pub mod rules;
pub mod session;

// Re-exports to keep imports short elsewhere
pub use error::DomainError;
