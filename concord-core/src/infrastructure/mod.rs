// concord-core/src/infrastructure/mod.rs

pub mod adapters;
pub mod config;
pub mod error;
pub mod fs;
pub mod render;
pub mod session_store;

pub use adapters::{FileDatasetLoader, FileDatasetWriter};
pub use render::renderer_for;
pub use session_store::FileSessionStore;
