// concord-core/src/ports/mod.rs

// What the use cases need from the outside world, without knowing how it is done.

pub mod loader;
pub mod renderer;
pub mod session_store;
pub mod writer;

pub use loader::DatasetLoader;
pub use renderer::{OutputFormat, ReportRenderer};
pub use session_store::SessionStore;
pub use writer::DatasetWriter;
