// concord-core/src/infrastructure/config/mod.rs

pub mod mapping;
pub mod project;
pub mod rules;

pub use crate::domain::configuration::ProjectConfig;
pub use mapping::{load_column_map, parse_rename};
pub use project::{load_fragment, load_project_config};
pub use rules::load_rule_set;
