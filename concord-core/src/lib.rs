// concord-core/src/lib.rs

// 1. Mandatory documentation for production code
#![allow(missing_docs)]

// 2. Memory safety
#![deny(unsafe_code)]
// 3. Robustness
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
// 4. Performance
#![warn(clippy::perf)]

// --- HEXAGONAL MODULES ---

// 1. Ports (Interfaces / Traits)
// Contracts with the outside world: dataset loading, report rendering, session storage.
pub mod ports;

// 2. Domain (Business core)
// Datasets, rules, reconciliation, session ledger, report aggregation.
// Depends on NOTHING else (neither infra nor app).
pub mod domain;

// 3. Infrastructure (Adapters)
// DuckDB and spreadsheet loaders, config files, renderers, session files.
// Depends on the Domain and the Ports.
pub mod infrastructure;

// 4. Application (Use Cases)
// One use case per command (compare, merge, validate, report, preview, status, clear).
// Depends on the Domain, the Infra and the Ports.
pub mod application;

// --- GLOBAL ERROR HANDLING ---
pub mod error;

// --- RE-EXPORTS (FACADE) ---
// use concord_core::ConcordError;
pub use error::ConcordError;
