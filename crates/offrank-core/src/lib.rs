// Library root: re-exports all modules so integration tests and the binary
// crates can access the engine's public API.

pub mod config;
pub mod engine;
pub mod pipeline;
pub mod records;
pub mod report;
pub mod source;
