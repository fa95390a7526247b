//! Song Convert Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod config;
pub mod conversion;
pub mod server;

// Re-export commonly used types for convenience
pub use conversion::{ConversionManager, ConversionRequest, InMemoryJobStore, JobStatus, JobStore};
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig};
