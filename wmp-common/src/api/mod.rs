//! API module for shared HTTP API functionality
//!
//! This module contains ONLY:
//! - Pure functions (no HTTP framework dependencies)
//! - Shared types
//!
//! Services wrap these with framework-specific extractors (Axum, etc.).

pub mod actor;
pub mod types;

pub use actor::{Actor, Role, ID_HEADER, ROLE_HEADER};
pub use types::ApiEnvelope;
