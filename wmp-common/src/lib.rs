//! # WMP Common Library
//!
//! Shared code for WMP (waste management platform) services including:
//! - Database schema and row models
//! - Event types (WmpEvent enum) and the EventBus
//! - API envelope and caller identity types
//! - Configuration loading
//! - The common error taxonomy

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod events;

pub use error::{Error, Result};
