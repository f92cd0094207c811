//! Core module - shared infrastructure for Newsroom
//!
//! This module contains foundational types, configuration, and error handling
//! used throughout the application.

pub mod config;
pub mod error;
pub mod text;
pub mod types;

pub use config::Config;
pub use error::{AdapterError, FailureKind, NewsroomError, Result};
pub use types::*;
