//! # Sherpa Studio Common Library
//!
//! Shared code for the Sherpa Studio dashboard including:
//! - Wire types for the Sherpa annotation API
//! - Error taxonomy
//! - Configuration loading
//! - The span-merge highlighter

pub mod config;
pub mod error;
pub mod highlight;
pub mod models;

pub use error::{Error, Result};
pub use highlight::{highlight, Segment};
