//! Outbound service clients

pub mod sherpa_client;

pub use sherpa_client::{Artifact, SherpaClient};
