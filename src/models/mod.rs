//! Request and Response models for the roads proxy API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{RoadsRequest, WarmupRequest, WarmupTargetRequest};
pub use responses::{
    CacheStatsResponse, ClearResponse, ErrorResponse, HealthResponse, RoadsInfoResponse,
    WarmupResponse,
};
