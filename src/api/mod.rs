//! API Module
//!
//! HTTP handlers and routing for the roads proxy.
//!
//! # Endpoints
//! - `GET /api/roads` - Endpoint description
//! - `POST /api/roads` - Cached Overpass query
//! - `GET /api/roads/cache/stats` - Cache statistics
//! - `POST /api/roads/cache/clear` - Drop every cached region
//! - `POST /api/roads/warmup` - Pre-load regions
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
