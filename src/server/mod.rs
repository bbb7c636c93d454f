//! REST API server for the tag registry.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────┐                            ┌──────────────────────┐
//! │   API Server Thread     │    Arc<Registry>           │   Scanner Thread     │
//! │   (rouille HTTP)        │ ◀──── lookup/register ───▶ │   (device reads)     │
//! │                         │                            │                      │
//! │  GET  /api/latest       │    Arc<LatestScan>         │                      │
//! │  POST /api/register     │ ◀──── read ──────── write ─│  publish(scanned)    │
//! └─────────────────────────┘                            └──────────────────────┘
//! ```
//!
//! - **rouille** - sync HTTP server (simpler than async axum/tokio)
//! - **Registry** - shared, internally locked; persisted on every registration
//! - **LatestScan** - whole-value slot written by the scanner only
//!
//! # Endpoints
//!
//! | Method     | Path                | Description                                   |
//! |------------|---------------------|-----------------------------------------------|
//! | GET        | `/api/latest`       | Last scanned tag (registered or `Unknown`)    |
//! | GET        | `/api/registry`     | All registered tags                           |
//! | POST / PUT | `/api/register`     | Register or overwrite a tag (form/JSON/query) |
//! | GET        | `/api/tag-classes`  | Registrable action kinds                      |
//! | GET        | `/api/health`       | Health check + scanner state                  |

mod api;

pub use api::{ApiError, ApiServer, ApiState, ServerHandle};
