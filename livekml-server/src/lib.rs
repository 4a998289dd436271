//! # livekml-server
//!
//! Streams a live scene to KML viewers that poll over HTTP.
//!
//! ## Architecture
//!
//! ```text
//!  application tasks          KML viewer
//!        │                        │  GET /loader.kml (once)
//!        │ mutate nodes           │  GET /elements.kml (once)
//!        ▼                        │  GET /update.kml?cycle=N (interval)
//!  ┌─────────────────────────────┴───┐
//!  │          livekml-server         │
//!  │  SceneHandle (tokio Mutex)      │
//!  │   ├─ root Container (Node tree) │
//!  │   ├─ SyncCoordinator            │
//!  │   └─ Outbox (redelivery)        │
//!  └─────────────────────────────────┘
//! ```
//!
//! Each update carries the cycle number as a KML cookie. The viewer echoes
//! it on its next poll, which acknowledges the batch; anything newer that
//! is still in flight is sent again.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod demo;
pub mod error;
pub mod http;
pub mod scene;
pub mod server;

pub use config::{Config, ConfigError};
pub use error::ServerError;
pub use scene::{Scene, SceneHandle, Update, UpdateSource};
pub use server::{LiveKmlServer, ServerMetrics};
