//! # sonic-bridge
//!
//! State synchronizer and webhook bridge for Sonic smart water valves.
//!
//! Each configured device gets a [`service::Coordinator`] that polls the
//! device's five local API endpoints concurrently and merges them into one
//! immutable [`domain::Snapshot`]. Push events delivered to the webhook
//! endpoint patch that snapshot in place, and field subscribers are told
//! exactly which values changed.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)        Sonic device (webhook push)
//!     │                                 │
//!     ├── REST Handlers (api/)          ├── Webhook handler (api/)
//!     ├── WS Handler (ws/)              │
//!     │                                 │
//!     ├── DeviceService (service/) ─────┘
//!     ├── EventBus (domain/)
//!     │
//!     ├── DeviceRegistry → Coordinator → WebhookRouter (service/)
//!     │
//!     └── DeviceClient (client/) ── Sonic local API
//! ```

pub mod api;
pub mod app_state;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod ws;
