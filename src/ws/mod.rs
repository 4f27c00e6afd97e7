//! WebSocket layer: connection handling, message routing, subscriptions.
//!
//! The WebSocket endpoint at `/ws` streams device events to clients that
//! subscribed to them and answers reading queries.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
