//! Data Transfer Objects for REST request/response serialization.
//!
//! Identifiers are plain UUIDs on the wire; snapshots are serialized
//! with the device's own field names.

pub mod control_dto;
pub mod device_dto;

pub use control_dto::*;
pub use device_dto::*;
