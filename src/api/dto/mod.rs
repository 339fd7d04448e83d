//! Data Transfer Objects for REST request/response serialization.
//!
//! Identifiers cross the wire as plain UUIDs; verification codes and
//! credential hashes never appear in a response.

pub mod account_dto;
pub mod item_dto;

pub use account_dto::*;
pub use item_dto::*;
