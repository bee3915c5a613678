//! Core data models for the paste storage service.
//!
//! The paste row maps onto its database table via `sqlx::FromRow`; the
//! content module owns the self-describing storage forms the `content`
//! column can take.

pub mod content;
pub mod paste;
