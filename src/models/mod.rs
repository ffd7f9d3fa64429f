//! Data models for the archive.

mod audit;
mod document;
mod metadata;

pub use audit::{AuditAction, AuditLogEntry, SYSTEM_ACTOR_ID};
pub use document::{Document, EnrichmentStatus, FileDescriptor};
pub use metadata::Metadata;
