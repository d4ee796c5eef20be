//! Audit trail for classification checks.

pub mod logger;

pub use logger::{AuditEvent, AuditLogger};
