//! Read path: listing, detail, and triage updates over persisted feedback.

pub mod handlers;
pub mod queries;
