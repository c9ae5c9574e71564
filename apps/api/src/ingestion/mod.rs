//! Write path: raw payloads in, persisted feedback records out.

pub mod categorization;
pub mod frequency;
pub mod handlers;
pub mod normalizer;
pub mod pipeline;
