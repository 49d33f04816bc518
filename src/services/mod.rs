//! Service layer: chat flow, SOP drafts, and background persistence.

pub mod chat;
pub mod persistence;
pub mod sop;
