//! Shared data models for the StoryCraft backend.
//!
//! This crate provides Serde-serializable types for:
//! - User accounts and credit balances
//! - Credit ledger entries (grants, spends, refunds)
//! - Video generation jobs and their lifecycle
//! - Styles, output formats and prompt composition
//! - Credit pricing

pub mod credit_entry;
pub mod pricing;
pub mod style;
pub mod user;
pub mod video_job;

// Re-export common types
pub use credit_entry::{
    CreditEntry, EntryKind, EntryStatus, REF_ADMIN_GRANT, REF_CREATE_ERROR, REF_PENDING,
    REF_WELCOME,
};
pub use pricing::{batch_cost, clip_cost, is_allowed_duration, ALLOWED_SECONDS};
pub use style::{Style, VideoFormat};
pub use user::User;
pub use video_job::{JobStatus, NewVideoJob, StoredLocation, VideoJob, DEFAULT_MODEL};
