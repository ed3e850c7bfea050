//! `docuvault-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod tenant;

pub use error::{DomainError, DomainResult};
pub use id::{DocumentId, FolderId, NotificationId, ProfileId, ShareId, TenantId, UserId};
pub use tenant::TenantScoped;
