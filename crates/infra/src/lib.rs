//! Infrastructure layer: tenant-keyed stores, the sharing ledger, object
//! storage coordinates, the user directory and the expiry sweep.

pub mod directory;
pub mod object_store;
pub mod sharing;
pub mod store;
pub mod sweep;

pub use directory::Directory;
pub use object_store::{
    archive_key_for, object_key, InMemoryObjectStore, ObjectStore, PresignedRequest,
    MAX_UPLOAD_BYTES,
};
pub use sharing::{InMemorySharingLedger, SharingLedger};
#[cfg(feature = "postgres")]
pub use sharing::PostgresSharingLedger;
pub use store::{InMemoryTenantStore, TenantScopedStore, TenantStore};
#[cfg(feature = "postgres")]
pub use store::{PostgresTenantStore, StoreKey};
pub use sweep::{ShareExpirySweep, ShareExpirySweepConfig, ShareExpirySweepHandle};
