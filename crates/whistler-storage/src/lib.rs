//! Whistler resource storage
//!
//! Durable, append-only byte storage addressed by resource identifier. Each identifier maps
//! to exactly one file in a flat base directory. There is no overwrite, truncate or
//! random-access write: bytes can only be appended and then synced.
//!
//! Writers are serialized per identifier. A caller first takes the identifier's lock with
//! [`ResourceStore::lock`]; only the returned [`ResourceGuard`] can open a writer.

pub mod local;
pub mod locks;
pub mod traits;

pub use local::LocalResourceStore;
pub use locks::{KeyedLocks, ResourceGuard};
pub use traits::{ResourceStore, ResourceWriter, StorageError, StorageResult};
