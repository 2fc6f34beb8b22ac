//! In-process caches: session keyrings, scheduler keys, application keys.
//!
//! All caches are safe for concurrent use. Access is keyed; there is no
//! locking across keys.

pub mod application;
pub mod keys;
pub mod scheduler;
pub mod session;

use std::sync::Arc;

use keyring_core::CollectionId;

pub use application::ApplicationKeyCache;
pub use keys::KeyCache;
pub use scheduler::SchedulerKeyCache;
pub use session::SessionKeyringCache;

/// The caches shared by the legacy keyring and the service.
#[derive(Debug, Clone, Default)]
pub struct KeyringCaches {
    pub sessions: Arc<SessionKeyringCache>,
    pub scheduler: Arc<SchedulerKeyCache>,
    pub application: Arc<ApplicationKeyCache>,
}

impl KeyringCaches {
    /// Fresh caches, with the given application key names.
    pub fn new(application_keys: impl IntoIterator<Item = CollectionId>) -> Self {
        Self {
            sessions: Arc::new(SessionKeyringCache::new()),
            scheduler: Arc::new(SchedulerKeyCache::new()),
            application: Arc::new(ApplicationKeyCache::new(application_keys)),
        }
    }
}
