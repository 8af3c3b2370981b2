pub mod api;
pub mod config;
pub mod db;
pub mod notifications;
pub mod pending;
pub mod workspace;

pub use db::DbPool;

use config::Config;
use std::sync::Arc;
use std::time::Duration;

use crate::notifications::Mailer;
use crate::pending::PendingRegistrations;
use crate::workspace::WorkspaceStore;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub mailer: Arc<dyn Mailer>,
    pub pending: Arc<PendingRegistrations>,
    pub workspaces: WorkspaceStore,
}

impl AppState {
    pub fn new(config: Config, db: DbPool, mailer: Arc<dyn Mailer>) -> Self {
        let pending = Arc::new(PendingRegistrations::new(Duration::from_secs(
            config.auth.pending_registration_ttl_secs,
        )));
        let workspaces = WorkspaceStore::new(db.clone());
        Self {
            config,
            db,
            mailer,
            pending,
            workspaces,
        }
    }
}
