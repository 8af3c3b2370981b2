//! Registrations waiting for email verification.
//!
//! A draft user lives here, keyed by its verification token, until the link
//! in the verification email is followed. Drafts expire after a fixed TTL and
//! are purged by a background task, so abandoned sign-ups do not accumulate.

use dashmap::DashMap;
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::db::DraftUser;

#[derive(Debug, Clone)]
struct PendingEntry {
    draft: DraftUser,
    created_at: Instant,
}

/// Thread-safe token → draft user map with expiry
#[derive(Debug)]
pub struct PendingRegistrations {
    entries: DashMap<String, PendingEntry>,
    ttl: Duration,
}

/// Generate a random verification token
pub fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 24] = rng.random();
    hex::encode(bytes)
}

impl PendingRegistrations {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    fn is_live(&self, entry: &PendingEntry) -> bool {
        entry.created_at.elapsed() < self.ttl
    }

    /// Store a draft and return its token.
    ///
    /// Older drafts for the same email are dropped so only the newest link works.
    pub fn insert(&self, draft: DraftUser) -> String {
        self.remove_email(&draft.email);

        let token = generate_token();
        self.entries.insert(
            token.clone(),
            PendingEntry {
                draft,
                created_at: Instant::now(),
            },
        );
        token
    }

    /// Look up a live draft without consuming it
    pub fn get(&self, token: &str) -> Option<DraftUser> {
        let entry = self.entries.get(token)?;
        if self.is_live(&entry) {
            Some(entry.draft.clone())
        } else {
            None
        }
    }

    /// Drop a draft once it has been persisted
    pub fn remove(&self, token: &str) -> Option<DraftUser> {
        self.entries.remove(token).map(|(_, entry)| entry.draft)
    }

    /// The live draft registered under `email`, if any
    pub fn find_by_email(&self, email: &str) -> Option<DraftUser> {
        self.entries
            .iter()
            .find(|entry| entry.draft.email.eq_ignore_ascii_case(email) && self.is_live(entry.value()))
            .map(|entry| entry.draft.clone())
    }

    /// Issue a fresh token for the live draft registered under `email`.
    ///
    /// The old token stops working and the TTL restarts.
    pub fn reissue(&self, email: &str) -> Option<(String, DraftUser)> {
        let old_token = self
            .entries
            .iter()
            .find(|entry| entry.draft.email.eq_ignore_ascii_case(email) && self.is_live(entry.value()))
            .map(|entry| entry.key().clone())?;

        let (_, entry) = self.entries.remove(&old_token)?;
        let draft = entry.draft;
        let token = generate_token();
        self.entries.insert(
            token.clone(),
            PendingEntry {
                draft: draft.clone(),
                created_at: Instant::now(),
            },
        );
        Some((token, draft))
    }

    fn remove_email(&self, email: &str) {
        self.entries
            .retain(|_, entry| !entry.draft.email.eq_ignore_ascii_case(email));
    }

    /// Remove expired drafts; returns how many were dropped
    pub fn cleanup_expired(&self) -> usize {
        let ttl = self.ttl;
        let mut dropped = 0;
        self.entries.retain(|_, entry| {
            let live = entry.created_at.elapsed() < ttl;
            if !live {
                dropped += 1;
            }
            live
        });
        dropped
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Spawn a background task that periodically purges expired drafts
pub fn spawn_cleanup_task(pending: Arc<PendingRegistrations>, cleanup_interval_secs: u64) {
    tokio::spawn(async move {
        let interval = Duration::from_secs(cleanup_interval_secs.max(1));
        loop {
            tokio::time::sleep(interval).await;
            let dropped = pending.cleanup_expired();
            if dropped > 0 {
                tracing::info!(
                    dropped,
                    remaining = pending.len(),
                    "Purged expired pending registrations"
                );
            }
        }
    });
}
