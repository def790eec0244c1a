//! `Database` trait: single async interface for all persistence.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DatabaseError;

/// Backend-agnostic database trait covering preference memory and workflow
/// checkpoints.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    // ── Memory ──────────────────────────────────────────────────────

    /// Get a stored value, `None` when the key is absent.
    async fn get_memory(&self, namespace: &str, key: &str) -> Result<Option<String>, DatabaseError>;

    /// Insert or overwrite a value. Last writer wins.
    async fn put_memory(&self, namespace: &str, key: &str, value: &str)
    -> Result<(), DatabaseError>;

    // ── Checkpoints ─────────────────────────────────────────────────

    /// Insert or replace the snapshot for a thread.
    async fn save_checkpoint(
        &self,
        thread_id: Uuid,
        state: &str,
        snapshot: &serde_json::Value,
    ) -> Result<(), DatabaseError>;

    /// Load the latest snapshot for a thread.
    async fn load_checkpoint(
        &self,
        thread_id: Uuid,
    ) -> Result<Option<serde_json::Value>, DatabaseError>;
}
