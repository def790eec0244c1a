//! Preference memory: free-text profiles keyed by (namespace, key).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DatabaseError;
use crate::pipeline::prompts::{
    DEFAULT_CAL_PREFERENCES, DEFAULT_RESPONSE_PREFERENCES, DEFAULT_TRIAGE_INSTRUCTIONS,
};
use crate::store::traits::Database;

/// Key under which every profile is stored.
pub const PREFERENCES_KEY: &str = "user_preferences";

/// Preference category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    TriagePreferences,
    ResponsePreferences,
    CalendarPreferences,
}

impl Namespace {
    /// Storage path for this namespace.
    pub fn path(&self) -> &'static str {
        match self {
            Self::TriagePreferences => "email_assistant/triage_preferences",
            Self::ResponsePreferences => "email_assistant/response_preferences",
            Self::CalendarPreferences => "email_assistant/cal_preferences",
        }
    }

    /// Profile seeded on first read.
    pub fn default_profile(&self) -> &'static str {
        match self {
            Self::TriagePreferences => DEFAULT_TRIAGE_INSTRUCTIONS,
            Self::ResponsePreferences => DEFAULT_RESPONSE_PREFERENCES,
            Self::CalendarPreferences => DEFAULT_CAL_PREFERENCES,
        }
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// Key-value view over the database's memory table.
#[derive(Clone)]
pub struct MemoryStore {
    db: Arc<dyn Database>,
}

impl MemoryStore {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    pub async fn get(&self, namespace: Namespace, key: &str) -> Result<Option<String>, DatabaseError> {
        self.db.get_memory(namespace.path(), key).await
    }

    pub async fn put(&self, namespace: Namespace, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.db.put_memory(namespace.path(), key, value).await
    }

    /// Return the stored value, or store `default` and return it.
    pub async fn get_or_default(
        &self,
        namespace: Namespace,
        key: &str,
        default: &str,
    ) -> Result<String, DatabaseError> {
        if let Some(value) = self.get(namespace, key).await? {
            return Ok(value);
        }
        debug!(namespace = %namespace, key, "Seeding memory with default");
        self.put(namespace, key, default).await?;
        Ok(default.to_string())
    }

    /// The namespace's profile, seeded with its default on first use.
    pub async fn preferences(&self, namespace: Namespace) -> Result<String, DatabaseError> {
        self.get_or_default(namespace, PREFERENCES_KEY, namespace.default_profile())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LibSqlBackend;

    async fn store() -> MemoryStore {
        MemoryStore::new(Arc::new(LibSqlBackend::new_memory().await.unwrap()))
    }

    #[tokio::test]
    async fn get_or_default_writes_on_read() {
        let store = store().await;
        let ns = Namespace::CalendarPreferences;
        assert_eq!(store.get(ns, PREFERENCES_KEY).await.unwrap(), None);

        let value = store.get_or_default(ns, PREFERENCES_KEY, "30 minutes").await.unwrap();
        assert_eq!(value, "30 minutes");
        assert_eq!(
            store.get(ns, PREFERENCES_KEY).await.unwrap().as_deref(),
            Some("30 minutes")
        );
    }

    #[tokio::test]
    async fn get_or_default_keeps_existing_value() {
        let store = store().await;
        let ns = Namespace::ResponsePreferences;
        store.put(ns, PREFERENCES_KEY, "be terse").await.unwrap();

        let value = store.get_or_default(ns, PREFERENCES_KEY, "unused").await.unwrap();
        assert_eq!(value, "be terse");
    }

    #[tokio::test]
    async fn namespaces_are_isolated() {
        let store = store().await;
        store
            .put(Namespace::TriagePreferences, PREFERENCES_KEY, "triage")
            .await
            .unwrap();
        assert_eq!(
            store
                .get(Namespace::ResponsePreferences, PREFERENCES_KEY)
                .await
                .unwrap(),
            None
        );
        let seeded = store.preferences(Namespace::ResponsePreferences).await.unwrap();
        assert_eq!(seeded, DEFAULT_RESPONSE_PREFERENCES);
    }
}
