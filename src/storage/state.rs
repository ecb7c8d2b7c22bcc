use anyhow::Result;

use super::schema::Database;

impl Database {
    // ========================================================================
    // UI State Slots
    // ========================================================================

    /// Raw value of slot `key`, or `None` if it was never written.
    pub async fn load_slot(&self, key: &str) -> Result<Option<String>> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM ui_state WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    /// Write slot `key`. Last write wins.
    pub async fn save_slot(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ui_state (key, value, saved_at) VALUES (?, ?, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, saved_at = excluded.saved_at
        "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        tracing::debug!(key = %key, "Saved UI state slot");
        Ok(())
    }

    /// Drop slot `key`; clearing an unset slot is a no-op.
    pub async fn clear_slot(&self, key: &str) -> Result<()> {
        let done = sqlx::query("DELETE FROM ui_state WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        if done.rows_affected() > 0 {
            tracing::debug!(key = %key, "Cleared UI state slot");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::Database;

    async fn memory_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_unwritten_slot_is_none() {
        let db = memory_db().await;
        assert_eq!(db.load_slot("selection.post_id").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_slot_overwrites() {
        let db = memory_db().await;
        db.save_slot("theme.variant", "dark").await.unwrap();
        db.save_slot("theme.variant", "light").await.unwrap();
        assert_eq!(
            db.load_slot("theme.variant").await.unwrap().as_deref(),
            Some("light")
        );
    }

    #[tokio::test]
    async fn test_clear_slot_twice() {
        let db = memory_db().await;
        db.save_slot("selection.post_id", "\"7\"").await.unwrap();
        db.clear_slot("selection.post_id").await.unwrap();
        db.clear_slot("selection.post_id").await.unwrap();
        assert_eq!(db.load_slot("selection.post_id").await.unwrap(), None);
    }
}
