//! SQLite-backed [`InteractionStore`].
//!
//! Each row gets a v4 UUID and a Unix `created_at`. Loaders return rows in
//! insertion order (`rowid`).

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::models::{Feedback, Intent, Interaction, TrainingData};

use super::{escape_phrase, join_phrases, split_phrases, InteractionStore};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the configured database and ensure the schema exists.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[async_trait]
impl InteractionStore for SqliteStore {
    async fn save_interaction(&self, query: &str, response: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO interactions (id, query, response, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(new_id())
        .bind(query)
        .bind(response)
        .bind(now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn log_interaction(&self, query: &str, response: &str, rating: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO interaction_logs (id, query, response, rating, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(new_id())
        .bind(query)
        .bind(response)
        .bind(rating)
        .bind(now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save_feedback(&self, feedback: &Feedback) -> Result<()> {
        sqlx::query(
            "INSERT INTO feedback (id, query, response, rating, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(new_id())
        .bind(&feedback.query)
        .bind(&feedback.response)
        .bind(feedback.rating)
        .bind(now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_discovered_intent(&self, cluster_key: &str, phrase: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO discovered_intents (intent_name, training_phrases)
            VALUES (?, ?)
            ON CONFLICT(intent_name) DO UPDATE SET
                training_phrases = training_phrases || ';' || excluded.training_phrases
            "#,
        )
        .bind(cluster_key)
        .bind(escape_phrase(phrase))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_discovered_intents(&self) -> Result<BTreeMap<String, Vec<String>>> {
        let rows = sqlx::query("SELECT intent_name, training_phrases FROM discovered_intents")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let name: String = row.get("intent_name");
                let phrases: String = row.get("training_phrases");
                (name, split_phrases(&phrases))
            })
            .collect())
    }

    async fn promote_discovered_intent(&self, cluster_key: &str, intent: &Intent) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO intents (name, training_phrases, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                training_phrases = training_phrases || ';' || excluded.training_phrases
            "#,
        )
        .bind(&intent.name)
        .bind(join_phrases(&intent.training_phrases))
        .bind(now())
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM discovered_intents WHERE intent_name = ?")
            .bind(cluster_key)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn load_intents(&self) -> Result<Vec<Intent>> {
        let rows = sqlx::query("SELECT name, training_phrases FROM intents ORDER BY rowid ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let name: String = row.get("name");
                let phrases: String = row.get("training_phrases");
                Intent::new(name, split_phrases(&phrases))
            })
            .collect())
    }

    async fn save_training_data(&self, entry: &TrainingData) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO training_data (id, query, answer, intent, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(new_id())
        .bind(&entry.query)
        .bind(&entry.answer)
        .bind(&entry.intent)
        .bind(now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_training_data(&self) -> Result<Vec<TrainingData>> {
        let rows =
            sqlx::query("SELECT query, answer, intent FROM training_data ORDER BY rowid ASC")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .iter()
            .map(|row| TrainingData {
                query: row.get("query"),
                answer: row.get("answer"),
                intent: row.get("intent"),
            })
            .collect())
    }

    async fn load_interactions(&self) -> Result<Vec<Interaction>> {
        let rows = sqlx::query("SELECT query, response FROM interactions ORDER BY rowid ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| Interaction {
                query: row.get("query"),
                response: row.get("response"),
            })
            .collect())
    }
}
