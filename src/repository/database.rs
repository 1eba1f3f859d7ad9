use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, QueryBuilder, Row, Sqlite, Transaction};
use std::str::FromStr;
use tracing::info;

use crate::model::{CommitRecord, Phrase, Snapshot, Status};

use super::store::{Datastore, LocaleCounter};
use super::SCHEMA_VERSION;

/// (file, commit) pairs per `phrases_by_snapshot` statement
const SNAPSHOT_BATCH: usize = 400;
/// Metadata row holding the datastore layout version
const SCHEMA_VERSION_KEY: &str = "schema_version";
/// Phrases per multi-row INSERT
const PHRASE_BATCH: usize = 500;

/// Database abstraction for SQLite operations
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Create a new database connection
    pub async fn new(db_path: &str) -> Result<Self> {
        // Configure connection options with PRAGMAs applied to every connection
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", db_path))?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .pragma("temp_store", "MEMORY")
            .pragma("cache_size", "-64000"); // 64MB cache

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        Ok(Self { pool })
    }

    /// Initialize database schema, returns true if schema was rebuilt
    pub async fn init_schema(&self) -> Result<bool> {
        // Create metadata table first (needed to check version)
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )"
        ).execute(&self.pool).await?;

        let stored_version = self.get_metadata(SCHEMA_VERSION_KEY).await?;

        let needs_rebuild = stored_version.as_deref() != Some(SCHEMA_VERSION);

        if needs_rebuild {
            if let Some(old) = &stored_version {
                info!("Schema version changed ({} -> {}), rebuilding datastore", old, SCHEMA_VERSION);
            }
            for table in ["commit_locales", "translations", "phrases", "commit_logs"] {
                sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
                    .execute(&self.pool)
                    .await?;
            }
            sqlx::query("DELETE FROM metadata").execute(&self.pool).await?;
        }

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS commit_logs (
                repo_name TEXT NOT NULL,
                commit_id TEXT NOT NULL,
                phrase_count INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL,
                commit_datetime INTEGER,
                branch_name TEXT,
                PRIMARY KEY (repo_name, commit_id)
            )"
        ).execute(&self.pool).await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS commit_logs_branch ON commit_logs (repo_name, branch_name)"
        ).execute(&self.pool).await?;

        // meta_key is '' rather than NULL so the unique constraint applies
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS phrases (
                repo_name TEXT NOT NULL,
                file TEXT NOT NULL,
                commit_id TEXT NOT NULL,
                key TEXT NOT NULL,
                meta_key TEXT NOT NULL DEFAULT '',
                author_name TEXT,
                author_email TEXT,
                line_number INTEGER,
                UNIQUE (repo_name, file, commit_id, key, meta_key)
            )"
        ).execute(&self.pool).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS translations (
                repo_name TEXT NOT NULL,
                file TEXT NOT NULL,
                commit_id TEXT NOT NULL,
                key TEXT NOT NULL,
                meta_key TEXT NOT NULL DEFAULT '',
                locale TEXT NOT NULL,
                translation TEXT NOT NULL,
                PRIMARY KEY (repo_name, file, commit_id, key, meta_key, locale)
            )"
        ).execute(&self.pool).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS commit_locales (
                repo_name TEXT NOT NULL,
                commit_id TEXT NOT NULL,
                locale TEXT NOT NULL,
                translated_count INTEGER NOT NULL,
                PRIMARY KEY (repo_name, commit_id, locale)
            )"
        ).execute(&self.pool).await?;

        if needs_rebuild {
            self.set_metadata(SCHEMA_VERSION_KEY, SCHEMA_VERSION).await?;
        }

        Ok(needs_rebuild)
    }

    /// Stored value for a metadata `key`
    pub async fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let value = sqlx::query_scalar("SELECT value FROM metadata WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to read metadata {}", key))?;
        Ok(value)
    }

    pub async fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query("INSERT INTO metadata (key, value) VALUES (?, ?) ON CONFLICT (key) DO UPDATE SET value = excluded.value")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to write metadata {}", key))?;
        Ok(())
    }

    async fn save_phrases_in_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        repo_name: &str,
        phrases: &[Phrase],
    ) -> Result<()> {
        for chunk in phrases.chunks(PHRASE_BATCH) {
            if chunk.is_empty() {
                continue;
            }

            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT OR IGNORE INTO phrases \
                 (repo_name, file, commit_id, key, meta_key, author_name, author_email, line_number) "
            );
            qb.push_values(chunk, |mut row, phrase| {
                row.push_bind(repo_name)
                    .push_bind(phrase.file.as_str())
                    .push_bind(phrase.commit_id.as_str())
                    .push_bind(phrase.key.as_str())
                    .push_bind(phrase.meta_key.as_deref().unwrap_or_default())
                    .push_bind(phrase.author_name.as_deref())
                    .push_bind(phrase.author_email.as_deref())
                    .push_bind(phrase.line_number.map(i64::from));
            });
            qb.build().execute(&mut **tx).await?;
        }
        Ok(())
    }
}

fn commit_record_from_row(row: &SqliteRow) -> Result<CommitRecord> {
    let status: String = row.get("status");
    let seconds: Option<i64> = row.get("commit_datetime");
    Ok(CommitRecord {
        repo_name: row.get("repo_name"),
        commit_id: row.get("commit_id"),
        phrase_count: row.get::<i64, _>("phrase_count") as u64,
        status: status.parse::<Status>()?,
        commit_datetime: seconds.and_then(crate::util::datetime_from_unix),
        branch_name: row.get("branch_name"),
    })
}

fn phrase_from_row(row: &SqliteRow) -> Phrase {
    let meta_key: String = row.get("meta_key");
    Phrase {
        key: row.get("key"),
        meta_key: Some(meta_key).filter(|m| !m.is_empty()),
        file: row.get("file"),
        commit_id: row.get("commit_id"),
        author_name: row.get("author_name"),
        author_email: row.get("author_email"),
        line_number: row.get::<Option<i64>, _>("line_number").map(|n| n as u32),
    }
}

#[async_trait]
impl Datastore for Database {
    async fn lookup_commit_record(&self, repo_name: &str, commit_id: &str) -> Result<Option<CommitRecord>> {
        let row = sqlx::query(
            "SELECT repo_name, commit_id, phrase_count, status, commit_datetime, branch_name
             FROM commit_logs WHERE repo_name = ? AND commit_id = ?"
        )
        .bind(repo_name)
        .bind(commit_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(commit_record_from_row).transpose()
    }

    async fn add_or_update_commit_record(&self, record: &CommitRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO commit_logs (repo_name, commit_id, phrase_count, status, commit_datetime, branch_name)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(repo_name, commit_id) DO UPDATE SET
                phrase_count = excluded.phrase_count,
                status = excluded.status,
                commit_datetime = excluded.commit_datetime,
                branch_name = excluded.branch_name"
        )
        .bind(&record.repo_name)
        .bind(&record.commit_id)
        .bind(record.phrase_count as i64)
        .bind(record.status.as_str())
        .bind(record.commit_datetime.map(|dt| dt.unix_timestamp()))
        .bind(record.branch_name.as_deref())
        .execute(&self.pool)
        .await
        .context("Failed to save commit record")?;
        Ok(())
    }

    async fn commit_records_for_branch(&self, repo_name: &str, branch_name: &str) -> Result<Vec<CommitRecord>> {
        let rows = sqlx::query(
            "SELECT repo_name, commit_id, phrase_count, status, commit_datetime, branch_name
             FROM commit_logs WHERE repo_name = ? AND branch_name = ?
             ORDER BY commit_datetime"
        )
        .bind(repo_name)
        .bind(branch_name)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(commit_record_from_row).collect()
    }

    async fn store_phrase(&self, repo_name: &str, phrase: &Phrase) -> Result<()> {
        self.store_phrases(repo_name, std::slice::from_ref(phrase)).await
    }

    async fn store_phrases(&self, repo_name: &str, phrases: &[Phrase]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        self.save_phrases_in_tx(&mut tx, repo_name, phrases).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn phrases_by_snapshot(&self, repo_name: &str, snapshot: &Snapshot) -> Result<Vec<Phrase>> {
        let pairs = snapshot.sorted();
        let mut phrases = Vec::new();

        for chunk in pairs.chunks(SNAPSHOT_BATCH) {
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
                "SELECT file, commit_id, key, meta_key, author_name, author_email, line_number \
                 FROM phrases WHERE repo_name = "
            );
            qb.push_bind(repo_name);
            qb.push(" AND (file, commit_id) IN (");
            qb.push_values(chunk, |mut row, (file, commit_id)| {
                row.push_bind(*file).push_bind(*commit_id);
            });
            qb.push(") ORDER BY file, line_number, rowid");

            let rows = qb.build().fetch_all(&self.pool).await?;
            phrases.extend(rows.iter().map(phrase_from_row));
        }

        Ok(phrases)
    }

    async fn add_or_update_translation(
        &self,
        repo_name: &str,
        phrase: &Phrase,
        locale: &str,
        translation: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO translations (repo_name, file, commit_id, key, meta_key, locale, translation)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(repo_name, file, commit_id, key, meta_key, locale)
             DO UPDATE SET translation = excluded.translation"
        )
        .bind(repo_name)
        .bind(&phrase.file)
        .bind(&phrase.commit_id)
        .bind(&phrase.key)
        .bind(phrase.meta_key.as_deref().unwrap_or_default())
        .bind(locale)
        .bind(translation)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn translation_for(&self, repo_name: &str, phrase: &Phrase, locale: &str) -> Result<Option<String>> {
        let value = sqlx::query_scalar(
            "SELECT translation FROM translations
             WHERE repo_name = ? AND file = ? AND commit_id = ? AND key = ? AND meta_key = ? AND locale = ?"
        )
        .bind(repo_name)
        .bind(&phrase.file)
        .bind(&phrase.commit_id)
        .bind(&phrase.key)
        .bind(phrase.meta_key.as_deref().unwrap_or_default())
        .bind(locale)
        .fetch_optional(&self.pool)
        .await?;
        Ok(value)
    }

    async fn add_or_update_locale_counter(
        &self,
        repo_name: &str,
        commit_id: &str,
        locale: &str,
        translated_count: u64,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO commit_locales (repo_name, commit_id, locale, translated_count)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(repo_name, commit_id, locale)
             DO UPDATE SET translated_count = excluded.translated_count"
        )
        .bind(repo_name)
        .bind(commit_id)
        .bind(locale)
        .bind(translated_count as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn locale_counters_for(&self, repo_name: &str, commit_id: &str) -> Result<Vec<LocaleCounter>> {
        let rows = sqlx::query(
            "SELECT locale, translated_count FROM commit_locales
             WHERE repo_name = ? AND commit_id = ? ORDER BY locale"
        )
        .bind(repo_name)
        .bind(commit_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|row| LocaleCounter {
                locale: row.get("locale"),
                translated_count: row.get::<i64, _>("translated_count") as u64,
            })
            .collect())
    }
}
