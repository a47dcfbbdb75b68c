use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create every table and index. Safe to run repeatedly.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS batches (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // seq keeps insertion order stable for batch ranking.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            batch_id TEXT NOT NULL,
            filename TEXT NOT NULL,
            content_hash TEXT NOT NULL UNIQUE,
            body TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            FOREIGN KEY (batch_id) REFERENCES batches(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One passage set per document, replaced wholesale.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS passage_sets (
            document_id TEXT PRIMARY KEY,
            chunk_size INTEGER NOT NULL,
            overlap INTEGER NOT NULL,
            model TEXT NOT NULL,
            dims INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS passages (
            document_id TEXT NOT NULL,
            passage_index INTEGER NOT NULL,
            start_char INTEGER NOT NULL,
            end_char INTEGER NOT NULL,
            text TEXT NOT NULL,
            embedding BLOB,
            PRIMARY KEY (document_id, passage_index),
            FOREIGN KEY (document_id) REFERENCES passage_sets(document_id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_batch_id ON documents(batch_id, seq)")
        .execute(pool)
        .await?;

    Ok(())
}
