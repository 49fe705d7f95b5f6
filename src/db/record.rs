//! Record (note) storage.

use sqlx::sqlite::SqlitePool;

use crate::collation::fold;

#[derive(Clone)]
pub struct RecordStore {
    pool: SqlitePool,
}

/// A record joined with its owner's public identity.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Record {
    #[serde(skip)]
    pub id: i64,
    #[serde(rename = "id")]
    pub uuid: String,
    #[serde(skip)]
    pub account_id: i64,
    /// Owner account UUID
    pub owner: String,
    /// Owner username
    pub username: String,
    pub title: String,
    pub text: String,
    pub completed: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(sqlx::FromRow)]
struct RecordRow {
    id: i64,
    uuid: String,
    account_id: i64,
    owner: String,
    username: String,
    title: String,
    text: String,
    completed: i32,
    created_at: String,
    updated_at: String,
}

impl From<RecordRow> for Record {
    fn from(row: RecordRow) -> Self {
        Self {
            id: row.id,
            uuid: row.uuid,
            account_id: row.account_id,
            owner: row.owner,
            username: row.username,
            title: row.title,
            text: row.text,
            completed: row.completed != 0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl RecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new record owned by `account_id`. Returns the record ID.
    /// Fails with a UNIQUE violation on a duplicate folded title and with a
    /// FOREIGN KEY violation if the owner no longer exists.
    pub async fn create(
        &self,
        uuid: &str,
        account_id: i64,
        title: &str,
        text: &str,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO records (uuid, account_id, title, title_key, text) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(uuid)
        .bind(account_id)
        .bind(title)
        .bind(fold(title))
        .bind(text)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get a record by UUID.
    pub async fn get_by_uuid(&self, uuid: &str) -> Result<Option<Record>, sqlx::Error> {
        let row: Option<RecordRow> = sqlx::query_as(
            "SELECT r.id, r.uuid, r.account_id, a.uuid AS owner, a.username, r.title, r.text, r.completed, r.created_at, r.updated_at
             FROM records r JOIN accounts a ON a.id = r.account_id
             WHERE r.uuid = ?",
        )
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Record::from))
    }

    /// Find the record whose title folds to the same key as `title`.
    pub async fn find_by_folded_title(&self, title: &str) -> Result<Option<Record>, sqlx::Error> {
        let row: Option<RecordRow> = sqlx::query_as(
            "SELECT r.id, r.uuid, r.account_id, a.uuid AS owner, a.username, r.title, r.text, r.completed, r.created_at, r.updated_at
             FROM records r JOIN accounts a ON a.id = r.account_id
             WHERE r.title_key = ?",
        )
        .bind(fold(title))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Record::from))
    }

    /// List all records, open ones first, then oldest first.
    pub async fn list(&self) -> Result<Vec<Record>, sqlx::Error> {
        let rows: Vec<RecordRow> = sqlx::query_as(
            "SELECT r.id, r.uuid, r.account_id, a.uuid AS owner, a.username, r.title, r.text, r.completed, r.created_at, r.updated_at
             FROM records r JOIN accounts a ON a.id = r.account_id
             ORDER BY r.completed ASC, r.id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Record::from).collect())
    }

    /// Update a record by UUID. Returns true if the record was updated.
    pub async fn update(
        &self,
        uuid: &str,
        account_id: i64,
        title: &str,
        text: &str,
        completed: bool,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE records SET account_id = ?, title = ?, title_key = ?, text = ?, completed = ?, updated_at = datetime('now')
             WHERE uuid = ?",
        )
        .bind(account_id)
        .bind(title)
        .bind(fold(title))
        .bind(text)
        .bind(completed)
        .bind(uuid)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a record by UUID. Returns true if a record was deleted.
    pub async fn delete(&self, uuid: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM records WHERE uuid = ?")
            .bind(uuid)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count the records owned by an account.
    pub async fn count_by_account(&self, account_id: i64) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM records WHERE account_id = ?")
            .bind(account_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }
}
