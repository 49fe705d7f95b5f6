use sqlx::sqlite::SqlitePool;

use crate::collation::fold;

#[derive(Clone)]
pub struct AccountStore {
    pool: SqlitePool,
}

/// Account role for authorization.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum Role {
    Employee,
    Manager,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "Employee",
            Role::Manager => "Manager",
            Role::Admin => "Admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Employee" => Some(Role::Employee),
            "Manager" => Some(Role::Manager),
            "Admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Sort and dedupe a role set. An empty set becomes `[Employee]`.
pub(crate) fn normalize_roles(roles: &[Role]) -> Vec<Role> {
    let mut roles = roles.to_vec();
    roles.sort();
    roles.dedup();
    if roles.is_empty() {
        roles.push(Role::Employee);
    }
    roles
}

fn roles_to_column(roles: &[Role]) -> String {
    normalize_roles(roles)
        .iter()
        .map(Role::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

fn roles_from_column(column: &str) -> Vec<Role> {
    let roles: Vec<Role> = column.split(',').filter_map(Role::parse).collect();
    normalize_roles(&roles)
}

#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub uuid: String,
    pub username: String,
    pub password_hash: String,
    pub roles: Vec<Role>,
    pub active: bool,
}

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: i64,
    uuid: String,
    username: String,
    password_hash: String,
    roles: String,
    active: i32,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Self {
            id: row.id,
            uuid: row.uuid,
            username: row.username,
            password_hash: row.password_hash,
            roles: roles_from_column(&row.roles),
            active: row.active != 0,
        }
    }
}

/// Public account view. Never carries the password hash or the internal row ID.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AccountSummary {
    #[serde(rename = "id")]
    pub uuid: String,
    pub username: String,
    pub roles: Vec<Role>,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(sqlx::FromRow)]
struct AccountSummaryRow {
    uuid: String,
    username: String,
    roles: String,
    active: i32,
    created_at: String,
    updated_at: String,
}

impl From<AccountSummaryRow> for AccountSummary {
    fn from(row: AccountSummaryRow) -> Self {
        Self {
            uuid: row.uuid,
            username: row.username,
            roles: roles_from_column(&row.roles),
            active: row.active != 0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl AccountStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new active account. Returns the account ID.
    /// Fails with a UNIQUE violation if the folded username is taken.
    pub async fn create(
        &self,
        uuid: &str,
        username: &str,
        password_hash: &str,
        roles: &[Role],
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO accounts (uuid, username, username_key, password_hash, roles, active) VALUES (?, ?, ?, ?, ?, 1)",
        )
        .bind(uuid)
        .bind(username)
        .bind(fold(username))
        .bind(password_hash)
        .bind(roles_to_column(roles))
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get an account by exact username (used for login and refresh).
    pub async fn get_by_username(&self, username: &str) -> Result<Option<Account>, sqlx::Error> {
        let row: Option<AccountRow> = sqlx::query_as(
            "SELECT id, uuid, username, password_hash, roles, active FROM accounts WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Account::from))
    }

    /// Find the account whose username folds to the same key as `username`.
    pub async fn find_by_folded_name(
        &self,
        username: &str,
    ) -> Result<Option<Account>, sqlx::Error> {
        let row: Option<AccountRow> = sqlx::query_as(
            "SELECT id, uuid, username, password_hash, roles, active FROM accounts WHERE username_key = ?",
        )
        .bind(fold(username))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Account::from))
    }

    /// Get an account by UUID.
    pub async fn get_by_uuid(&self, uuid: &str) -> Result<Option<Account>, sqlx::Error> {
        let row: Option<AccountRow> = sqlx::query_as(
            "SELECT id, uuid, username, password_hash, roles, active FROM accounts WHERE uuid = ?",
        )
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Account::from))
    }

    /// Update username, roles and active flag, and the password hash when given.
    /// Returns true if the account was updated.
    pub async fn update(
        &self,
        id: i64,
        username: &str,
        roles: &[Role],
        active: bool,
        password_hash: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE accounts SET username = ?, username_key = ?, roles = ?, active = ?,
                 password_hash = COALESCE(?, password_hash), updated_at = datetime('now')
             WHERE id = ?",
        )
        .bind(username)
        .bind(fold(username))
        .bind(roles_to_column(roles))
        .bind(active)
        .bind(password_hash)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set the roles for an account.
    pub async fn set_roles(&self, id: i64, roles: &[Role]) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE accounts SET roles = ?, updated_at = datetime('now') WHERE id = ?")
                .bind(roles_to_column(roles))
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set the active flag for an account.
    pub async fn set_active(&self, id: i64, active: bool) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE accounts SET active = ?, updated_at = datetime('now') WHERE id = ?")
                .bind(active)
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete an account by ID.
    /// Fails with a FOREIGN KEY violation while records still reference it.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List all accounts, oldest first.
    pub async fn list(&self) -> Result<Vec<AccountSummary>, sqlx::Error> {
        let rows: Vec<AccountSummaryRow> = sqlx::query_as(
            "SELECT uuid, username, roles, active, created_at, updated_at FROM accounts ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(AccountSummary::from).collect())
    }

    /// Get the first active admin account, if one exists.
    pub async fn get_active_admin(&self) -> Result<Option<Account>, sqlx::Error> {
        let row: Option<AccountRow> = sqlx::query_as(
            "SELECT id, uuid, username, password_hash, roles, active FROM accounts
             WHERE active = 1 AND ',' || roles || ',' LIKE '%,Admin,%' ORDER BY id LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Account::from))
    }
}
