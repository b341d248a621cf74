//! Account persistence

use async_trait::async_trait;
use newsdesk_domain::{
    Account, AccountRecord, AccountStore, Role, StoreError, StoredAccount, UserId,
};

use super::{SqliteStore, db_err, from_nanos, to_nanos};

type AccountRow = (i64, String, String, String, Option<String>, i64);

const ACCOUNT_COLUMNS: &str = "uid, username, email, role, profile_pic, created_at";

fn account_from_row(row: AccountRow) -> Result<Account, StoreError> {
    let (id, username, email, role, profile_pic, created_at) = row;
    let role = Role::parse(&role)
        .ok_or_else(|| StoreError::Serialization(format!("unknown role '{}'", role)))?;
    Ok(Account {
        id,
        username,
        email,
        role,
        profile_pic,
        created_at: from_nanos(created_at)?,
    })
}

#[async_trait]
impl AccountStore for SqliteStore {
    async fn create_account(&self, record: &AccountRecord) -> Result<Account, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO users (username, email, password, role, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(email) DO NOTHING
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        );
        let row: Option<AccountRow> = sqlx::query_as(&sql)
            .bind(&record.username)
            .bind(&record.email)
            .bind(&record.password_hash)
            .bind(record.role.as_str())
            .bind(to_nanos(record.created_at)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        match row {
            Some(row) => account_from_row(row),
            None => Err(StoreError::Conflict(format!(
                "email {} already registered",
                record.email
            ))),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<StoredAccount>, StoreError> {
        let row: Option<(i64, String, String, String, Option<String>, i64, String)> =
            sqlx::query_as(
                r#"
                SELECT uid, username, email, role, profile_pic, created_at, password
                FROM users
                WHERE email = ?
                "#,
            )
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        match row {
            Some((id, username, email, role, profile_pic, created_at, password_hash)) => {
                let account =
                    account_from_row((id, username, email, role, profile_pic, created_at))?;
                Ok(Some(StoredAccount {
                    account,
                    password_hash,
                }))
            }
            None => Ok(None),
        }
    }

    async fn get_account(&self, id: UserId) -> Result<Option<Account>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE uid = ?", ACCOUNT_COLUMNS);
        let row: Option<AccountRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.map(account_from_row).transpose()
    }

    async fn set_profile_pic(&self, id: UserId, url: &str) -> Result<Account, StoreError> {
        let sql = format!(
            "UPDATE users SET profile_pic = ? WHERE uid = ? RETURNING {}",
            ACCOUNT_COLUMNS
        );
        let row: Option<AccountRow> = sqlx::query_as(&sql)
            .bind(url)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        match row {
            Some(row) => account_from_row(row),
            None => Err(StoreError::NotFound(format!("user {}", id))),
        }
    }
}
