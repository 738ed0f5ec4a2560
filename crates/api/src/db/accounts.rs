//! Account repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use chef_core::{AccountId, Email, Role};

use super::{DataContext, RepositoryError};
use crate::models::Page;
use crate::models::account::Account;

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, first_name, last_name, role, \
     provider, is_verified, verification_token, created_at, updated_at";

/// Raw `account` row; `email` is re-validated on the way out.
#[derive(FromRow)]
struct AccountRow {
    id: AccountId,
    email: String,
    password_hash: Option<String>,
    first_name: String,
    last_name: String,
    role: Role,
    provider: Option<String>,
    is_verified: bool,
    verification_token: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = RepositoryError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            email,
            password_hash: row.password_hash,
            first_name: row.first_name,
            last_name: row.last_name,
            role: row.role,
            provider: row.provider,
            is_verified: row.is_verified,
            verification_token: row.verification_token,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// A federated identity: provider name and the subject id it assigns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExternalLogin<'a> {
    pub provider: &'a str,
    pub subject: &'a str,
}

/// Fields of a new account.
#[derive(Debug, Clone)]
pub struct NewAccount<'a> {
    pub email: &'a Email,
    pub password_hash: Option<&'a str>,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub role: Role,
    /// Federated identity the account is created from.
    pub login: Option<ExternalLogin<'a>>,
    pub is_verified: bool,
    pub verification_token: Option<&'a str>,
}

/// Repository for account database operations.
pub struct AccountRepository {
    db: DataContext,
}

impl AccountRepository {
    /// Create a new account repository.
    #[must_use]
    pub const fn new(db: DataContext) -> Self {
        Self { db }
    }

    /// Get an account by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored email is invalid.
    pub async fn get_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM account WHERE id = $1");
        sqlx::query_as::<_, AccountRow>(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?
            .map(Account::try_from)
            .transpose()
    }

    /// Get an account by its email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<Account>, RepositoryError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM account WHERE email = $1");
        sqlx::query_as::<_, AccountRow>(&sql)
            .bind(email)
            .fetch_optional(self.db.pool())
            .await?
            .map(Account::try_from)
            .transpose()
    }

    /// Get the account a federated identity is linked to.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_login(
        &self,
        login: ExternalLogin<'_>,
    ) -> Result<Option<Account>, RepositoryError> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account WHERE id = \
             (SELECT account_id FROM account_login WHERE provider = $1 AND subject = $2)"
        );
        sqlx::query_as::<_, AccountRow>(&sql)
            .bind(login.provider)
            .bind(login.subject)
            .fetch_optional(self.db.pool())
            .await?
            .map(Account::try_from)
            .transpose()
    }

    /// List one page of accounts ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, page: Page) -> Result<Vec<Account>, RepositoryError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM account ORDER BY id LIMIT $1 OFFSET $2");
        sqlx::query_as::<_, AccountRow>(&sql)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.db.pool())
            .await?
            .into_iter()
            .map(Account::try_from)
            .collect()
    }

    /// Create a new account, and its federated login when given.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email (or the login) already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, new: &NewAccount<'_>) -> Result<Account, RepositoryError> {
        let sql = format!(
            "INSERT INTO account (email, password_hash, first_name, last_name, role, \
             provider, is_verified, verification_token) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {ACCOUNT_COLUMNS}"
        );
        let mut tx = self.db.pool().begin().await?;
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(new.email)
            .bind(new.password_hash)
            .bind(new.first_name)
            .bind(new.last_name)
            .bind(new.role)
            .bind(new.login.map(|login| login.provider))
            .bind(new.is_verified)
            .bind(new.verification_token)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| match RepositoryError::from_write(e) {
                RepositoryError::Conflict(_) => {
                    RepositoryError::Conflict("email already exists".to_owned())
                }
                other => other,
            })?;

        if let Some(login) = new.login {
            insert_login(&mut tx, row.id, login).await?;
        }
        tx.commit().await?;

        Account::try_from(row)
    }

    /// Link a federated identity to an existing account and mark it verified.
    ///
    /// An account whose email was never verified is taken over: its password
    /// and outstanding verification token are cleared in the same update, so
    /// whoever registered the address without proving it loses access.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account does not exist.
    /// Returns `RepositoryError::Conflict` if the account already has another
    /// identity at this provider.
    pub async fn link_provider(
        &self,
        id: AccountId,
        login: ExternalLogin<'_>,
    ) -> Result<Account, RepositoryError> {
        let sql = format!(
            "UPDATE account SET provider = COALESCE(provider, $1), \
             password_hash = CASE WHEN is_verified THEN password_hash ELSE NULL END, \
             is_verified = TRUE, verification_token = NULL, updated_at = NOW() \
             WHERE id = $2 RETURNING {ACCOUNT_COLUMNS}"
        );
        let mut tx = self.db.pool().begin().await?;
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(login.provider)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        insert_login(&mut tx, id, login).await?;
        tx.commit().await?;

        Account::try_from(row)
    }

    /// Providers linked to an account, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn providers(&self, id: AccountId) -> Result<Vec<String>, RepositoryError> {
        Ok(sqlx::query_scalar::<_, String>(
            "SELECT provider FROM account_login WHERE account_id = $1 ORDER BY provider",
        )
        .bind(id)
        .fetch_all(self.db.pool())
        .await?)
    }

    /// Consume a verification token, marking its account verified.
    ///
    /// Returns `None` when no account holds the token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn verify(&self, token: &str) -> Result<Option<Account>, RepositoryError> {
        let sql = format!(
            "UPDATE account SET is_verified = TRUE, verification_token = NULL, updated_at = NOW() \
             WHERE verification_token = $1 RETURNING {ACCOUNT_COLUMNS}"
        );
        sqlx::query_as::<_, AccountRow>(&sql)
            .bind(token)
            .fetch_optional(self.db.pool())
            .await?
            .map(Account::try_from)
            .transpose()
    }

    /// Update profile fields and role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account does not exist.
    pub async fn update_profile(
        &self,
        id: AccountId,
        first_name: &str,
        last_name: &str,
        role: Role,
    ) -> Result<Account, RepositoryError> {
        let sql = format!(
            "UPDATE account SET first_name = $1, last_name = $2, role = $3, updated_at = NOW() \
             WHERE id = $4 RETURNING {ACCOUNT_COLUMNS}"
        );
        sqlx::query_as::<_, AccountRow>(&sql)
            .bind(first_name)
            .bind(last_name)
            .bind(role)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or(RepositoryError::NotFound)
            .and_then(Account::try_from)
    }

    /// Delete an account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account does not exist.
    /// Returns `RepositoryError::Conflict` if orders or stores still reference it.
    pub async fn delete(&self, id: AccountId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM account WHERE id = $1")
            .bind(id)
            .execute(self.db.pool())
            .await
            .map_err(RepositoryError::from_write)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

async fn insert_login(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    account_id: AccountId,
    login: ExternalLogin<'_>,
) -> Result<(), RepositoryError> {
    sqlx::query("INSERT INTO account_login (provider, subject, account_id) VALUES ($1, $2, $3)")
        .bind(login.provider)
        .bind(login.subject)
        .bind(account_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| match RepositoryError::from_write(e) {
            RepositoryError::Conflict(_) => RepositoryError::Conflict(format!(
                "a {} identity is already linked",
                login.provider
            )),
            other => other,
        })?;
    Ok(())
}
