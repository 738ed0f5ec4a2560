//! Generic CRUD repository over any [`Entity`].
//!
//! Table and column names come from compile-time constants on the entity
//! type, never from request input, so building the SQL with `format!` is
//! safe. Values are always bound.

use std::marker::PhantomData;

use crate::models::{Entity, Page};

use super::{DataContext, RepositoryError};

/// Repository for one entity table.
pub struct EntityRepository<E> {
    db: DataContext,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> EntityRepository<E> {
    /// Create a new repository over a persistence context.
    #[must_use]
    pub const fn new(db: DataContext) -> Self {
        Self {
            db,
            _entity: PhantomData,
        }
    }

    /// List one page ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, page: Page) -> Result<Vec<E>, RepositoryError> {
        let sql = format!(
            "SELECT * FROM {} ORDER BY id LIMIT $1 OFFSET $2",
            E::TABLE
        );
        let rows = sqlx::query_as::<_, E>(&sql)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows)
    }

    /// Get a row by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row has this id.
    pub async fn get(&self, id: E::Id) -> Result<E, RepositoryError> {
        let sql = format!("SELECT * FROM {} WHERE id = $1", E::TABLE);
        sqlx::query_as::<_, E>(&sql)
            .bind(Into::<i32>::into(id))
            .fetch_optional(self.db.pool())
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Insert a row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on a unique or foreign key violation.
    pub async fn insert(&self, input: &E::Input) -> Result<E, RepositoryError> {
        let sql = insert_sql(E::TABLE, E::COLUMNS);
        E::bind_input(input, sqlx::query_as::<_, E>(&sql))
            .fetch_one(self.db.pool())
            .await
            .map_err(RepositoryError::from_write)
    }

    /// Replace every writable column of a row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row has this id.
    /// Returns `RepositoryError::Conflict` on a unique or foreign key violation.
    pub async fn update(&self, id: E::Id, input: &E::Input) -> Result<E, RepositoryError> {
        let sql = update_sql(E::TABLE, E::COLUMNS);
        E::bind_input(input, sqlx::query_as::<_, E>(&sql))
            .bind(Into::<i32>::into(id))
            .fetch_optional(self.db.pool())
            .await
            .map_err(RepositoryError::from_write)?
            .ok_or(RepositoryError::NotFound)
    }

    /// Delete a row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row has this id.
    /// Returns `RepositoryError::Conflict` if other rows still reference it.
    pub async fn delete(&self, id: E::Id) -> Result<(), RepositoryError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", E::TABLE);
        let result = sqlx::query(&sql)
            .bind(Into::<i32>::into(id))
            .execute(self.db.pool())
            .await
            .map_err(RepositoryError::from_write)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// `INSERT INTO t (a, b) VALUES ($1, $2) RETURNING *`
fn insert_sql(table: &str, columns: &[&str]) -> String {
    let placeholders: Vec<String> = (1..=columns.len()).map(|n| format!("${n}")).collect();
    format!(
        "INSERT INTO {table} ({}) VALUES ({}) RETURNING *",
        columns.join(", "),
        placeholders.join(", ")
    )
}

/// `UPDATE t SET a = $1, b = $2, updated_at = NOW() WHERE id = $3 RETURNING *`
fn update_sql(table: &str, columns: &[&str]) -> String {
    let assignments: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(index, column)| format!("{column} = ${}", index + 1))
        .collect();
    format!(
        "UPDATE {table} SET {}, updated_at = NOW() WHERE id = ${} RETURNING *",
        assignments.join(", "),
        columns.len() + 1
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_sql() {
        assert_eq!(
            insert_sql("brand", &["name", "image_url", "is_active"]),
            "INSERT INTO brand (name, image_url, is_active) VALUES ($1, $2, $3) RETURNING *"
        );
    }

    #[test]
    fn test_update_sql_binds_id_last() {
        assert_eq!(
            update_sql("unit", &["name", "abbreviation"]),
            "UPDATE unit SET name = $1, abbreviation = $2, updated_at = NOW() WHERE id = $3 RETURNING *"
        );
    }
}
