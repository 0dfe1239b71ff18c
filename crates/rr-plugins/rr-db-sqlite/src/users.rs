use async_trait::async_trait;
use rr_core::error::Result;
use rr_core::models::{Role, User};
use rr_core::traits::UserRepo;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::{decode_error, map_db_error, SqliteStore};

fn user_from_row(row: &SqliteRow) -> std::result::Result<User, sqlx::Error> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        name: row.try_get("name")?,
        role: role.parse::<Role>().map_err(|err| decode_error("role", err))?,
    })
}

#[async_trait]
impl UserRepo for SqliteStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, email, password_hash, name, role FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| map_db_error(err, "find_user_by_email", email))?;

        row.as_ref()
            .map(user_from_row)
            .transpose()
            .map_err(|err| map_db_error(err, "find_user_by_email", email))
    }

    async fn find_any_admin(&self) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, email, password_hash, name, role FROM users WHERE role = 'admin' LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| map_db_error(err, "find_any_admin", "-"))?;

        row.as_ref()
            .map(user_from_row)
            .transpose()
            .map_err(|err| map_db_error(err, "find_any_admin", "-"))
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, name, role) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user.id)
        .bind(user.email.as_str())
        .bind(user.password_hash.as_str())
        .bind(user.name.as_str())
        .bind(user.role.as_str())
        .execute(&self.pool)
        .await
        .map_err(|err| map_db_error(err, "insert_user", user.id))?;
        Ok(())
    }
}
