use async_trait::async_trait;
use rr_core::error::Result;
use rr_core::models::{Category, CategorySummary};
use rr_core::traits::CategoryRepo;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use crate::{map_db_error, SqliteStore};

// Drafts do not count towards a category's total.
const CATEGORY_SUMMARY_SELECT: &str = "SELECT c.id, c.name, c.slug, \
     COUNT(r.id) AS published_recipes \
     FROM categories c \
     LEFT JOIN recipes r ON r.category_id = c.id AND r.published = 1";

fn summary_from_row(row: &SqliteRow) -> std::result::Result<CategorySummary, sqlx::Error> {
    Ok(CategorySummary {
        category: Category {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            slug: row.try_get("slug")?,
        },
        published_recipes: row.try_get("published_recipes")?,
    })
}

#[async_trait]
impl CategoryRepo for SqliteStore {
    async fn get_category(&self, id: Uuid) -> Result<Option<Category>> {
        let row = sqlx::query("SELECT id, name, slug FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| map_db_error(err, "get_category", id))?;

        row.map(|row| {
            Ok(Category {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                slug: row.try_get("slug")?,
            })
        })
        .transpose()
        .map_err(|err| map_db_error(err, "get_category", id))
    }

    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<CategorySummary>> {
        let row = sqlx::query(&format!(
            "{CATEGORY_SUMMARY_SELECT} WHERE c.slug = ? GROUP BY c.id, c.name, c.slug"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| map_db_error(err, "get_category_by_slug", slug))?;

        row.as_ref()
            .map(summary_from_row)
            .transpose()
            .map_err(|err| map_db_error(err, "get_category_by_slug", slug))
    }

    async fn category_exists(&self, name: &str, slug: &str) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM categories WHERE name = ? OR slug = ?)",
        )
        .bind(name)
        .bind(slug)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| map_db_error(err, "category_exists", slug))
    }

    async fn insert_category(&self, category: &Category) -> Result<()> {
        sqlx::query("INSERT INTO categories (id, name, slug) VALUES (?, ?, ?)")
            .bind(category.id)
            .bind(category.name.as_str())
            .bind(category.slug.as_str())
            .execute(&self.pool)
            .await
            .map_err(|err| map_db_error(err, "insert_category", &category.slug))?;
        Ok(())
    }

    async fn ensure_category(&self, category: &Category) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO categories (id, name, slug) VALUES (?, ?, ?) ON CONFLICT DO NOTHING",
        )
        .bind(category.id)
        .bind(category.name.as_str())
        .bind(category.slug.as_str())
        .execute(&self.pool)
        .await
        .map_err(|err| map_db_error(err, "ensure_category", &category.slug))?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_categories(&self) -> Result<Vec<CategorySummary>> {
        let rows = sqlx::query(&format!(
            "{CATEGORY_SUMMARY_SELECT} GROUP BY c.id, c.name, c.slug ORDER BY c.name ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|err| map_db_error(err, "list_categories", "-"))?;

        rows.iter()
            .map(summary_from_row)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|err| map_db_error(err, "list_categories", "-"))
    }
}
