use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rr_core::error::{AppError, Result};
use rr_core::models::{AuthorSummary, Category, Difficulty, Recipe, RecipeDetail};
use rr_core::traits::{RecipeFilter, RecipeRepo};
use serde::de::DeserializeOwned;
use sqlx::sqlite::{Sqlite, SqliteRow};
use sqlx::{QueryBuilder, Row};
use uuid::Uuid;

use crate::{decode_error, is_foreign_key_violation, map_db_error, SqliteStore};

const RECIPE_DETAIL_SELECT: &str = "SELECT r.id, r.title, r.slug, r.description, r.content, \
     r.main_image, r.prep_time, r.cook_time, r.servings, r.difficulty, r.category_id, \
     r.author_id, r.published, r.featured, r.ingredients, r.instructions, r.created_at, \
     r.updated_at, c.name AS category_name, c.slug AS category_slug, \
     u.name AS author_name, u.email AS author_email \
     FROM recipes r \
     JOIN categories c ON c.id = r.category_id \
     JOIN users u ON u.id = r.author_id";

impl SqliteStore {
    /// SQLite reports a failed foreign key without naming it, so find out
    /// which parent row the recipe points at is missing.
    async fn missing_parent(&self, recipe: &Recipe) -> AppError {
        let category_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM categories WHERE id = ?)")
                .bind(recipe.category_id)
                .fetch_one(&self.pool)
                .await;
        match category_exists {
            Ok(false) => AppError::validation("categoryId", "category not found"),
            Ok(true) => AppError::validation("authorId", "author not found"),
            Err(err) => map_db_error(err, "missing_parent", recipe.id),
        }
    }
}

fn decode_json<T: DeserializeOwned>(row: &SqliteRow, column: &str) -> std::result::Result<T, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    serde_json::from_str(&raw).map_err(|err| decode_error(column, err))
}

fn encode_json<T: serde::Serialize>(value: &T, column: &str) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|err| AppError::internal(format!("encoding {column} failed: {err}")))
}

/// Maps a joined row back to the domain model.
fn detail_from_row(row: &SqliteRow) -> std::result::Result<RecipeDetail, sqlx::Error> {
    let difficulty = row
        .try_get::<Option<String>, _>("difficulty")?
        .map(|raw| raw.parse::<Difficulty>())
        .transpose()
        .map_err(|err| decode_error("difficulty", err))?;

    let category_id: Uuid = row.try_get("category_id")?;
    let recipe = Recipe {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        description: row.try_get("description")?,
        content: row.try_get("content")?,
        main_image: row.try_get("main_image")?,
        prep_time: row.try_get("prep_time")?,
        cook_time: row.try_get("cook_time")?,
        servings: row.try_get("servings")?,
        difficulty,
        category_id,
        author_id: row.try_get("author_id")?,
        published: row.try_get("published")?,
        featured: row.try_get("featured")?,
        ingredients: decode_json(row, "ingredients")?,
        instructions: decode_json(row, "instructions")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    };

    Ok(RecipeDetail {
        recipe,
        category: Category {
            id: category_id,
            name: row.try_get("category_name")?,
            slug: row.try_get("category_slug")?,
        },
        author: AuthorSummary {
            name: row.try_get("author_name")?,
            email: row.try_get("author_email")?,
        },
    })
}

#[async_trait]
impl RecipeRepo for SqliteStore {
    async fn get_recipe(&self, id: Uuid) -> Result<Option<RecipeDetail>> {
        let row = sqlx::query(&format!("{RECIPE_DETAIL_SELECT} WHERE r.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| map_db_error(err, "get_recipe", id))?;

        row.as_ref()
            .map(detail_from_row)
            .transpose()
            .map_err(|err| map_db_error(err, "get_recipe", id))
    }

    async fn get_recipe_by_slug(&self, slug: &str, published_only: bool) -> Result<Option<RecipeDetail>> {
        let mut query = QueryBuilder::<Sqlite>::new(RECIPE_DETAIL_SELECT);
        query.push(" WHERE r.slug = ").push_bind(slug);
        if published_only {
            query.push(" AND r.published = 1");
        }

        let row = query
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| map_db_error(err, "get_recipe_by_slug", slug))?;

        row.as_ref()
            .map(detail_from_row)
            .transpose()
            .map_err(|err| map_db_error(err, "get_recipe_by_slug", slug))
    }

    async fn recipe_slug_taken(&self, slug: &str, excluding: Option<Uuid>) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM recipes WHERE slug = ? AND (? IS NULL OR id <> ?))",
        )
        .bind(slug)
        .bind(excluding)
        .bind(excluding)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| map_db_error(err, "recipe_slug_taken", slug))
    }

    async fn list_recipes(&self, filter: &RecipeFilter) -> Result<Vec<RecipeDetail>> {
        let mut query = QueryBuilder::<Sqlite>::new(RECIPE_DETAIL_SELECT);
        query.push(" WHERE 1 = 1");
        if filter.published_only {
            query.push(" AND r.published = 1");
        }
        if let Some(slug) = &filter.category_slug {
            query.push(" AND c.slug = ").push_bind(slug.as_str());
        }
        if let Some(featured) = filter.featured {
            query.push(" AND r.featured = ").push_bind(featured);
        }
        // v7 ids are time-ordered, so they break ties between equal timestamps.
        query.push(" ORDER BY r.created_at DESC, r.id DESC");
        if let Some(limit) = filter.limit {
            query.push(" LIMIT ").push_bind(i64::from(limit));
        }

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|err| map_db_error(err, "list_recipes", "-"))?;

        rows.iter()
            .map(detail_from_row)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|err| map_db_error(err, "list_recipes", "-"))
    }

    async fn insert_recipe(&self, recipe: &Recipe) -> Result<()> {
        let ingredients = encode_json(&recipe.ingredients, "ingredients")?;
        let instructions = encode_json(&recipe.instructions, "instructions")?;

        let result = sqlx::query(
            "INSERT INTO recipes (id, title, slug, description, content, main_image, prep_time, \
             cook_time, servings, difficulty, category_id, author_id, published, featured, \
             ingredients, instructions, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(recipe.id)
        .bind(recipe.title.as_str())
        .bind(recipe.slug.as_str())
        .bind(recipe.description.as_deref())
        .bind(recipe.content.as_str())
        .bind(recipe.main_image.as_deref())
        .bind(recipe.prep_time)
        .bind(recipe.cook_time)
        .bind(recipe.servings)
        .bind(recipe.difficulty.map(|d| d.as_str()))
        .bind(recipe.category_id)
        .bind(recipe.author_id)
        .bind(recipe.published)
        .bind(recipe.featured)
        .bind(ingredients)
        .bind(instructions)
        .bind(recipe.created_at)
        .bind(recipe.updated_at)
        .execute(&self.pool)
        .await;
        match result {
            Ok(_) => Ok(()),
            Err(err) if is_foreign_key_violation(&err) => Err(self.missing_parent(recipe).await),
            Err(err) => Err(map_db_error(err, "insert_recipe", recipe.id)),
        }
    }

    async fn update_recipe(&self, recipe: &Recipe) -> Result<bool> {
        let ingredients = encode_json(&recipe.ingredients, "ingredients")?;
        let instructions = encode_json(&recipe.instructions, "instructions")?;

        let result = sqlx::query(
            "UPDATE recipes SET title = ?, slug = ?, description = ?, content = ?, \
             main_image = ?, prep_time = ?, cook_time = ?, servings = ?, difficulty = ?, \
             category_id = ?, published = ?, featured = ?, ingredients = ?, instructions = ?, \
             updated_at = ? \
             WHERE id = ?",
        )
        .bind(recipe.title.as_str())
        .bind(recipe.slug.as_str())
        .bind(recipe.description.as_deref())
        .bind(recipe.content.as_str())
        .bind(recipe.main_image.as_deref())
        .bind(recipe.prep_time)
        .bind(recipe.cook_time)
        .bind(recipe.servings)
        .bind(recipe.difficulty.map(|d| d.as_str()))
        .bind(recipe.category_id)
        .bind(recipe.published)
        .bind(recipe.featured)
        .bind(ingredients)
        .bind(instructions)
        .bind(recipe.updated_at)
        .bind(recipe.id)
        .execute(&self.pool)
        .await;
        match result {
            Ok(done) => Ok(done.rows_affected() > 0),
            Err(err) if is_foreign_key_violation(&err) => Err(self.missing_parent(recipe).await),
            Err(err) => Err(map_db_error(err, "update_recipe", recipe.id)),
        }
    }

    async fn set_recipe_flags(
        &self,
        id: Uuid,
        published: Option<bool>,
        featured: Option<bool>,
        updated_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE recipes SET published = COALESCE(?, published), \
             featured = COALESCE(?, featured), updated_at = ? \
             WHERE id = ?",
        )
        .bind(published)
        .bind(featured)
        .bind(updated_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|err| map_db_error(err, "set_recipe_flags", id))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_recipe(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|err| map_db_error(err, "delete_recipe", id))?;
        Ok(result.rows_affected() > 0)
    }
}
