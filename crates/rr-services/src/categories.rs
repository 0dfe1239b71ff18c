//! # Category service
//!
//! Categories are created by an admin and listed publicly. There is no
//! update or delete: categories are permanent once created.

use std::sync::Arc;

use rr_core::slug::slugify;
use rr_core::{AppError, Category, CategoryRepo, CategorySummary, RequestContext, Result};
use tracing::{info, instrument};
use uuid::Uuid;

pub struct CategoryService {
    categories: Arc<dyn CategoryRepo>,
}

impl CategoryService {
    pub fn new(categories: Arc<dyn CategoryRepo>) -> Self {
        Self { categories }
    }

    /// Creates a category whose slug is derived from `name`.
    #[instrument(skip_all, fields(name = %name))]
    pub async fn create(&self, ctx: &RequestContext, name: &str) -> Result<Category> {
        ctx.require_admin()?;

        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("name", "category name is required"));
        }
        let slug = slugify(name);
        if slug.is_empty() {
            return Err(AppError::validation(
                "name",
                "category name must contain at least one letter or digit",
            ));
        }

        if self.categories.category_exists(name, &slug).await? {
            return Err(AppError::category_name_taken());
        }

        let category = Category {
            id: Uuid::now_v7(),
            name: name.to_string(),
            slug,
        };
        self.categories.insert_category(&category).await?;
        info!(category_id = %category.id, slug = %category.slug, "category created");
        Ok(category)
    }

    /// Public listing with published-recipe counts, ordered by name.
    pub async fn list_with_published_counts(&self) -> Result<Vec<CategorySummary>> {
        self.categories.list_categories().await
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<CategorySummary> {
        self.categories
            .get_category_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::not_found("category", slug))
    }
}
