//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.
//! Adapters translate their own failures into [`AppError`](crate::AppError):
//! a unique-constraint hit is a `Conflict`, never an `Internal`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Category, CategorySummary, ImageUpload, Recipe, RecipeDetail, UploadedImage, User};

/// Server-side filter for recipe listings. Results are newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub published_only: bool,
    pub category_slug: Option<String>,
    pub featured: Option<bool>,
    pub limit: Option<u32>,
}

impl RecipeFilter {
    pub fn published() -> Self {
        Self {
            published_only: true,
            ..Self::default()
        }
    }

    pub fn all() -> Self {
        Self::default()
    }
}

/// Persistence contract for recipes. Reads always join category and author.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait RecipeRepo: Send + Sync {
    async fn get_recipe(&self, id: Uuid) -> Result<Option<RecipeDetail>>;
    async fn get_recipe_by_slug(&self, slug: &str, published_only: bool) -> Result<Option<RecipeDetail>>;
    /// Whether another recipe (other than `excluding`) already owns `slug`.
    async fn recipe_slug_taken(&self, slug: &str, excluding: Option<Uuid>) -> Result<bool>;
    async fn list_recipes(&self, filter: &RecipeFilter) -> Result<Vec<RecipeDetail>>;
    async fn insert_recipe(&self, recipe: &Recipe) -> Result<()>;
    /// Overwrites every mutable column. `Ok(false)` when the row is gone.
    async fn update_recipe(&self, recipe: &Recipe) -> Result<bool>;
    /// Sets only the flags that are `Some`, in one statement.
    async fn set_recipe_flags(
        &self,
        id: Uuid,
        published: Option<bool>,
        featured: Option<bool>,
        updated_at: DateTime<Utc>,
    ) -> Result<bool>;
    async fn delete_recipe(&self, id: Uuid) -> Result<bool>;
}

/// Persistence contract for categories.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CategoryRepo: Send + Sync {
    async fn get_category(&self, id: Uuid) -> Result<Option<Category>>;
    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<CategorySummary>>;
    /// Whether a category already uses `name` or `slug`.
    async fn category_exists(&self, name: &str, slug: &str) -> Result<bool>;
    async fn insert_category(&self, category: &Category) -> Result<()>;
    /// Inserts unless the slug is taken; `Ok(true)` when a row was created.
    async fn ensure_category(&self, category: &Category) -> Result<bool>;
    /// Every category with its published-recipe count, ordered by name.
    async fn list_categories(&self) -> Result<Vec<CategorySummary>>;
}

/// Identity store.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_any_admin(&self) -> Result<Option<User>>;
    async fn insert_user(&self, user: &User) -> Result<()>;
}

/// Third-party image host. Failures surface as `Upstream`; nothing retries.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MediaHost: Send + Sync {
    async fn upload(&self, upload: &ImageUpload) -> Result<UploadedImage>;
    /// Removing an asset that does not exist is not an error.
    async fn delete(&self, public_id: &str) -> Result<()>;
}

/// Password hashing and verification.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait CredentialHasher: Send + Sync {
    fn hash_password(&self, password: &str) -> Result<String>;
    /// Verifies if a provided password matches a stored hash.
    fn verify_password(&self, password: &str, hash: &str) -> bool;
}
