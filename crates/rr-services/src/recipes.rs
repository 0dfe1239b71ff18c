//! # Recipe service
//!
//! Admin mutations and the public/admin read paths for recipes.
//!
//! Validation and conflicts are detected before any write. The store's own
//! unique constraint is the backstop for concurrent creates: a violation at
//! insert time comes back as the same `Conflict` the pre-check would give.

use std::sync::Arc;

use chrono::Utc;
use rr_core::{
    AppError, AuthorSummary, Category, CategoryRepo, RecipeDetail, RecipeDraft, RecipeFilter,
    RecipePatch, RecipeRepo, RequestContext, Result, UserRepo,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Optional narrowing of the public listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublicRecipeQuery {
    pub category_slug: Option<String>,
    pub featured: Option<bool>,
    /// Newest `limit` rows only, e.g. the home page's latest and featured strips.
    pub limit: Option<u32>,
}

pub struct RecipeService {
    recipes: Arc<dyn RecipeRepo>,
    categories: Arc<dyn CategoryRepo>,
    users: Arc<dyn UserRepo>,
}

impl RecipeService {
    pub fn new(
        recipes: Arc<dyn RecipeRepo>,
        categories: Arc<dyn CategoryRepo>,
        users: Arc<dyn UserRepo>,
    ) -> Self {
        Self {
            recipes,
            categories,
            users,
        }
    }

    /// Creates a recipe authored by the acting admin.
    ///
    /// The author row is looked up by the session's email rather than
    /// trusting the session id; a session whose email has no user row is
    /// refused with `NotFound`.
    #[instrument(skip_all, fields(title = %draft.title))]
    pub async fn create(&self, ctx: &RequestContext, draft: RecipeDraft) -> Result<RecipeDetail> {
        let session = ctx.require_admin()?;
        let fields = draft.validate()?;
        let category = self.existing_category(fields.category_id).await?;

        if self.recipes.recipe_slug_taken(&fields.slug, None).await? {
            return Err(AppError::recipe_slug_taken());
        }

        let author = match self.users.find_user_by_email(&session.email).await? {
            Some(user) => user,
            None => {
                warn!(email = %session.email, "session identity has no matching user row");
                return Err(AppError::not_found("user", &session.email));
            }
        };

        let recipe = fields.into_recipe(Uuid::now_v7(), author.id, Utc::now());
        self.recipes.insert_recipe(&recipe).await?;
        info!(recipe_id = %recipe.id, slug = %recipe.slug, author = %author.email, "recipe created");

        Ok(RecipeDetail {
            recipe,
            category,
            author: AuthorSummary::from(&author),
        })
    }

    /// Full replace of every mutable field. The author never changes.
    #[instrument(skip_all, fields(recipe_id = %id))]
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        draft: RecipeDraft,
    ) -> Result<RecipeDetail> {
        ctx.require_admin()?;
        let existing = self
            .recipes
            .get_recipe(id)
            .await?
            .ok_or_else(|| AppError::not_found("recipe", id))?;
        let fields = draft.validate()?;

        if self.recipes.recipe_slug_taken(&fields.slug, Some(id)).await? {
            return Err(AppError::recipe_slug_taken());
        }
        let category = self.existing_category(fields.category_id).await?;

        let recipe = fields.replace(existing.recipe, Utc::now());
        if !self.recipes.update_recipe(&recipe).await? {
            return Err(AppError::not_found("recipe", id));
        }
        info!(slug = %recipe.slug, "recipe updated");

        Ok(RecipeDetail {
            recipe,
            category,
            author: existing.author,
        })
    }

    /// Applies only the flags present in `patch`; `updated_at` always moves.
    #[instrument(skip_all, fields(recipe_id = %id))]
    pub async fn patch(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        patch: RecipePatch,
    ) -> Result<RecipeDetail> {
        ctx.require_admin()?;
        let found = self
            .recipes
            .set_recipe_flags(id, patch.published, patch.featured, Utc::now())
            .await?;
        if !found {
            return Err(AppError::not_found("recipe", id));
        }
        info!(published = ?patch.published, featured = ?patch.featured, "recipe flags patched");

        self.recipes
            .get_recipe(id)
            .await?
            .ok_or_else(|| AppError::not_found("recipe", id))
    }

    /// Removes the row. Any image it referenced stays on the media host.
    #[instrument(skip_all, fields(recipe_id = %id))]
    pub async fn delete(&self, ctx: &RequestContext, id: Uuid) -> Result<()> {
        ctx.require_admin()?;
        if !self.recipes.delete_recipe(id).await? {
            return Err(AppError::not_found("recipe", id));
        }
        info!("recipe deleted");
        Ok(())
    }

    /// Admin read of a single recipe regardless of publication state.
    pub async fn get_by_id(&self, ctx: &RequestContext, id: Uuid) -> Result<RecipeDetail> {
        ctx.require_admin()?;
        self.recipes
            .get_recipe(id)
            .await?
            .ok_or_else(|| AppError::not_found("recipe", id))
    }

    /// Public read: unpublished recipes are invisible even by exact slug.
    pub async fn get_by_slug_published(&self, slug: &str) -> Result<RecipeDetail> {
        self.recipes
            .get_recipe_by_slug(slug, true)
            .await?
            .ok_or_else(|| AppError::not_found("recipe", slug))
    }

    pub async fn list_published(&self, query: PublicRecipeQuery) -> Result<Vec<RecipeDetail>> {
        let filter = RecipeFilter {
            category_slug: query.category_slug,
            featured: query.featured,
            limit: query.limit,
            ..RecipeFilter::published()
        };
        self.recipes.list_recipes(&filter).await
    }

    pub async fn list_all_for_admin(&self, ctx: &RequestContext) -> Result<Vec<RecipeDetail>> {
        ctx.require_admin()?;
        self.recipes.list_recipes(&RecipeFilter::all()).await
    }

    async fn existing_category(&self, id: Uuid) -> Result<Category> {
        self.categories
            .get_category(id)
            .await?
            .ok_or_else(|| AppError::validation("categoryId", "category not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::*;
    use rr_core::{ErrorKind, MockCategoryRepo, MockRecipeRepo, MockUserRepo};

    fn service(
        recipes: MockRecipeRepo,
        categories: MockCategoryRepo,
        users: MockUserRepo,
    ) -> RecipeService {
        RecipeService::new(Arc::new(recipes), Arc::new(categories), Arc::new(users))
    }

    fn untouched() -> RecipeService {
        service(MockRecipeRepo::new(), MockCategoryRepo::new(), MockUserRepo::new())
    }

    #[tokio::test]
    async fn create_persists_with_author_resolved_by_email() {
        let category = soups();
        let author = admin_user();

        let mut categories = MockCategoryRepo::new();
        let found = category.clone();
        categories
            .expect_get_category()
            .times(1)
            .returning(move |_| Ok(Some(found.clone())));

        let mut users = MockUserRepo::new();
        let row = author.clone();
        users
            .expect_find_user_by_email()
            .withf(|email| email == "admin@example.com")
            .times(1)
            .returning(move |_| Ok(Some(row.clone())));

        let mut recipes = MockRecipeRepo::new();
        recipes
            .expect_recipe_slug_taken()
            .withf(|slug, excluding| slug == "borsch" && excluding.is_none())
            .times(1)
            .returning(|_, _| Ok(false));
        let author_id = author.id;
        recipes
            .expect_insert_recipe()
            .withf(move |recipe| {
                recipe.author_id == author_id && !recipe.published && !recipe.featured
            })
            .times(1)
            .returning(|_| Ok(()));

        let created = service(recipes, categories, users)
            .create(&admin_ctx(), borsch_draft(category.id))
            .await
            .unwrap();

        assert_eq!(created.recipe.slug, "borsch");
        assert_eq!(created.category, category);
        assert_eq!(created.author.email, "admin@example.com");
    }

    #[tokio::test]
    async fn create_is_gated_before_any_storage_access() {
        let svc = untouched();
        let draft = borsch_draft(Uuid::now_v7());

        let err = svc.create(&RequestContext::anonymous(), draft.clone()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);

        let err = svc.create(&reader_ctx(), draft).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn create_rejects_missing_title_without_touching_storage() {
        let draft = RecipeDraft {
            title: "   ".into(),
            category_id: Some(Uuid::now_v7()),
            ..Default::default()
        };
        let err = untouched().create(&admin_ctx(), draft).await.unwrap_err();
        assert_eq!(err.field(), Some("title"));
    }

    #[tokio::test]
    async fn create_with_unknown_category_is_a_validation_error() {
        let mut categories = MockCategoryRepo::new();
        categories.expect_get_category().returning(|_| Ok(None));
        let mut recipes = MockRecipeRepo::new();
        recipes.expect_insert_recipe().never();

        let err = service(recipes, categories, MockUserRepo::new())
            .create(&admin_ctx(), borsch_draft(Uuid::now_v7()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.field(), Some("categoryId"));
    }

    #[tokio::test]
    async fn create_with_taken_slug_conflicts() {
        let category = soups();
        let mut categories = MockCategoryRepo::new();
        categories
            .expect_get_category()
            .returning(move |_| Ok(Some(category.clone())));
        let mut recipes = MockRecipeRepo::new();
        recipes.expect_recipe_slug_taken().returning(|_, _| Ok(true));
        recipes.expect_insert_recipe().never();

        let err = service(recipes, categories, MockUserRepo::new())
            .create(&admin_ctx(), borsch_draft(Uuid::now_v7()))
            .await
            .unwrap_err();
        assert_eq!(err, AppError::recipe_slug_taken());
    }

    #[tokio::test]
    async fn create_without_matching_user_row_fails_hard() {
        let category = soups();
        let mut categories = MockCategoryRepo::new();
        categories
            .expect_get_category()
            .returning(move |_| Ok(Some(category.clone())));
        let mut recipes = MockRecipeRepo::new();
        recipes.expect_recipe_slug_taken().returning(|_, _| Ok(false));
        recipes.expect_insert_recipe().never();
        let mut users = MockUserRepo::new();
        users.expect_find_user_by_email().returning(|_| Ok(None));

        let err = service(recipes, categories, users)
            .create(&admin_ctx(), borsch_draft(Uuid::now_v7()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn unique_violation_at_insert_surfaces_as_conflict() {
        let category = soups();
        let mut categories = MockCategoryRepo::new();
        categories
            .expect_get_category()
            .returning(move |_| Ok(Some(category.clone())));
        let mut users = MockUserRepo::new();
        users
            .expect_find_user_by_email()
            .returning(|_| Ok(Some(admin_user())));
        let mut recipes = MockRecipeRepo::new();
        recipes.expect_recipe_slug_taken().returning(|_, _| Ok(false));
        recipes
            .expect_insert_recipe()
            .returning(|_| Err(AppError::recipe_slug_taken()));

        let err = service(recipes, categories, users)
            .create(&admin_ctx(), borsch_draft(Uuid::now_v7()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn update_keeps_author_and_creation_time() {
        let category = soups();
        let author = admin_user();
        let existing = borsch_detail(&category, &author);
        let id = existing.recipe.id;
        let created_at = existing.recipe.created_at;

        let mut recipes = MockRecipeRepo::new();
        let current = existing.clone();
        recipes
            .expect_get_recipe()
            .returning(move |_| Ok(Some(current.clone())));
        recipes
            .expect_recipe_slug_taken()
            .withf(move |slug, excluding| slug == "borsch-zelenyy" && *excluding == Some(id))
            .returning(|_, _| Ok(false));
        recipes
            .expect_update_recipe()
            .withf(move |recipe| {
                recipe.id == id && recipe.author_id == author.id && recipe.created_at == created_at
            })
            .times(1)
            .returning(|_| Ok(true));
        let mut categories = MockCategoryRepo::new();
        let found = category.clone();
        categories
            .expect_get_category()
            .returning(move |_| Ok(Some(found.clone())));

        let draft = RecipeDraft {
            title: "Борщ зелёный".into(),
            slug: Some("borsch-zelenyy".into()),
            published: true,
            ..borsch_draft(category.id)
        };
        let updated = service(recipes, categories, MockUserRepo::new())
            .update(&admin_ctx(), id, draft)
            .await
            .unwrap();

        assert_eq!(updated.recipe.title, "Борщ зелёный");
        assert!(updated.recipe.published);
        assert_eq!(updated.author, existing.author);
        assert!(updated.recipe.updated_at >= existing.recipe.updated_at);
    }

    #[tokio::test]
    async fn update_of_missing_recipe_is_not_found() {
        let mut recipes = MockRecipeRepo::new();
        recipes.expect_get_recipe().returning(|_| Ok(None));
        recipes.expect_update_recipe().never();

        let err = service(recipes, MockCategoryRepo::new(), MockUserRepo::new())
            .update(&admin_ctx(), Uuid::now_v7(), borsch_draft(Uuid::now_v7()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn update_with_unknown_category_is_a_validation_error() {
        let existing = borsch_detail(&soups(), &admin_user());
        let id = existing.recipe.id;
        let mut recipes = MockRecipeRepo::new();
        recipes
            .expect_get_recipe()
            .returning(move |_| Ok(Some(existing.clone())));
        recipes.expect_recipe_slug_taken().returning(|_, _| Ok(false));
        recipes.expect_update_recipe().never();
        let mut categories = MockCategoryRepo::new();
        categories.expect_get_category().returning(|_| Ok(None));

        let err = service(recipes, categories, MockUserRepo::new())
            .update(&admin_ctx(), id, borsch_draft(Uuid::now_v7()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.field(), Some("categoryId"));
    }

    #[tokio::test]
    async fn update_conflicts_on_slug_owned_by_another_recipe() {
        let existing = borsch_detail(&soups(), &admin_user());
        let mut recipes = MockRecipeRepo::new();
        recipes
            .expect_get_recipe()
            .returning(move |_| Ok(Some(existing.clone())));
        recipes.expect_recipe_slug_taken().returning(|_, _| Ok(true));
        recipes.expect_update_recipe().never();

        let err = service(recipes, MockCategoryRepo::new(), MockUserRepo::new())
            .update(&admin_ctx(), Uuid::now_v7(), borsch_draft(Uuid::now_v7()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn patch_forwards_only_present_flags() {
        let detail = borsch_detail(&soups(), &admin_user());
        let id = detail.recipe.id;
        let mut recipes = MockRecipeRepo::new();
        recipes
            .expect_set_recipe_flags()
            .withf(move |target, published, featured, _| {
                *target == id && *published == Some(true) && featured.is_none()
            })
            .times(1)
            .returning(|_, _, _, _| Ok(true));
        recipes
            .expect_get_recipe()
            .returning(move |_| Ok(Some(detail.clone())));

        service(recipes, MockCategoryRepo::new(), MockUserRepo::new())
            .patch(&admin_ctx(), id, RecipePatch::publish(true))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn patch_and_delete_of_missing_recipe_are_not_found() {
        let mut recipes = MockRecipeRepo::new();
        recipes.expect_set_recipe_flags().returning(|_, _, _, _| Ok(false));
        recipes.expect_delete_recipe().returning(|_| Ok(false));
        let svc = service(recipes, MockCategoryRepo::new(), MockUserRepo::new());

        let err = svc
            .patch(&admin_ctx(), Uuid::now_v7(), RecipePatch::feature(true))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = svc.delete(&admin_ctx(), Uuid::now_v7()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn every_mutation_and_admin_read_is_gated() {
        let svc = untouched();
        let id = Uuid::now_v7();
        for ctx in [RequestContext::anonymous(), reader_ctx()] {
            assert!(svc.update(&ctx, id, borsch_draft(id)).await.is_err());
            assert!(svc.patch(&ctx, id, RecipePatch::publish(true)).await.is_err());
            assert!(svc.delete(&ctx, id).await.is_err());
            assert!(svc.get_by_id(&ctx, id).await.is_err());
            assert!(svc.list_all_for_admin(&ctx).await.is_err());
        }
    }

    #[tokio::test]
    async fn public_reads_ask_for_published_rows_only() {
        let mut recipes = MockRecipeRepo::new();
        recipes
            .expect_get_recipe_by_slug()
            .withf(|slug, published_only| slug == "borsch" && *published_only)
            .returning(|_, _| Ok(None));
        recipes
            .expect_list_recipes()
            .withf(|filter| {
                filter.published_only
                    && filter.category_slug.as_deref() == Some("supy")
                    && filter.limit == Some(6)
            })
            .returning(|_| Ok(Vec::new()));
        let svc = service(recipes, MockCategoryRepo::new(), MockUserRepo::new());

        let err = svc.get_by_slug_published("borsch").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let listed = svc
            .list_published(PublicRecipeQuery {
                category_slug: Some("supy".into()),
                featured: None,
                limit: Some(6),
            })
            .await
            .unwrap();
        assert!(listed.is_empty());
    }
}
