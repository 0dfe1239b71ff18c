use std::sync::Arc;

use rr_auth_simple::Argon2Hasher;
use rr_config::Settings;
use rr_core::{CategoryRepo, CredentialHasher, MediaHost, RecipeRepo, UserRepo};
use rr_db_sqlite::SqliteStore;
use rr_services::{AccountService, CategoryService, MediaService, RecipeService};
use rr_storage_local::LocalMediaHost;
use secrecy::ExposeSecret;
use tracing::info;

/// Every service, wired to the concrete plugins.
pub(crate) struct AppState {
    pub recipes: RecipeService,
    pub categories: CategoryService,
    pub media: MediaService,
    pub accounts: AccountService,
    /// Direct port access for operator tasks that bypass the admin gate.
    pub category_repo: Arc<dyn CategoryRepo>,
}

impl AppState {
    pub async fn build(settings: &Settings) -> anyhow::Result<Self> {
        // 1. Initialize Database Implementation
        let store = Arc::new(
            SqliteStore::connect(
                settings.database.url.expose_secret(),
                settings.database.max_connections,
            )
            .await?,
        );
        let recipe_repo: Arc<dyn RecipeRepo> = store.clone();
        let category_repo: Arc<dyn CategoryRepo> = store.clone();
        let user_repo: Arc<dyn UserRepo> = store;

        // 2. Initialize Storage Implementation
        let host: Arc<dyn MediaHost> = Arc::new(LocalMediaHost::new(
            settings.media.root.clone(),
            settings.media.url_prefix.clone(),
            settings.media.max_width,
            settings.media.max_height,
        ));

        // 3. Initialize Auth Implementation
        let hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2Hasher::new());

        info!(media_root = %settings.media.root.display(), "services ready");

        Ok(Self {
            recipes: RecipeService::new(recipe_repo, category_repo.clone(), user_repo.clone()),
            categories: CategoryService::new(category_repo.clone()),
            media: MediaService::new(host, settings.media.max_upload_bytes),
            accounts: AccountService::new(user_repo, hasher),
            category_repo,
        })
    }
}
