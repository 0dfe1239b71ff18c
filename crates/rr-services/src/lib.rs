//! # rr-services
//!
//! Use cases of Rusty-Recipes. Each service owns its ports behind `Arc<dyn _>`
//! and takes the caller's [`RequestContext`](rr_core::RequestContext)
//! explicitly; mutations pass the admin gate before touching storage.

pub mod accounts;
pub mod categories;
pub mod media;
pub mod recipes;

pub use accounts::AccountService;
pub use categories::CategoryService;
pub use media::{MediaService, DEFAULT_MAX_UPLOAD_BYTES};
pub use recipes::{PublicRecipeQuery, RecipeService};
