//! rusty-recipes/crates/rr-core/src/lib.rs
//!
//! The central domain logic and interface definitions for Rusty-Recipes.

pub mod context;
pub mod error;
pub mod input;
pub mod models;
pub mod slug;
pub mod traits;

// Re-exporting for easier access in other crates
pub use context::*;
pub use error::*;
pub use input::{RecipeDraft, RecipeFields, RecipePatch};
pub use models::*;
pub use traits::*;
