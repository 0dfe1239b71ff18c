use std::path::PathBuf;

use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "rusty-recipes", author, version, about = "Recipe publishing core")]
pub(crate) struct Cli {
    /// Settings file; defaults to ./rusty-recipes.toml when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Create or upgrade the database schema.
    Migrate,
    /// Provision the single administrator account. Reads the password from stdin.
    CreateAdmin {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    /// Check administrator credentials. Reads the password from stdin.
    Login {
        #[arg(long)]
        email: String,
    },
    /// Insert the stock categories, skipping any that already exist.
    SeedCategories,
    /// Add one category (admin).
    AddCategory {
        name: String,
        #[arg(long)]
        email: String,
    },
    /// List categories with their published-recipe counts.
    Categories,
    /// List recipes, newest first.
    Recipes {
        /// Include drafts (admin).
        #[arg(long, requires = "email")]
        all: bool,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        featured: Option<bool>,
        /// Show only the newest N recipes.
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        email: Option<String>,
    },
    /// Show one published recipe.
    Recipe { slug: String },
    /// Create a recipe from a JSON draft file (admin).
    CreateRecipe {
        draft: PathBuf,
        #[arg(long)]
        email: String,
    },
    /// Replace a recipe from a JSON draft file (admin).
    UpdateRecipe {
        id: Uuid,
        draft: PathBuf,
        #[arg(long)]
        email: String,
    },
    /// Toggle publication or featured flags (admin).
    SetFlags {
        id: Uuid,
        #[arg(long)]
        published: Option<bool>,
        #[arg(long)]
        featured: Option<bool>,
        #[arg(long)]
        email: String,
    },
    /// Delete a recipe (admin).
    DeleteRecipe {
        id: Uuid,
        #[arg(long)]
        email: String,
    },
    /// Upload an image to the media host (admin).
    UploadImage {
        path: PathBuf,
        #[arg(long)]
        email: String,
    },
    /// Remove an image from the media host (admin).
    DeleteImage {
        public_id: String,
        #[arg(long)]
        email: String,
    },
}
