//! One function per subcommand. Results are printed to stdout as JSON.

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::Context;
use bytes::Bytes;
use rr_core::slug::slugify;
use rr_core::{Category, ImageUpload, RecipeDraft, RecipePatch, RequestContext};
use rr_services::PublicRecipeQuery;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::cli::Command;
use crate::state::AppState;

/// Stock categories offered on a fresh install.
const SEED_CATEGORIES: &[&str] = &[
    "Супы",
    "Вторые блюда",
    "Салаты",
    "Закуски",
    "Десерты",
    "Выпечка",
    "Напитки",
    "Соусы",
];

pub(crate) async fn run(state: &AppState, command: Command) -> anyhow::Result<()> {
    match command {
        // Connecting already applied the migrations.
        Command::Migrate => {
            info!("database is up to date");
            Ok(())
        }
        Command::CreateAdmin { name, email } => {
            let password = read_password()?;
            let user = state
                .accounts
                .provision_admin(&name, &email, password.expose_secret())
                .await?;
            print_json(&serde_json::json!({ "id": user.id, "email": user.email, "name": user.name }))
        }
        Command::Login { email } => {
            let password = read_password()?;
            let session = state.accounts.authenticate(&email, password.expose_secret()).await?;
            print_json(&serde_json::json!({
                "email": session.email,
                "name": session.name,
                "role": session.role,
            }))
        }
        Command::SeedCategories => seed_categories(state).await,
        Command::AddCategory { name, email } => {
            let ctx = sign_in(state, &email).await?;
            print_json(&state.categories.create(&ctx, &name).await?)
        }
        Command::Categories => print_json(&state.categories.list_with_published_counts().await?),
        Command::Recipes {
            all,
            category,
            featured,
            limit,
            email,
        } => match (all, email) {
            (true, Some(email)) => {
                let ctx = sign_in(state, &email).await?;
                print_json(&state.recipes.list_all_for_admin(&ctx).await?)
            }
            _ => {
                let query = PublicRecipeQuery {
                    category_slug: category,
                    featured,
                    limit,
                };
                print_json(&state.recipes.list_published(query).await?)
            }
        },
        Command::Recipe { slug } => print_json(&state.recipes.get_by_slug_published(&slug).await?),
        Command::CreateRecipe { draft, email } => {
            let draft = read_draft(&draft)?;
            let ctx = sign_in(state, &email).await?;
            print_json(&state.recipes.create(&ctx, draft).await?)
        }
        Command::UpdateRecipe { id, draft, email } => {
            let draft = read_draft(&draft)?;
            let ctx = sign_in(state, &email).await?;
            print_json(&state.recipes.update(&ctx, id, draft).await?)
        }
        Command::SetFlags {
            id,
            published,
            featured,
            email,
        } => {
            let ctx = sign_in(state, &email).await?;
            let patch = RecipePatch { published, featured };
            print_json(&state.recipes.patch(&ctx, id, patch).await?)
        }
        Command::DeleteRecipe { id, email } => {
            let ctx = sign_in(state, &email).await?;
            state.recipes.delete(&ctx, id).await?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
        Command::UploadImage { path, email } => {
            let upload = read_image(&path)?;
            let ctx = sign_in(state, &email).await?;
            print_json(&state.media.upload(&ctx, upload).await?)
        }
        Command::DeleteImage { public_id, email } => {
            let ctx = sign_in(state, &email).await?;
            state.media.delete(&ctx, &public_id).await?;
            print_json(&serde_json::json!({ "deleted": public_id }))
        }
    }
}

async fn seed_categories(state: &AppState) -> anyhow::Result<()> {
    let mut created = 0;
    for name in SEED_CATEGORIES {
        let category = Category {
            id: Uuid::now_v7(),
            name: (*name).to_string(),
            slug: slugify(name),
        };
        if state.category_repo.ensure_category(&category).await? {
            info!(slug = %category.slug, "category seeded");
            created += 1;
        }
    }
    print_json(&serde_json::json!({ "created": created, "total": SEED_CATEGORIES.len() }))
}

async fn sign_in(state: &AppState, email: &str) -> anyhow::Result<RequestContext> {
    let password = read_password()?;
    Ok(state.accounts.sign_in(email, password.expose_secret()).await?)
}

/// Reads one line from stdin; works both interactively and piped.
fn read_password() -> anyhow::Result<SecretString> {
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    Ok(SecretString::from(password))
}

fn read_draft(path: &Path) -> anyhow::Result<RecipeDraft> {
    let raw = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("parsing recipe draft {}", path.display()))
}

fn read_image(path: &Path) -> anyhow::Result<ImageUpload> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(ImageUpload {
        file_name,
        content_type: mime_guess::from_path(path).first_or_octet_stream(),
        bytes: Bytes::from(bytes),
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value)?;
    println!("{out}");
    Ok(())
}
