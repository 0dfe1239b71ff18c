//! # Admin input
//!
//! Typed request bodies for recipe mutations. Every loosely-typed field of
//! the admin editor has one coercion rule here; shapes outside those rules
//! are rejected at deserialization instead of being defaulted.

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Difficulty, Ingredient, Instruction, Recipe};
use crate::slug::slugify;

/// Parses the textual spellings of a boolean flag accepted from forms.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Some(true),
        "false" | "0" | "off" | "no" | "" => Some(false),
        _ => None,
    }
}

fn flag_from_value<E: de::Error>(value: Value) -> std::result::Result<Option<bool>, E> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(flag) => Ok(Some(flag)),
        Value::Number(n) => match (n.as_i64(), n.as_u64()) {
            (Some(i), _) => Ok(Some(i != 0)),
            (None, Some(u)) => Ok(Some(u != 0)),
            _ => Err(E::custom(format!("expected a boolean, found the number {n}"))),
        },
        Value::String(s) => parse_flag(&s)
            .map(Some)
            .ok_or_else(|| E::custom(format!("`{s}` is not a recognised boolean"))),
        other => Err(E::custom(format!("expected a boolean, found {other}"))),
    }
}

/// `null` and absence both mean `false`.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(flag_from_value::<D::Error>(value)?.unwrap_or(false))
}

/// `null` and absence both mean "leave untouched".
fn optional_flag<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<bool>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    flag_from_value::<D::Error>(value)
}

fn optional_text<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    let text = Option::<String>::deserialize(deserializer)?;
    Ok(text
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty()))
}

fn text_or_null<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Quantities arrive as text but a bare number is accepted too.
fn text_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("expected text, found {other}"))),
    }
}

/// Non-negative whole number, given as a number or a numeric string.
fn optional_count<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<u32>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("`{n}` is not a non-negative whole number"))),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("`{s}` is not a non-negative whole number"))),
        other => Err(de::Error::custom(format!(
            "expected a non-negative whole number, found {other}"
        ))),
    }
}

fn optional_difficulty<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<Difficulty>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s.trim().parse().map(Some).map_err(de::Error::custom),
    }
}

fn optional_uuid<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<Uuid>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => Uuid::parse_str(s.trim())
            .map(Some)
            .map_err(|_| de::Error::custom(format!("`{s}` is not a valid id"))),
    }
}

/// The editor posts lists either as JSON arrays or as JSON-encoded strings.
fn embedded_list<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(Vec::new()),
        Value::String(s) if s.trim().is_empty() => Ok(Vec::new()),
        Value::String(s) => serde_json::from_str(&s).map_err(de::Error::custom),
        array @ Value::Array(_) => serde_json::from_value(array).map_err(de::Error::custom),
        other => Err(de::Error::custom(format!("expected a list, found {other}"))),
    }
}

/// One ingredient row as the editor sends it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngredientEntry {
    /// Client-side row key; ignored
    #[serde(default, rename = "id")]
    _row_key: Option<Value>,
    #[serde(default, deserialize_with = "text_or_null")]
    pub name: String,
    #[serde(default, deserialize_with = "text_or_number")]
    pub amount: String,
    #[serde(default, deserialize_with = "text_or_null")]
    pub unit: String,
}

impl IngredientEntry {
    pub fn new(name: &str, amount: &str, unit: &str) -> Self {
        Self {
            _row_key: None,
            name: name.into(),
            amount: amount.into(),
            unit: unit.into(),
        }
    }
}

/// One instruction row as the editor sends it. `step` is recomputed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstructionEntry {
    #[serde(default, rename = "id")]
    _row_key: Option<Value>,
    #[serde(default, rename = "step")]
    _step: Option<Value>,
    #[serde(default, deserialize_with = "text_or_null")]
    pub description: String,
}

impl InstructionEntry {
    pub fn new(description: &str) -> Self {
        Self {
            _row_key: None,
            _step: None,
            description: description.into(),
        }
    }
}

/// Drops rows without a name and trims the rest; order is preserved.
pub fn normalise_ingredients(entries: Vec<IngredientEntry>) -> Vec<Ingredient> {
    entries
        .into_iter()
        .filter(|entry| !entry.name.trim().is_empty())
        .map(|entry| Ingredient {
            name: entry.name.trim().to_string(),
            amount: entry.amount.trim().to_string(),
            unit: entry.unit.trim().to_string(),
        })
        .collect()
}

/// Drops rows without text and renumbers the survivors from 1.
pub fn normalise_instructions(entries: Vec<InstructionEntry>) -> Vec<Instruction> {
    entries
        .into_iter()
        .map(|entry| entry.description.trim().to_string())
        .filter(|description| !description.is_empty())
        .zip(1..)
        .map(|(description, step)| Instruction { step, description })
        .collect()
}

/// Body of a recipe create or full update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RecipeDraft {
    #[serde(default, deserialize_with = "text_or_null")]
    pub title: String,
    /// Derived from the title when absent
    #[serde(default, deserialize_with = "optional_text")]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "text_or_null")]
    pub content: String,
    #[serde(default, deserialize_with = "optional_text")]
    pub main_image: Option<String>,
    #[serde(default, deserialize_with = "optional_count")]
    pub prep_time: Option<u32>,
    #[serde(default, deserialize_with = "optional_count")]
    pub cook_time: Option<u32>,
    #[serde(default, deserialize_with = "optional_count")]
    pub servings: Option<u32>,
    #[serde(default, deserialize_with = "optional_difficulty")]
    pub difficulty: Option<Difficulty>,
    #[serde(default, deserialize_with = "optional_uuid")]
    pub category_id: Option<Uuid>,
    #[serde(default, deserialize_with = "flag")]
    pub published: bool,
    #[serde(default, deserialize_with = "flag")]
    pub featured: bool,
    #[serde(default, deserialize_with = "embedded_list")]
    pub ingredients: Vec<IngredientEntry>,
    #[serde(default, deserialize_with = "embedded_list")]
    pub instructions: Vec<InstructionEntry>,
}

/// A [`RecipeDraft`] that passed field validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeFields {
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub content: String,
    pub main_image: Option<String>,
    pub prep_time: Option<u32>,
    pub cook_time: Option<u32>,
    pub servings: Option<u32>,
    pub difficulty: Option<Difficulty>,
    pub category_id: Uuid,
    pub published: bool,
    pub featured: bool,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<Instruction>,
}

impl RecipeDraft {
    /// Checks required fields and ranges, derives the slug and cleans the lists.
    pub fn validate(self) -> Result<RecipeFields> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::validation("title", "title is required"));
        }

        let category_id = self
            .category_id
            .ok_or_else(|| AppError::validation("categoryId", "category is required"))?;

        let slug = slugify(self.slug.as_deref().unwrap_or(&title));
        if slug.is_empty() {
            return Err(AppError::validation(
                "slug",
                "the URL slug must contain at least one latin letter, cyrillic letter or digit",
            ));
        }

        if self.servings == Some(0) {
            return Err(AppError::validation("servings", "servings must be at least 1"));
        }

        if let Some(url) = &self.main_image {
            if !(url.starts_with("https://") || url.starts_with("http://") || url.starts_with('/')) {
                return Err(AppError::validation(
                    "mainImage",
                    "main image must be an absolute URL or a site path",
                ));
            }
        }

        Ok(RecipeFields {
            title,
            slug,
            description: self.description,
            content: self.content,
            main_image: self.main_image,
            prep_time: self.prep_time,
            cook_time: self.cook_time,
            servings: self.servings,
            difficulty: self.difficulty,
            category_id,
            published: self.published,
            featured: self.featured,
            ingredients: normalise_ingredients(self.ingredients),
            instructions: normalise_instructions(self.instructions),
        })
    }
}

impl RecipeFields {
    /// A brand-new recipe authored by `author_id`.
    pub fn into_recipe(self, id: Uuid, author_id: Uuid, now: DateTime<Utc>) -> Recipe {
        Recipe {
            id,
            title: self.title,
            slug: self.slug,
            description: self.description,
            content: self.content,
            main_image: self.main_image,
            prep_time: self.prep_time,
            cook_time: self.cook_time,
            servings: self.servings,
            difficulty: self.difficulty,
            category_id: self.category_id,
            author_id,
            published: self.published,
            featured: self.featured,
            ingredients: self.ingredients,
            instructions: self.instructions,
            created_at: now,
            updated_at: now,
        }
    }

    /// Full replace of `existing`; identity, author and creation time survive.
    pub fn replace(self, existing: Recipe, now: DateTime<Utc>) -> Recipe {
        let mut recipe = self.into_recipe(existing.id, existing.author_id, now);
        recipe.created_at = existing.created_at;
        recipe
    }
}

/// Partial update of the two editorial flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RecipePatch {
    #[serde(default, deserialize_with = "optional_flag")]
    pub published: Option<bool>,
    #[serde(default, deserialize_with = "optional_flag")]
    pub featured: Option<bool>,
}

impl RecipePatch {
    pub fn publish(published: bool) -> Self {
        Self {
            published: Some(published),
            featured: None,
        }
    }

    pub fn feature(featured: bool) -> Self {
        Self {
            published: None,
            featured: Some(featured),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn draft(body: Value) -> std::result::Result<RecipeDraft, serde_json::Error> {
        serde_json::from_value(body)
    }

    #[test]
    fn flags_follow_the_coercion_table() {
        for (raw, expected) in [
            (json!(true), true),
            (json!(false), false),
            (json!(null), false),
            (json!(1), true),
            (json!(0), false),
            (json!("on"), true),
            (json!("TRUE"), true),
            (json!(""), false),
            (json!("no"), false),
        ] {
            let parsed = draft(json!({ "title": "x", "published": raw.clone() })).unwrap();
            assert_eq!(parsed.published, expected, "published = {raw}");
        }
        assert!(!draft(json!({ "title": "x" })).unwrap().featured);
    }

    #[test]
    fn malformed_flags_are_rejected() {
        assert!(draft(json!({ "published": "maybe" })).is_err());
        assert!(draft(json!({ "published": 0.5 })).is_err());
        assert!(draft(json!({ "featured": [true] })).is_err());
    }

    #[test]
    fn counts_accept_numbers_and_numeric_strings() {
        let parsed = draft(json!({ "prepTime": "15", "cookTime": 40, "servings": "" })).unwrap();
        assert_eq!(parsed.prep_time, Some(15));
        assert_eq!(parsed.cook_time, Some(40));
        assert_eq!(parsed.servings, None);

        assert!(draft(json!({ "prepTime": -5 })).is_err());
        assert!(draft(json!({ "cookTime": 2.5 })).is_err());
        assert!(draft(json!({ "servings": "four" })).is_err());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(draft(json!({ "title": "x", "authorId": "someone" })).is_err());
        assert!(serde_json::from_value::<RecipePatch>(json!({ "title": "x" })).is_err());
    }

    #[test]
    fn lists_accept_json_strings_and_ignore_row_keys() {
        let parsed = draft(json!({
            "ingredients": "[{\"id\":\"1\",\"name\":\"Сахар\",\"amount\":\"200\",\"unit\":\"г\"}]",
            "instructions": [{ "id": "a", "step": 7, "description": "Смешать" }],
        }))
        .unwrap();
        assert_eq!(parsed.ingredients.len(), 1);
        assert_eq!(parsed.ingredients[0].name, "Сахар");
        assert_eq!(parsed.ingredients[0].amount, "200");
        assert_eq!(parsed.ingredients[0].unit, "г");
        assert_eq!(parsed.instructions.len(), 1);
        assert_eq!(parsed.instructions[0].description, "Смешать");

        let parsed = draft(json!({ "ingredients": [{ "name": "Яйца", "amount": 3 }] })).unwrap();
        assert_eq!(parsed.ingredients[0].amount, "3");
        assert!(draft(json!({ "ingredients": [{ "name": "Яйца", "colour": "white" }] })).is_err());
    }

    #[test]
    fn normalisation_filters_and_renumbers() {
        let ingredients = normalise_ingredients(vec![
            IngredientEntry::new(" Соль ", "1", "ч.л."),
            IngredientEntry::new("   ", "2", "шт"),
            IngredientEntry::new("Перец", "", ""),
        ]);
        assert_eq!(ingredients.len(), 2);
        assert_eq!(ingredients[0].name, "Соль");
        assert_eq!(ingredients[1].name, "Перец");

        let steps = normalise_instructions(vec![
            InstructionEntry::new("first"),
            InstructionEntry::new(""),
            InstructionEntry::new("second"),
        ]);
        assert_eq!(
            steps,
            vec![
                Instruction { step: 1, description: "first".into() },
                Instruction { step: 2, description: "second".into() },
            ]
        );
    }

    #[test]
    fn validation_requires_title_and_category() {
        let err = RecipeDraft { title: "  ".into(), ..Default::default() }
            .validate()
            .unwrap_err();
        assert_eq!(err.field(), Some("title"));

        let err = RecipeDraft { title: "Борщ".into(), ..Default::default() }
            .validate()
            .unwrap_err();
        assert_eq!(err.field(), Some("categoryId"));
    }

    #[test]
    fn validation_rejects_empty_slug_and_zero_servings() {
        let category_id = Some(Uuid::now_v7());
        let err = RecipeDraft { title: "!!!".into(), category_id, ..Default::default() }
            .validate()
            .unwrap_err();
        assert_eq!(err.field(), Some("slug"));

        let err = RecipeDraft {
            title: "Борщ".into(),
            category_id,
            servings: Some(0),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.field(), Some("servings"));
    }

    #[test]
    fn validation_derives_or_normalises_the_slug() {
        let category_id = Some(Uuid::now_v7());
        let fields = RecipeDraft { title: " Борщ ".into(), category_id, ..Default::default() }
            .validate()
            .unwrap();
        assert_eq!(fields.title, "Борщ");
        assert_eq!(fields.slug, "borsch");

        let fields = RecipeDraft {
            title: "Борщ".into(),
            slug: Some("My  Borsch!".into()),
            category_id,
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(fields.slug, "my-borsch");
    }

    #[test]
    fn patch_leaves_absent_fields_unset() {
        let patch: RecipePatch = serde_json::from_value(json!({ "published": "true" })).unwrap();
        assert_eq!(patch, RecipePatch::publish(true));
        let patch: RecipePatch = serde_json::from_value(json!({ "featured": null })).unwrap();
        assert_eq!(patch, RecipePatch::default());
    }
}
