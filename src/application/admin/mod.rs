//! Application services for the administrative surface.
//!
//! Every ordered resource gets a service pairing a reader and a writer with the audit
//! log. Drafts arrive with every field optional: creation checks that required fields
//! are present, updates merge the draft onto the stored record.

use std::future::Future;
use std::str::FromStr;

use thiserror::Error;
use uuid::Uuid;

use crate::application::repos::RepoError;
use crate::domain::slug::{SlugAsyncError, SlugError, derive_slug, generate_unique_slug_async};

pub mod associates;
pub mod audit;
pub mod blogs;
pub mod categories;
pub mod grants;
pub mod services;
pub mod testimonials;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("{field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl AdminError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

/// Path key addressing a single item either by id or by slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKey {
    Id(Uuid),
    Slug(String),
}

impl FromStr for ItemKey {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match Uuid::parse_str(s) {
            Ok(id) => ItemKey::Id(id),
            Err(_) => ItemKey::Slug(s.to_string()),
        })
    }
}

pub(crate) fn require_text(value: Option<String>, field: &'static str) -> Result<String, AdminError> {
    match value.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(AdminError::invalid(field, "This field is required.")),
    }
}

/// Trim; empty strings become `None`.
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value.and_then(|text| {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Merge a nullable patch field: absent keeps `current`, an empty string clears it.
pub(crate) fn merge_optional(patch: Option<String>, current: Option<String>) -> Option<String> {
    match patch {
        Some(text) => optional_text(Some(text)),
        None => current,
    }
}

pub(crate) fn merge_text(
    patch: Option<String>,
    current: String,
    field: &'static str,
) -> Result<String, AdminError> {
    match patch {
        Some(text) => require_text(Some(text), field),
        None => Ok(current),
    }
}

pub(crate) fn ensure_max_len(
    value: Option<&str>,
    max: usize,
    field: &'static str,
) -> Result<(), AdminError> {
    match value {
        Some(text) if text.chars().count() > max => Err(AdminError::invalid(
            field,
            format!("Ensure this field has no more than {max} characters."),
        )),
        _ => Ok(()),
    }
}

/// Trim entries and drop blanks.
pub(crate) fn clean_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

/// Resolve a unique slug: an explicit slug is normalized and must be free (or owned by
/// `owner`), otherwise one is derived from `source` with a numeric suffix on collision.
pub(crate) async fn resolve_slug<F, Fut>(
    explicit: Option<String>,
    source: &str,
    owner: Option<Uuid>,
    mut lookup: F,
) -> Result<String, AdminError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<Option<Uuid>, RepoError>>,
{
    if let Some(explicit) = optional_text(explicit) {
        let slug = derive_slug(&explicit).map_err(|_| AdminError::invalid("slug", "Enter a valid slug."))?;
        return match lookup(slug.clone()).await? {
            Some(existing) if Some(existing) != owner => Err(AdminError::invalid(
                "slug",
                "An item with this slug already exists.",
            )),
            _ => Ok(slug),
        };
    }

    let result = generate_unique_slug_async(source, |candidate| {
        let pending = lookup(candidate.to_string());
        async move {
            pending
                .await
                .map(|existing| existing.is_none() || existing == owner)
        }
    })
    .await;

    match result {
        Ok(slug) => Ok(slug),
        Err(SlugAsyncError::Slug(SlugError::EmptyInput | SlugError::Unrepresentable { .. })) => {
            Err(AdminError::invalid(
                "slug",
                "A slug could not be derived from this value.",
            ))
        }
        Err(SlugAsyncError::Slug(SlugError::Exhausted { .. })) => Err(AdminError::invalid(
            "slug",
            "An item with this slug already exists.",
        )),
        Err(SlugAsyncError::Predicate(err)) => Err(AdminError::Repo(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_key_prefers_uuid() {
        let id = Uuid::new_v4();
        assert_eq!(id.to_string().parse::<ItemKey>(), Ok(ItemKey::Id(id)));
        assert_eq!(
            "jane-doe".parse::<ItemKey>(),
            Ok(ItemKey::Slug("jane-doe".to_string()))
        );
    }

    #[test]
    fn merge_optional_clears_on_empty() {
        assert_eq!(
            merge_optional(Some("  ".into()), Some("old".into())),
            None
        );
        assert_eq!(merge_optional(None, Some("old".into())), Some("old".into()));
        assert_eq!(
            merge_optional(Some(" new ".into()), None),
            Some("new".into())
        );
    }

    #[tokio::test]
    async fn explicit_slug_owned_by_same_item_is_kept() {
        let owner = Uuid::new_v4();
        let slug = resolve_slug(Some("Jane Doe".into()), "ignored", Some(owner), |_| async move {
            Ok(Some(owner))
        })
        .await
        .expect("slug");
        assert_eq!(slug, "jane-doe");
    }

    #[tokio::test]
    async fn explicit_slug_taken_by_other_item_is_rejected() {
        let err = resolve_slug(Some("jane-doe".into()), "ignored", None, |_| async move {
            Ok(Some(Uuid::new_v4()))
        })
        .await
        .expect_err("taken");
        assert!(matches!(err, AdminError::Invalid { field: "slug", .. }));
    }
}
