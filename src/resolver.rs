//! Resolution of translated texts by key or by group for a requested language.
//!
//! Both operations validate the language first, so a request in an unknown
//! language is rejected before any text or group lookup happens.

use crate::context::RequestContext;
use crate::error::{ResolveError, StoreError};
use crate::models::{to_text_map, ResolvedTextMap};
use crate::repository::{GroupRepository, LanguageRepository, Repositories, TextRepository};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Answers text lookups on top of the language, text and group stores.
///
/// Holds no per-request state and can be shared freely between requests.
#[derive(Clone)]
pub struct TextResolver {
    languages: Arc<dyn LanguageRepository>,
    texts: Arc<dyn TextRepository>,
    groups: Arc<dyn GroupRepository>,
}

impl TextResolver {
    pub fn new(
        languages: Arc<dyn LanguageRepository>,
        texts: Arc<dyn TextRepository>,
        groups: Arc<dyn GroupRepository>,
    ) -> Self {
        Self {
            languages,
            texts,
            groups,
        }
    }

    pub fn from_repositories(repos: &Repositories) -> Self {
        Self::new(repos.languages.clone(), repos.texts.clone(), repos.groups.clone())
    }

    /// Resolve a single key in the context's language.
    ///
    /// # Returns
    /// * `Ok(map)` with exactly one entry `{key: value}`
    /// * `Err(ResolveError::InvalidRequest)` if the language is missing or unsupported
    /// * `Err(ResolveError::NotFound)` if the key has no value in that language
    /// * `Err(ResolveError::Internal)` on store failure or cancellation
    #[instrument(skip(self, ctx), fields(request_id = %ctx.request_id, language = %ctx.language))]
    pub async fn resolve_by_key(
        &self,
        ctx: &RequestContext,
        key: &str,
    ) -> Result<ResolvedTextMap, ResolveError> {
        self.assert_language_supported(ctx).await?;

        match ctx.guard(self.texts.find(ctx, key, &ctx.language)).await {
            Ok(text) => Ok(to_text_map([text])),
            Err(StoreError::NotFound) => {
                info!("No text for key");
                Err(ResolveError::NotFound)
            }
            Err(e) => Err(internal(ctx, "Failed to find text by key", e)),
        }
    }

    /// Resolve every member of a group that has a value in the context's language.
    ///
    /// Members without a value in that language are left out. An empty result
    /// is reported as `NotFound`, whether or not the group exists.
    #[instrument(skip(self, ctx), fields(request_id = %ctx.request_id, language = %ctx.language))]
    pub async fn resolve_by_group(
        &self,
        ctx: &RequestContext,
        group_id: &str,
    ) -> Result<ResolvedTextMap, ResolveError> {
        self.assert_language_supported(ctx).await?;

        let texts = ctx
            .guard(self.groups.find_texts(ctx, group_id, &ctx.language))
            .await
            .map_err(|e| internal(ctx, "Failed to find texts by group", e))?;

        if texts.is_empty() {
            info!("No texts for group");
            return Err(ResolveError::NotFound);
        }

        Ok(to_text_map(texts))
    }

    async fn assert_language_supported(&self, ctx: &RequestContext) -> Result<(), ResolveError> {
        if !ctx.has_language() {
            info!("No language specified");
            return Err(ResolveError::InvalidRequest(
                "no language specified".to_string(),
            ));
        }

        match ctx.guard(self.languages.find(ctx, &ctx.language)).await {
            Ok(_) => Ok(()),
            Err(StoreError::NotFound) => {
                info!("Language not supported");
                Err(ResolveError::InvalidRequest(format!(
                    "unsupported language: {}",
                    ctx.language
                )))
            }
            Err(e) => Err(internal(ctx, "Failed to check language support", e)),
        }
    }
}

/// Log a store failure and hide it behind `ResolveError::Internal`.
fn internal(ctx: &RequestContext, what: &str, err: StoreError) -> ResolveError {
    match err {
        StoreError::Cancelled => warn!(request_id = %ctx.request_id, "{}: {}", what, err),
        _ => error!(request_id = %ctx.request_id, error = %err, "{}", what),
    }
    ResolveError::Internal(err)
}
