use super::{GroupRepository, HealthCheck, LanguageRepository, TextRepository};
use crate::context::RequestContext;
use crate::error::StoreError;
use crate::models::{Language, NewText, TextGroup, TranslatedText};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// In-process store holding languages, texts and groups.
///
/// Enforces the same constraints as the database schema: unique language ids,
/// unique `(key, language)` texts whose language must exist, unique group ids,
/// and unique memberships whose group must exist.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    languages: HashMap<String, Language>,
    texts: HashMap<(String, String), TranslatedText>,
    groups: HashMap<String, TextGroup>,
    /// (group_id, text_key)
    memberships: BTreeSet<(String, String)>,
    last_text_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Readers never observe a half-applied write, so a poisoned lock still
    // holds consistent data.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl LanguageRepository for MemoryStore {
    async fn find(&self, ctx: &RequestContext, language: &str) -> Result<Language, StoreError> {
        debug!(request_id = %ctx.request_id, language, "memory: find language");
        self.read()
            .languages
            .get(language)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn save(&self, ctx: &RequestContext, language: &str) -> Result<(), StoreError> {
        debug!(request_id = %ctx.request_id, language, "memory: save language");
        let mut inner = self.write();
        if inner.languages.contains_key(language) {
            return Err(StoreError::Conflict(format!(
                "language {} already exists",
                language
            )));
        }

        inner.languages.insert(
            language.to_string(),
            Language {
                id: language.to_string(),
                created_at: Utc::now(),
            },
        );
        Ok(())
    }
}

#[async_trait]
impl TextRepository for MemoryStore {
    async fn find(
        &self,
        ctx: &RequestContext,
        key: &str,
        language: &str,
    ) -> Result<TranslatedText, StoreError> {
        debug!(request_id = %ctx.request_id, key, language, "memory: find text");
        self.read()
            .texts
            .get(&(key.to_string(), language.to_string()))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn save(&self, ctx: &RequestContext, text: &NewText) -> Result<(), StoreError> {
        debug!(
            request_id = %ctx.request_id,
            key = %text.key,
            language = %text.language,
            "memory: save text"
        );
        let mut inner = self.write();
        if !inner.languages.contains_key(&text.language) {
            return Err(StoreError::NotFound);
        }

        let natural_key = (text.key.clone(), text.language.clone());
        if inner.texts.contains_key(&natural_key) {
            return Err(StoreError::Conflict(format!(
                "text {} already exists for language {}",
                text.key, text.language
            )));
        }

        inner.last_text_id += 1;
        let now = Utc::now();
        let stored = TranslatedText {
            id: inner.last_text_id,
            key: text.key.clone(),
            language: text.language.clone(),
            value: text.value.clone(),
            created_at: now,
            updated_at: now,
        };
        inner.texts.insert(natural_key, stored);
        Ok(())
    }
}

#[async_trait]
impl GroupRepository for MemoryStore {
    async fn find_texts(
        &self,
        ctx: &RequestContext,
        group_id: &str,
        language: &str,
    ) -> Result<Vec<TranslatedText>, StoreError> {
        debug!(request_id = %ctx.request_id, group_id, language, "memory: find group texts");
        let inner = self.read();
        let texts = inner
            .memberships
            .range((group_id.to_string(), String::new())..)
            .take_while(|(group, _)| group == group_id)
            .filter_map(|(_, key)| inner.texts.get(&(key.clone(), language.to_string())))
            .cloned()
            .collect();

        Ok(texts)
    }

    async fn save(&self, ctx: &RequestContext, group_id: &str) -> Result<(), StoreError> {
        debug!(request_id = %ctx.request_id, group_id, "memory: save group");
        let mut inner = self.write();
        if inner.groups.contains_key(group_id) {
            return Err(StoreError::Conflict(format!(
                "group {} already exists",
                group_id
            )));
        }

        inner.groups.insert(
            group_id.to_string(),
            TextGroup {
                id: group_id.to_string(),
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn add_text_to_group(
        &self,
        ctx: &RequestContext,
        text_key: &str,
        group_id: &str,
    ) -> Result<(), StoreError> {
        debug!(request_id = %ctx.request_id, text_key, group_id, "memory: add text to group");
        let mut inner = self.write();
        if !inner.groups.contains_key(group_id) {
            return Err(StoreError::NotFound);
        }

        if !inner
            .memberships
            .insert((group_id.to_string(), text_key.to_string()))
        {
            return Err(StoreError::Conflict(format!(
                "text {} is already in group {}",
                text_key, group_id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl HealthCheck for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
