//! Storage contracts for languages, translated texts and text groups.
//!
//! The resolver only depends on these traits. Two implementations exist:
//!
//! - `postgres`: backed by an `sqlx` connection pool
//! - `memory`: a single in-process store used for `STORAGE=memory` and tests

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{PgGroupRepository, PgLanguageRepository, PgTextRepository};

use crate::context::RequestContext;
use crate::db::Database;
use crate::error::StoreError;
use crate::models::{Language, NewText, TranslatedText};
use async_trait::async_trait;
use std::sync::Arc;

/// Supported languages.
#[async_trait]
pub trait LanguageRepository: Send + Sync {
    /// Returns `StoreError::NotFound` when the code is not registered.
    async fn find(&self, ctx: &RequestContext, language: &str) -> Result<Language, StoreError>;

    async fn save(&self, ctx: &RequestContext, language: &str) -> Result<(), StoreError>;
}

/// Translated texts addressed by `(key, language)`.
#[async_trait]
pub trait TextRepository: Send + Sync {
    /// Exact, case-sensitive lookup. Returns `StoreError::NotFound` when no
    /// value is stored for the pair.
    async fn find(
        &self,
        ctx: &RequestContext,
        key: &str,
        language: &str,
    ) -> Result<TranslatedText, StoreError>;

    async fn save(&self, ctx: &RequestContext, text: &NewText) -> Result<(), StoreError>;
}

/// Text groups and their members.
#[async_trait]
pub trait GroupRepository: Send + Sync {
    /// Texts of every member of `group_id` that has a value in `language`.
    /// Empty when the group is unknown or has no such member.
    async fn find_texts(
        &self,
        ctx: &RequestContext,
        group_id: &str,
        language: &str,
    ) -> Result<Vec<TranslatedText>, StoreError>;

    async fn save(&self, ctx: &RequestContext, group_id: &str) -> Result<(), StoreError>;

    /// Returns `StoreError::NotFound` when the group does not exist.
    async fn add_text_to_group(
        &self,
        ctx: &RequestContext,
        text_key: &str,
        group_id: &str,
    ) -> Result<(), StoreError>;
}

/// Storage liveness, used by the health endpoint.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;
}

/// The full set of stores the service runs on.
#[derive(Clone)]
pub struct Repositories {
    pub languages: Arc<dyn LanguageRepository>,
    pub texts: Arc<dyn TextRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub health: Arc<dyn HealthCheck>,
}

impl Repositories {
    pub fn postgres(db: &Database) -> Self {
        Self {
            languages: Arc::new(PgLanguageRepository::new(db.pool().clone())),
            texts: Arc::new(PgTextRepository::new(db.pool().clone())),
            groups: Arc::new(PgGroupRepository::new(db.pool().clone())),
            health: Arc::new(db.clone()),
        }
    }

    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            languages: store.clone(),
            texts: store.clone(),
            groups: store.clone(),
            health: store,
        }
    }
}
