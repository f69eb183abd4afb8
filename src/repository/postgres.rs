use super::{GroupRepository, LanguageRepository, TextRepository};
use crate::context::RequestContext;
use crate::error::StoreError;
use crate::models::{Language, NewText, TranslatedText};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::instrument;

/// Map a failed write to `Conflict` on unique violations and `NotFound` on
/// references to a missing row.
fn write_error(err: sqlx::Error, what: String) -> StoreError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_unique_violation() {
            return StoreError::Conflict(what);
        }
        if db_err.is_foreign_key_violation() {
            return StoreError::NotFound;
        }
    }
    StoreError::Database(err)
}

#[derive(Debug, Clone)]
pub struct PgLanguageRepository {
    pool: PgPool,
}

impl PgLanguageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LanguageRepository for PgLanguageRepository {
    #[instrument(level = "debug", skip(self, ctx), fields(request_id = %ctx.request_id))]
    async fn find(&self, ctx: &RequestContext, language: &str) -> Result<Language, StoreError> {
        sqlx::query_as::<_, Language>("SELECT id, created_at FROM language WHERE id = $1")
            .bind(language)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }

    #[instrument(level = "debug", skip(self, ctx), fields(request_id = %ctx.request_id))]
    async fn save(&self, ctx: &RequestContext, language: &str) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO language (id, created_at) VALUES ($1, $2)")
            .bind(language)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| write_error(e, format!("language {} already exists", language)))?;

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PgTextRepository {
    pool: PgPool,
}

impl PgTextRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TextRepository for PgTextRepository {
    #[instrument(level = "debug", skip(self, ctx), fields(request_id = %ctx.request_id))]
    async fn find(
        &self,
        ctx: &RequestContext,
        key: &str,
        language: &str,
    ) -> Result<TranslatedText, StoreError> {
        sqlx::query_as::<_, TranslatedText>(
            "SELECT id, key, language, value, created_at, updated_at
             FROM translated_text
             WHERE key = $1 AND language = $2",
        )
        .bind(key)
        .bind(language)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }

    #[instrument(
        level = "debug",
        skip(self, ctx, text),
        fields(request_id = %ctx.request_id, key = %text.key, language = %text.language)
    )]
    async fn save(&self, ctx: &RequestContext, text: &NewText) -> Result<(), StoreError> {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO translated_text (key, language, value, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $4)",
        )
        .bind(&text.key)
        .bind(&text.language)
        .bind(&text.value)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            write_error(
                e,
                format!("text {} already exists for language {}", text.key, text.language),
            )
        })?;

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PgGroupRepository {
    pool: PgPool,
}

impl PgGroupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GroupRepository for PgGroupRepository {
    #[instrument(level = "debug", skip(self, ctx), fields(request_id = %ctx.request_id))]
    async fn find_texts(
        &self,
        ctx: &RequestContext,
        group_id: &str,
        language: &str,
    ) -> Result<Vec<TranslatedText>, StoreError> {
        let texts = sqlx::query_as::<_, TranslatedText>(
            "SELECT t.id, t.key, t.language, t.value, t.created_at, t.updated_at
             FROM translated_text t
             INNER JOIN text_group_membership tgm ON t.key = tgm.text_key
             WHERE tgm.group_id = $1 AND t.language = $2",
        )
        .bind(group_id)
        .bind(language)
        .fetch_all(&self.pool)
        .await?;

        Ok(texts)
    }

    #[instrument(level = "debug", skip(self, ctx), fields(request_id = %ctx.request_id))]
    async fn save(&self, ctx: &RequestContext, group_id: &str) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO text_group (id, created_at) VALUES ($1, $2)")
            .bind(group_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| write_error(e, format!("group {} already exists", group_id)))?;

        Ok(())
    }

    #[instrument(level = "debug", skip(self, ctx), fields(request_id = %ctx.request_id))]
    async fn add_text_to_group(
        &self,
        ctx: &RequestContext,
        text_key: &str,
        group_id: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO text_group_membership (text_key, group_id, created_at) VALUES ($1, $2, $3)",
        )
        .bind(text_key)
        .bind(group_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            write_error(e, format!("text {} is already in group {}", text_key, group_id))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    // Run with TEST_DATABASE_URL=postgres://... cargo test -- --ignored

    async fn test_pool() -> PgPool {
        let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL not set");
        let options = url.parse().expect("Invalid TEST_DATABASE_URL");
        let db = Database::connect(options, 2).await.expect("Failed to connect");
        db.migrate().await.expect("Failed to migrate");
        db.pool().clone()
    }

    /// Unique suffix so tests can share one database.
    fn unique(prefix: &str) -> String {
        format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
    }

    fn ctx() -> RequestContext {
        RequestContext::new("pg-test", "")
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL"]
    async fn test_language_save_and_find() {
        let repo = PgLanguageRepository::new(test_pool().await);
        let code = unique("l")[..12].to_string();

        repo.save(&ctx(), &code).await.expect("Should save");
        let language = repo.find(&ctx(), &code).await.expect("Should find");
        assert_eq!(language.id, code);

        let missing = repo.find(&ctx(), "zz-missing").await;
        assert!(matches!(missing, Err(StoreError::NotFound)));

        let duplicate = repo.save(&ctx(), &code).await;
        assert!(matches!(duplicate, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL"]
    async fn test_text_save_and_find() {
        let pool = test_pool().await;
        let languages = PgLanguageRepository::new(pool.clone());
        let texts = PgTextRepository::new(pool);
        let code = unique("l")[..12].to_string();
        let key = unique("KEY");

        languages.save(&ctx(), &code).await.expect("Should save language");
        texts
            .save(&ctx(), &NewText::new(&key, &code, "value"))
            .await
            .expect("Should save text");

        let text = texts.find(&ctx(), &key, &code).await.expect("Should find");
        assert_eq!(text.value, "value");

        let lowercase = texts.find(&ctx(), &key.to_lowercase(), &code).await;
        assert!(matches!(lowercase, Err(StoreError::NotFound)));

        let duplicate = texts.save(&ctx(), &NewText::new(&key, &code, "other")).await;
        assert!(matches!(duplicate, Err(StoreError::Conflict(_))));

        let unknown_language = texts.save(&ctx(), &NewText::new(&key, "zz-missing", "v")).await;
        assert!(matches!(unknown_language, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL"]
    async fn test_group_find_texts_filters_language() {
        let pool = test_pool().await;
        let languages = PgLanguageRepository::new(pool.clone());
        let texts = PgTextRepository::new(pool.clone());
        let groups = PgGroupRepository::new(pool);

        let sv = unique("s")[..12].to_string();
        let en = unique("e")[..12].to_string();
        let group = unique("GROUP");
        let both = unique("BOTH");
        let only_sv = unique("ONLY_SV");

        languages.save(&ctx(), &sv).await.expect("save sv");
        languages.save(&ctx(), &en).await.expect("save en");
        texts.save(&ctx(), &NewText::new(&both, &sv, "sv-both")).await.expect("save");
        texts.save(&ctx(), &NewText::new(&both, &en, "en-both")).await.expect("save");
        texts.save(&ctx(), &NewText::new(&only_sv, &sv, "sv-only")).await.expect("save");
        groups.save(&ctx(), &group).await.expect("save group");
        groups.add_text_to_group(&ctx(), &both, &group).await.expect("add");
        groups.add_text_to_group(&ctx(), &only_sv, &group).await.expect("add");

        let sv_texts = groups.find_texts(&ctx(), &group, &sv).await.expect("find sv");
        assert_eq!(sv_texts.len(), 2);

        let en_texts = groups.find_texts(&ctx(), &group, &en).await.expect("find en");
        assert_eq!(en_texts.len(), 1);
        assert_eq!(en_texts[0].key, both);
        assert_eq!(en_texts[0].value, "en-both");

        let missing = groups.find_texts(&ctx(), "MISSING_GROUP", &en).await.expect("find");
        assert!(missing.is_empty());

        let no_group = groups.add_text_to_group(&ctx(), &both, &unique("NOPE")).await;
        assert!(matches!(no_group, Err(StoreError::NotFound)));
    }
}
