use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Texts as returned to clients: text key -> translated value.
///
/// An ordered map keeps response bodies stable; the order itself means nothing.
pub type ResolvedTextMap = BTreeMap<String, String>;

/// A supported language, identified by its code (e.g. "en", "sv").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Language {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

/// A value stored for a text key in one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TranslatedText {
    pub id: i64,
    pub key: String,
    pub language: String,
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A translated value that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewText {
    pub key: String,
    pub language: String,
    pub value: String,
}

impl NewText {
    pub fn new(key: impl Into<String>, language: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            language: language.into(),
            value: value.into(),
        }
    }
}

/// Named collection of text keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TextGroup {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

/// Map stored texts to the client-facing shape, keyed by text key.
pub fn to_text_map<I>(texts: I) -> ResolvedTextMap
where
    I: IntoIterator<Item = TranslatedText>,
{
    texts
        .into_iter()
        .map(|text| (text.key, text.value))
        .collect()
}
