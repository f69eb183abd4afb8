//! Loading languages, texts and groups from a JSON fixture.
//!
//! ```json
//! {
//!   "languages": ["sv", "en"],
//!   "texts": [{ "key": "GREETING", "language": "sv", "value": "Hej" }],
//!   "groups": [{ "id": "MOBILE_APP", "keys": ["GREETING"] }]
//! }
//! ```
//!
//! Rows that already exist are skipped, so a fixture can be applied more than once.

use crate::context::RequestContext;
use crate::error::StoreError;
use crate::models::NewText;
use crate::repository::Repositories;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub texts: Vec<NewText>,
    #[serde(default)]
    pub groups: Vec<GroupFixture>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupFixture {
    pub id: String,
    #[serde(default)]
    pub keys: Vec<String>,
}

/// Rows written by `apply`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub languages: usize,
    pub texts: usize,
    pub groups: usize,
    pub memberships: usize,
    /// Rows left alone because they already existed
    pub skipped: usize,
}

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read fixture {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid fixture {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to store {what}: {source}")]
    Store {
        what: String,
        #[source]
        source: StoreError,
    },
}

impl Fixture {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SeedError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_json(&content).map_err(|source| SeedError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Write the fixture through the repositories: languages, then texts, then
/// groups with their members.
pub async fn apply(
    repos: &Repositories,
    ctx: &RequestContext,
    fixture: &Fixture,
) -> Result<SeedSummary, SeedError> {
    let mut summary = SeedSummary::default();

    for language in &fixture.languages {
        let written = record(
            repos.languages.save(ctx, language).await,
            || format!("language {}", language),
        )?;
        tally(&mut summary.languages, &mut summary.skipped, written);
    }

    for text in &fixture.texts {
        let written = record(repos.texts.save(ctx, text).await, || {
            format!("text {} ({})", text.key, text.language)
        })?;
        tally(&mut summary.texts, &mut summary.skipped, written);
    }

    for group in &fixture.groups {
        let written = record(repos.groups.save(ctx, &group.id).await, || {
            format!("group {}", group.id)
        })?;
        tally(&mut summary.groups, &mut summary.skipped, written);

        for key in &group.keys {
            let written = record(repos.groups.add_text_to_group(ctx, key, &group.id).await, || {
                format!("membership {} in {}", key, group.id)
            })?;
            tally(&mut summary.memberships, &mut summary.skipped, written);
        }
    }

    info!(
        "Seeded {} languages, {} texts, {} groups, {} memberships ({} skipped)",
        summary.languages, summary.texts, summary.groups, summary.memberships, summary.skipped
    );

    Ok(summary)
}

/// `Ok(true)` if written, `Ok(false)` if it already existed.
fn record<F>(result: Result<(), StoreError>, what: F) -> Result<bool, SeedError>
where
    F: FnOnce() -> String,
{
    match result {
        Ok(()) => Ok(true),
        Err(StoreError::Conflict(msg)) => {
            debug!("Skipping existing row: {}", msg);
            Ok(false)
        }
        Err(source) => Err(SeedError::Store {
            what: what(),
            source,
        }),
    }
}

fn tally(written: &mut usize, skipped: &mut usize, was_written: bool) {
    if was_written {
        *written += 1;
    } else {
        *skipped += 1;
    }
}
