pub mod anilist;
pub mod animethemes;
pub mod jisho;
pub mod saucenao;
pub mod tracemoe;
pub mod vndb;
pub mod wikidata;

use std::fmt;

use anyhow::{Context, Result};
use serde::Deserialize;

pub async fn get_bytes(http: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    let bytes = http
        .get(url)
        .send()
        .await?
        .error_for_status()
        .with_context(|| format!("Unable to download {url}"))?
        .bytes()
        .await?;
    Ok(bytes.to_vec())
}

/// Upstream ids that arrive either as numbers or as strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Number(u64),
    Text(String),
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}
