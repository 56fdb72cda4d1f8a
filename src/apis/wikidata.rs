use std::collections::HashMap;

use anyhow::{Context, Result};
use reqwest::Url;
use serde::Deserialize;

const API_URL: &str = "https://www.wikidata.org/w/api.php";

#[derive(Debug, Deserialize)]
struct EntitiesResponse {
    #[serde(default)]
    entities: HashMap<String, Entity>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Entity {
    #[serde(default)]
    pub sitelinks: HashMap<String, Sitelink>,
}

#[derive(Debug, Deserialize)]
pub struct Sitelink {
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikipediaLink {
    pub language: &'static str,
    pub url: String,
}

impl WikipediaLink {
    pub fn markdown(&self) -> String {
        format!("[{} Wikipedia]({})", self.language, self.url)
    }
}

/// Fetches the sitelinks of one Wikidata item, e.g. `Q1130163`.
pub async fn entity(http: &reqwest::Client, id: &str) -> Result<Entity> {
    let mut response = http
        .get(API_URL)
        .query(&[("action", "wbgetentities"), ("format", "json"), ("props", "sitelinks"), ("ids", id)])
        .send()
        .await?
        .error_for_status()?
        .json::<EntitiesResponse>()
        .await
        .context("Wikidata sent an unreadable response")?;
    Ok(response.entities.remove(id).unwrap_or_default())
}

impl Entity {
    /// The English article when there is one, otherwise the Japanese one.
    pub fn wikipedia(&self) -> Option<WikipediaLink> {
        [("en", "English"), ("ja", "Japanese")].into_iter().find_map(|(code, language)| {
            let sitelink = self.sitelinks.get(&format!("{code}wiki"))?;
            let mut url = Url::parse(&format!("https://{code}.wikipedia.org/wiki")).ok()?;
            url.path_segments_mut().ok()?.push(&sitelink.title.replace(' ', "_"));
            Some(WikipediaLink { language, url: url.into() })
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn item(sitelinks: serde_json::Value) -> Entity {
        let response: EntitiesResponse = serde_json::from_value(json!({
            "entities": { "Q1130163": { "type": "item", "id": "Q1130163", "sitelinks": sitelinks } },
            "success": 1
        }))
        .unwrap();
        response.entities.into_values().next().unwrap()
    }

    #[test]
    fn english_article_wins() {
        let found = item(json!({
            "enwiki": { "site": "enwiki", "title": "Ever17: The Out of Infinity" },
            "jawiki": { "site": "jawiki", "title": "Ever17 -the out of infinity-" }
        }));
        let link = found.wikipedia().unwrap();
        assert_eq!(link.language, "English");
        assert_eq!(link.url, "https://en.wikipedia.org/wiki/Ever17:_The_Out_of_Infinity");
        assert_eq!(link.markdown(), "[English Wikipedia](https://en.wikipedia.org/wiki/Ever17:_The_Out_of_Infinity)");
    }

    #[test]
    fn japanese_article_is_the_fallback() {
        let found = item(json!({ "jawiki": { "site": "jawiki", "title": "君が望む永遠" } }));
        let link = found.wikipedia().unwrap();
        assert_eq!(link.language, "Japanese");
        assert_eq!(
            link.url,
            "https://ja.wikipedia.org/wiki/%E5%90%9B%E3%81%8C%E6%9C%9B%E3%82%80%E6%B0%B8%E9%81%A0"
        );
    }

    #[test]
    fn other_wikis_are_ignored() {
        assert_eq!(item(json!({ "frwiki": { "site": "frwiki", "title": "Ever17" } })).wikipedia(), None);
        assert_eq!(Entity::default().wikipedia(), None);
    }
}
