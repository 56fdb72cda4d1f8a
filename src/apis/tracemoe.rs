use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use serenity::all::CreateEmbed;

use crate::misc::format_duration;

const SEARCH_URL: &str = "https://api.trace.moe/search?anilistInfo";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceResponse {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub result: Vec<TraceResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceResult {
    pub anilist: AnilistField,
    #[serde(default)]
    pub episode: Option<Episode>,
    pub from: f64,
    pub similarity: f64,
    pub image: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AnilistField {
    Id(u64),
    Info(AnilistInfo),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnilistInfo {
    pub id: u64,
    pub title: AnilistTitle,
    #[serde(default)]
    pub is_adult: bool,
}

#[derive(Debug, Deserialize)]
pub struct AnilistTitle {
    pub romaji: String,
    pub english: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Episode {
    Number(f64),
    Name(String),
    Range(Vec<f64>),
}

impl fmt::Display for Episode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(number) => write!(f, "{number}"),
            Self::Name(name) => f.write_str(name),
            Self::Range(range) => match (range.first(), range.last()) {
                (Some(first), Some(last)) => write!(f, "{first}-{last}"),
                _ => Ok(()),
            },
        }
    }
}

pub async fn search(http: &reqwest::Client, image_url: &str) -> Result<TraceResponse> {
    http.get(SEARCH_URL)
        .query(&[("url", image_url)])
        .send()
        .await?
        .json::<TraceResponse>()
        .await
        .context("trace.moe sent an unreadable response")
}

impl TraceResult {
    pub fn is_adult(&self) -> bool {
        matches!(&self.anilist, AnilistField::Info(info) if info.is_adult)
    }

    pub fn timestamp(&self) -> String {
        let at = format_duration(Duration::from_secs_f64(self.from.max(0.0)));
        match &self.episode {
            Some(episode) => format!("Episode {episode} at {at}"),
            None => at,
        }
    }

    /// Builds the page; `image` names the attachment holding the preview, if any.
    pub fn to_embed(&self, image: Option<&str>) -> CreateEmbed {
        let mut embed = CreateEmbed::new()
            .color(0x000000)
            .field("Similarity:", format!("{:.2}%", self.similarity * 100.0), false)
            .field("Timestamp", self.timestamp(), false);

        embed = match &self.anilist {
            AnilistField::Info(info) => embed
                .title(info.title.english.as_deref().unwrap_or(&info.title.romaji))
                .url(format!("https://anilist.co/anime/{}/", info.id)),
            AnilistField::Id(id) => embed
                .title(format!("AniList #{id}"))
                .url(format!("https://anilist.co/anime/{id}/")),
        };
        if self.is_adult() {
            embed = embed.description("**WARNING:** Anime is NSFW!");
        }
        if let Some(filename) = image {
            embed = embed.attachment(filename);
        }
        embed
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn result(anilist: serde_json::Value, episode: serde_json::Value) -> TraceResult {
        serde_json::from_value(json!({
            "anilist": anilist,
            "filename": "[Group] Show - 03.mkv",
            "episode": episode,
            "from": 83.5,
            "to": 85.0,
            "similarity": 0.94321,
            "video": "https://media.trace.moe/video/1",
            "image": "https://media.trace.moe/image/1",
        }))
        .unwrap()
    }

    fn info(is_adult: bool) -> serde_json::Value {
        json!({
            "id": 21,
            "idMal": 21,
            "title": { "native": "ワンピース", "romaji": "ONE PIECE", "english": null },
            "synonyms": [],
            "isAdult": is_adult,
        })
    }

    #[test]
    fn episodes_come_in_three_shapes() {
        assert_eq!(result(info(false), json!(3)).episode, Some(Episode::Number(3.0)));
        assert_eq!(result(info(false), json!("OVA")).episode, Some(Episode::Name("OVA".into())));
        assert_eq!(result(info(false), json!([1, 2])).episode, Some(Episode::Range(vec![1.0, 2.0])));
        assert_eq!(result(info(false), json!(null)).episode, None);

        assert_eq!(Episode::Range(vec![1.0, 2.0, 3.0]).to_string(), "1-3");
        assert_eq!(Episode::Number(12.0).to_string(), "12");
    }

    #[test]
    fn timestamp_mentions_the_episode() {
        assert_eq!(result(info(false), json!(3)).timestamp(), "Episode 3 at 00:01:23");
        assert_eq!(result(info(false), json!(null)).timestamp(), "00:01:23");
    }

    #[test]
    fn embed_uses_romaji_when_english_is_missing() {
        let embed = serde_json::to_value(result(info(false), json!(1)).to_embed(Some("trace1.jpg"))).unwrap();
        assert_eq!(embed["title"], "ONE PIECE");
        assert_eq!(embed["url"], "https://anilist.co/anime/21/");
        assert_eq!(embed["fields"][0]["value"], "94.32%");
        assert_eq!(embed["image"]["url"], "attachment://trace1.jpg");
        assert!(embed["description"].is_null());
    }

    #[test]
    fn adult_results_are_flagged() {
        let adult = result(info(true), json!(1));
        assert!(adult.is_adult());
        let embed = serde_json::to_value(adult.to_embed(None)).unwrap();
        assert_eq!(embed["description"], "**WARNING:** Anime is NSFW!");
        assert!(embed["image"].is_null());

        assert!(!result(json!(21), json!(1)).is_adult());
    }

    #[test]
    fn error_responses_decode() {
        let response: TraceResponse =
            serde_json::from_value(json!({ "error": "Invalid image url", "result": [] })).unwrap();
        assert_eq!(response.error, "Invalid image url");
        assert!(response.result.is_empty());
    }
}
