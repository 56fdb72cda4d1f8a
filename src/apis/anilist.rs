use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::json;
use serenity::all::CreateEmbed;

use crate::misc::{first_paragraph, html_to_markdown, shortify};

const GRAPHQL_URL: &str = "https://graphql.anilist.co";
const DESCRIPTION_LIMIT: usize = 1024;
const SEARCH_QUERY: &str = "
query ($search: String) {
    Page(perPage: 10) {
        media(search: $search, type: ANIME) {
            id
            siteUrl
            isAdult
            format
            status
            episodes
            averageScore
            season
            seasonYear
            genres
            title { romaji english native }
            description(asHtml: true)
            coverImage { large color }
        }
    }
}";

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<SearchData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct SearchData {
    #[serde(rename = "Page")]
    page: Page,
}

#[derive(Debug, Deserialize)]
struct Page {
    media: Vec<Media>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub id: u64,
    pub site_url: Option<String>,
    #[serde(default)]
    pub is_adult: bool,
    pub format: Option<String>,
    pub status: Option<String>,
    pub episodes: Option<u32>,
    pub average_score: Option<u32>,
    pub season: Option<String>,
    pub season_year: Option<u32>,
    #[serde(default)]
    pub genres: Vec<String>,
    pub title: Title,
    pub description: Option<String>,
    pub cover_image: Option<CoverImage>,
}

#[derive(Debug, Deserialize)]
pub struct Title {
    pub romaji: Option<String>,
    pub english: Option<String>,
    pub native: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CoverImage {
    pub large: Option<String>,
    pub color: Option<String>,
}

pub async fn search(http: &reqwest::Client, query: &str) -> Result<Vec<Media>> {
    let response = http
        .post(GRAPHQL_URL)
        .json(&json!({ "query": SEARCH_QUERY, "variables": { "search": query } }))
        .send()
        .await?
        .json::<GraphQlResponse>()
        .await
        .context("AniList sent an unreadable response")?;
    into_media(response)
}

fn into_media(response: GraphQlResponse) -> Result<Vec<Media>> {
    if let Some(error) = response.errors.first() {
        bail!("AniList error: {}", error.message);
    }
    Ok(response.data.map(|data| data.page.media).unwrap_or_default())
}

/// "SCREAMING_CASE" enum values as "Screaming case".
fn humanize(value: &str) -> String {
    let lower = value.replace('_', " ").to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn parse_color(hex: &str) -> Option<u32> {
    u32::from_str_radix(hex.trim_start_matches('#'), 16).ok()
}

impl Media {
    pub fn display_title(&self) -> &str {
        self.title
            .english
            .as_deref()
            .or(self.title.romaji.as_deref())
            .or(self.title.native.as_deref())
            .unwrap_or("¿?")
    }

    pub fn to_embed(&self, nsfw_channel: bool) -> CreateEmbed {
        let url = self.site_url.clone().unwrap_or_else(|| format!("https://anilist.co/anime/{}", self.id));
        let mut embed = CreateEmbed::new().title(self.display_title()).url(url);
        if let Some(description) = &self.description {
            let markdown = html_to_markdown(description);
            embed = embed.description(shortify(first_paragraph(&markdown), DESCRIPTION_LIMIT));
        }

        let cover = self.cover_image.as_ref();
        if let Some(color) = cover.and_then(|cover| cover.color.as_deref()).and_then(parse_color) {
            embed = embed.color(color);
        }
        if !self.is_adult || nsfw_channel {
            if let Some(image) = cover.and_then(|cover| cover.large.as_ref()) {
                embed = embed.thumbnail(image);
            }
        } else {
            embed = embed.field("\u{200b}", "**WARNING:** Anime is NSFW!", false);
        }

        if let Some(native) = &self.title.native {
            embed = embed.field("Native title", native, true);
        }
        if let Some(format) = &self.format {
            embed = embed.field("Format", humanize(format), true);
        }
        if let Some(episodes) = self.episodes {
            embed = embed.field("Episodes", episodes.to_string(), true);
        }
        if let Some(status) = &self.status {
            embed = embed.field("Status", humanize(status), true);
        }
        match (&self.season, self.season_year) {
            (Some(season), Some(year)) => embed = embed.field("Season", format!("{} {year}", humanize(season)), true),
            (None, Some(year)) => embed = embed.field("Season", year.to_string(), true),
            _ => {}
        }
        if let Some(score) = self.average_score {
            embed = embed.field("Score", format!("{score}%"), true);
        }
        if !self.genres.is_empty() {
            embed = embed.field("Genres", self.genres.join(", "), false);
        }
        embed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(value: serde_json::Value) -> GraphQlResponse {
        serde_json::from_value(value).unwrap()
    }

    fn frieren(is_adult: bool) -> serde_json::Value {
        json!({
            "id": 154587,
            "siteUrl": "https://anilist.co/anime/154587",
            "isAdult": is_adult,
            "format": "TV",
            "status": "FINISHED",
            "episodes": 28,
            "averageScore": 91,
            "season": "FALL",
            "seasonYear": 2023,
            "genres": ["Adventure", "Drama", "Fantasy"],
            "title": { "romaji": "Sousou no Frieren", "english": "Frieren: Beyond Journey's End", "native": "葬送のフリーレン" },
            "description": "The adventure is over but life goes on.<br><br>\n(Source: Crunchyroll)",
            "coverImage": { "large": "https://img.anili.st/cover.png", "color": "#d6e4a1" }
        })
    }

    #[test]
    fn media_list_is_extracted() {
        let media = into_media(response(json!({ "data": { "Page": { "media": [frieren(false)] } } }))).unwrap();
        assert_eq!(media.len(), 1);
        assert_eq!(media[0].display_title(), "Frieren: Beyond Journey's End");
    }

    #[test]
    fn graphql_errors_are_reported() {
        let err = into_media(response(json!({ "data": null, "errors": [{ "message": "Too Many Requests." }] })))
            .unwrap_err();
        assert!(err.to_string().contains("Too Many Requests."));
    }

    #[test]
    fn embed_fields_are_humanized() {
        let media: Media = serde_json::from_value(frieren(false)).unwrap();
        let embed = serde_json::to_value(media.to_embed(false)).unwrap();
        assert_eq!(embed["description"], "The adventure is over but life goes on.");
        assert_eq!(embed["color"], 0xd6e4a1);
        assert_eq!(embed["thumbnail"]["url"], "https://img.anili.st/cover.png");

        let fields = embed["fields"].as_array().unwrap();
        let field = |name: &str| fields.iter().find(|field| field["name"] == name).map(|field| field["value"].clone());
        assert_eq!(field("Status"), Some(json!("Finished")));
        assert_eq!(field("Season"), Some(json!("Fall 2023")));
        assert_eq!(field("Score"), Some(json!("91%")));
    }

    #[test]
    fn missing_site_url_is_built_from_the_id() {
        let mut value = frieren(false);
        value["siteUrl"] = serde_json::Value::Null;
        let media: Media = serde_json::from_value(value).unwrap();
        let embed = serde_json::to_value(media.to_embed(false)).unwrap();
        assert_eq!(embed["url"], "https://anilist.co/anime/154587");
    }

    #[test]
    fn adult_covers_are_hidden_in_sfw_channels() {
        let media: Media = serde_json::from_value(frieren(true)).unwrap();
        let embed = serde_json::to_value(media.to_embed(false)).unwrap();
        assert!(embed["thumbnail"].is_null());

        let embed = serde_json::to_value(media.to_embed(true)).unwrap();
        assert_eq!(embed["thumbnail"]["url"], "https://img.anili.st/cover.png");
    }
}
