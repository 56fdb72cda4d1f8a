use anyhow::{Context, Result};
use serde::Deserialize;
use serenity::all::{CreateEmbed, CreateEmbedAuthor, Timestamp};

use super::Id;
use crate::misc::shortify;

const SEARCH_URL: &str = "https://saucenao.com/search.php?db=999&output_type=2&numres=5&hide=3";
const NSFW_WARNING: &str = "**WARNING:** Image is NSFW!\n";
const PURPLE: u32 = 0x9b59b6;

#[derive(Debug, Deserialize)]
pub struct SauceResponse {
    pub header: ResponseHeader,
    #[serde(default)]
    pub results: Vec<SauceResult>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseHeader {
    pub status: i32,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SauceResult {
    pub header: ResultHeader,
    #[serde(default)]
    pub data: ResultData,
}

#[derive(Debug, Deserialize)]
pub struct ResultHeader {
    pub similarity: String,
    pub thumbnail: String,
    pub index_id: u32,
    pub index_name: String,
    #[serde(default)]
    pub hidden: u32,
}

/// The union of the fields used across SauceNAO indexes.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResultData {
    pub ext_urls: Vec<String>,
    pub title: Option<String>,
    pub source: Option<String>,
    pub creator: Option<Creator>,
    pub member_name: Option<String>,
    pub member_id: Option<Id>,
    pub member_link_id: Option<Id>,
    pub author_name: Option<String>,
    pub author_url: Option<String>,
    pub author: Option<String>,
    pub artist: Option<String>,
    pub part: Option<String>,
    pub est_time: Option<String>,
    pub created_at: Option<String>,
    pub twitter_user_handle: Option<String>,
    pub pawoo_user_username: Option<String>,
    pub user_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Creator {
    One(String),
    Many(Vec<String>),
}

impl Creator {
    pub fn joined(&self) -> String {
        match self {
            Self::One(name) => name.clone(),
            Self::Many(names) => names.join(" & "),
        }
    }
}

/// Outcome of a search as the user should see it.
#[derive(Debug)]
pub enum Verdict {
    Results(Vec<SauceResult>),
    ServiceProblem(i32),
    Unsupported,
    BadRequest(i32),
}

pub async fn search(http: &reqwest::Client, api_key: &str, image_url: &str) -> Result<SauceResponse> {
    http.get(SEARCH_URL)
        .query(&[("api_key", api_key), ("url", image_url)])
        .send()
        .await?
        .json::<SauceResponse>()
        .await
        .context("SauceNAO sent an unreadable response")
}

impl SauceResponse {
    pub fn verdict(self) -> Verdict {
        let status = self.header.status;
        if status != 0 {
            log::warn!(
                "SauceNAO answered with status {status}: {}",
                self.header.message.as_deref().unwrap_or("no message")
            );
        }
        if status > 0 && self.results.is_empty() {
            return Verdict::ServiceProblem(status);
        }
        match status {
            -3 => Verdict::Unsupported,
            status if status < 0 => Verdict::BadRequest(status),
            _ => Verdict::Results(self.results),
        }
    }
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

/// Discord rejects empty field values, so missing ones are left out.
fn optional_field(embed: CreateEmbed, name: &str, value: &Option<String>) -> CreateEmbed {
    match value.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => embed.field(name, value, true),
        _ => embed,
    }
}

impl SauceResult {
    pub fn to_embed(&self, nsfw_channel: bool) -> CreateEmbed {
        let hidden = self.header.hidden != 0;
        let data = &self.data;

        let mut embed = CreateEmbed::new()
            .description(format!(
                "{}Similarity {}%",
                if hidden { NSFW_WARNING } else { "" },
                self.header.similarity
            ))
            .color(PURPLE);
        if !hidden || nsfw_channel {
            embed = embed.image(&self.header.thumbnail);
        }
        if let Some(url) = data.ext_urls.first() {
            embed = embed.url(url);
        }

        let id = |id: &Option<Id>| id.as_ref().map(ToString::to_string).unwrap_or_default();
        match self.header.index_id {
            5 | 6 => embed
                .title(text(&data.title))
                .author(
                    CreateEmbedAuthor::new(text(&data.member_name))
                        .url(format!("https://www.pixiv.net/users/{}", id(&data.member_id))),
                ),
            21 | 22 => {
                embed = optional_field(embed, "Part:", &data.part);
                optional_field(embed.title(text(&data.source)), "Timestamp:", &data.est_time)
            }
            34 | 40 | 42 => embed.title(text(&data.title)).author(
                CreateEmbedAuthor::new(shortify(&text(&data.author_name), 50)).url(text(&data.author_url)),
            ),
            41 => {
                embed = embed.title(format!("Tweet by @{}", text(&data.twitter_user_handle)));
                match data.created_at.as_deref().map(Timestamp::parse) {
                    Some(Ok(timestamp)) => embed.timestamp(timestamp),
                    _ => embed,
                }
            }
            18 | 38 => embed.title(text(&data.source)).author(CreateEmbedAuthor::new(shortify(
                &data.creator.as_ref().map(Creator::joined).unwrap_or_default(),
                50,
            ))),
            31 => embed.title(text(&data.title)).author(
                CreateEmbedAuthor::new(text(&data.member_name))
                    .url(format!("https://bcy.net/u/{}", id(&data.member_link_id))),
            ),
            35 => embed.title(format!("Toot by {}", text(&data.pawoo_user_username))),
            8 => embed.title(text(&data.title)).author(
                CreateEmbedAuthor::new(text(&data.member_name))
                    .url(format!("https://seiga.nicovideo.jp/user/illust/{}", id(&data.member_id))),
            ),
            27 | 12 | 9 | 16 | 29 => embed
                .title(text(&data.source))
                .author(CreateEmbedAuthor::new(data.creator.as_ref().map(Creator::joined).unwrap_or_default())),
            36 => optional_field(embed.title(text(&data.source)), "Part:", &data.part),
            43 => embed
                .title(text(&data.title))
                .author(CreateEmbedAuthor::new(text(&data.user_name))),
            37 | 371 => {
                let author = text(&data.author);
                let artist = text(&data.artist);
                let credits = if artist.is_empty() || author.contains(&artist) {
                    author
                } else {
                    format!("{author}, {artist}")
                };
                let embed = embed.title(text(&data.source)).author(CreateEmbedAuthor::new(credits));
                optional_field(embed, "Part:", &data.part)
            }
            index_id => {
                log::warn!("Unknown SauceNAO index {index_id} ({})", self.header.index_name);
                embed.title("¿?")
            }
        }
    }
}
