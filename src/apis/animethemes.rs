use anyhow::{Context, Result};
use serde::Deserialize;

const API_URL: &str = "https://api.animethemes.moe";
const INCLUDE: &str = "anime,song.artists,animethemeentries.videos";
const THEME_MARKER: &str = "theme:";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    search: SearchResults,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    animethemes: Vec<Theme>,
}

#[derive(Debug, Deserialize)]
struct ThemeResponse {
    animetheme: Theme,
}

#[derive(Debug, Deserialize)]
pub struct Theme {
    pub id: u64,
    pub slug: String,
    pub anime: Option<Anime>,
    pub song: Option<Song>,
    #[serde(default)]
    pub animethemeentries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
pub struct Anime {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Deserialize)]
pub struct Song {
    pub title: Option<String>,
    #[serde(default)]
    pub artists: Vec<Artist>,
}

#[derive(Debug, Deserialize)]
pub struct Artist {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub videos: Vec<Video>,
}

#[derive(Debug, Deserialize)]
pub struct Video {
    pub tags: Option<String>,
}

/// What the user typed into the theme option.
#[derive(Debug, PartialEq, Eq)]
pub enum ThemeQuery<'a> {
    /// A suggestion picked from autocomplete.
    Id(u64),
    Text(&'a str),
}

impl<'a> ThemeQuery<'a> {
    pub fn parse(input: &'a str) -> Self {
        match input.strip_prefix(THEME_MARKER).map(str::parse) {
            Some(Ok(id)) => Self::Id(id),
            _ => Self::Text(input),
        }
    }

    pub fn marker(id: u64) -> String {
        format!("{THEME_MARKER}{id}")
    }
}

pub async fn search(http: &reqwest::Client, query: &str, limit: usize) -> Result<Vec<Theme>> {
    let limit = limit.to_string();
    let response = http
        .get(format!("{API_URL}/search"))
        .query(&[
            ("q", query),
            ("fields[search]", "animethemes"),
            ("include[animetheme]", INCLUDE),
            ("page[limit]", limit.as_str()),
        ])
        .send()
        .await?
        .error_for_status()?
        .json::<SearchResponse>()
        .await
        .context("AnimeThemes sent an unreadable search response")?;
    Ok(response.search.animethemes)
}

pub async fn theme(http: &reqwest::Client, id: u64) -> Result<Option<Theme>> {
    let response = http
        .get(format!("{API_URL}/animetheme/{id}"))
        .query(&[("include", INCLUDE)])
        .send()
        .await?;
    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Ok(None);
    }
    let response = response
        .error_for_status()?
        .json::<ThemeResponse>()
        .await
        .context("AnimeThemes sent an unreadable theme")?;
    Ok(Some(response.animetheme))
}

impl Theme {
    pub fn first_video(&self) -> Option<&Video> {
        self.animethemeentries.iter().flat_map(|entry| &entry.videos).next()
    }

    /// Autocomplete label, e.g. "Cowboy Bebop OP1".
    pub fn label(&self) -> String {
        match &self.anime {
            Some(anime) => format!("{} {}", anime.name, self.slug),
            None => self.slug.clone(),
        }
    }

    pub fn heading(&self) -> String {
        let Some(song) = &self.song else {
            return String::new();
        };
        let mut heading = song.title.as_ref().map(|title| format!("**{title}**")).unwrap_or_default();
        if !song.artists.is_empty() {
            let artists = song.artists.iter().map(|artist| artist.name.as_str()).collect::<Vec<_>>();
            heading.push_str(&format!(" from {}", artists.join(", ")));
        }
        heading.trim().to_owned()
    }

    /// None when the theme has no uploaded video.
    pub fn link(&self) -> Option<String> {
        let video = self.first_video()?;
        let anime = self.anime.as_ref()?;
        let tags = match video.tags.as_deref() {
            Some(tags) if !tags.is_empty() => format!("-{tags}"),
            _ => String::new(),
        };
        Some(format!("https://animethemes.moe/anime/{}/{}{tags}", anime.slug, self.slug))
    }
}
