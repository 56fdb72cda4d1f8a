/*
 * This file is part of Sweetie.
 *
 * Copyright (C) 2024-present Sweetie contributors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 */

use std::sync::LazyLock;

use anyhow::{anyhow, Context as _, Result};
use regex::{Captures, Regex};
use serde::Deserialize;
use serenity::all::{
    CommandInteraction, CommandOptionType, Context, CreateCommand, CreateCommandOption, CreateEmbed,
    EditInteractionResponse,
};
use serenity::async_trait;

use super::SlashCommand;
use crate::apis::vndb::{self, Vndb};
use crate::apis::wikidata::{self, WikipediaLink};
use crate::botdata::BotData;
use crate::misc::{is_nsfw_channel, sad_emoji, shortify, string_option};

const VNDB_URL: &str = "https://vndb.org";
const DESCRIPTION_LIMIT: usize = 1000;
const FIELD_LIMIT: usize = 1024;
/// Average "sexual" vote above which a cover counts as explicit.
const EXPLICIT_IMAGE: f64 = 1.0;

const LENGTHS: [&str; 6] = [
    "of unknown length",
    "very short (< 2 hours)",
    "short (2 - 10 hours)",
    "of medium length (10 - 30 hours)",
    "long (30 - 50 hours)",
    "very long (> 50 hours)",
];

pub struct VisualNovelCommand;

#[derive(Debug, Deserialize)]
pub struct VisualNovel {
    pub id: u64,
    pub title: String,
    pub original: Option<String>,
    pub released: Option<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub orig_lang: Vec<String>,
    #[serde(default)]
    pub platforms: Vec<String>,
    pub aliases: Option<String>,
    pub length: Option<u8>,
    pub description: Option<String>,
    #[serde(default)]
    pub links: Links,
    pub image: Option<String>,
    pub image_nsfw: Option<bool>,
    pub image_flagging: Option<ImageFlagging>,
    pub popularity: Option<f64>,
    pub rating: Option<f64>,
    pub votecount: Option<u64>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Links {
    pub wikidata: Option<String>,
    pub renai: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImageFlagging {
    #[serde(default)]
    pub sexual_avg: f64,
}

#[derive(Debug, Deserialize)]
pub struct Relation {
    pub id: u64,
    pub relation: String,
    pub title: String,
    #[serde(default)]
    pub official: bool,
}

fn length_label(length: Option<u8>) -> &'static str {
    length.and_then(|length| LENGTHS.get(length as usize)).copied().unwrap_or(LENGTHS[0])
}

fn platform_name(code: &str) -> &str {
    match code {
        "win" => "Windows",
        "lin" => "Linux",
        "mac" => "Mac OS X",
        "web" => "Web",
        "ios" => "iOS",
        "and" => "Android",
        "bdp" => "Blu-ray Player",
        "dos" => "DOS",
        "dvd" => "DVD",
        "drc" => "Dreamcast",
        "nes" => "NES",
        "fmt" => "FM Towns",
        "gba" => "GB Advance",
        "gbc" => "GB Color",
        "msx" => "MSX",
        "nds" => "DS",
        "swi" => "Switch",
        "wii" => "Wii",
        "wiu" => "Wii U",
        "n3d" => "3DS",
        "p88" => "PC-88",
        "p98" => "PC-98",
        "pce" => "PC-Engine",
        "pcf" => "PC-FX",
        "psp" => "PSP",
        "ps1" => "PS1",
        "ps2" => "PS2",
        "ps3" => "PS3",
        "ps4" => "PS4",
        "psv" => "PSP Vita",
        "sat" => "Sega Saturn",
        "sfc" => "SNES",
        "x68" => "x68000",
        "xb1" => "XBOX",
        "xb3" => "Xbox 360",
        "xbo" => "Xbox One",
        "oth" => "Other",
        other => other,
    }
}

fn relation_label(code: &str) -> &str {
    match code {
        "seq" => "Sequel",
        "preq" => "Prequel",
        "set" => "Same setting",
        "alt" => "Alternative version",
        "char" => "Shares characters",
        "side" => "Side story",
        "par" => "Parent story",
        "ser" => "Same series",
        "fan" => "Fandisc",
        "orig" => "Original game",
        other => other,
    }
}

/// VNDB dates are `YYYY`, `YYYY-MM`, `YYYY-MM-DD` or `tba`; `today` is `YYYY-MM-DD`.
fn is_upcoming(released: &str, today: &str) -> bool {
    if released.eq_ignore_ascii_case("tba") {
        return true;
    }
    let mut date = released.to_owned();
    for _ in released.split('-').count()..3 {
        date.push_str("-01");
    }
    date.as_str() > today
}

fn plural(word: &str, count: usize) -> String {
    match (count > 1, word.ends_with('s')) {
        (false, _) => word.to_owned(),
        (true, true) => format!("{word}es"),
        (true, false) => format!("{word}s"),
    }
}

static RAW: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\[raw\](.+?)\[/raw\]").unwrap());
static CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\[code\](.+?)\[/code\]").unwrap());
static URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\[url=([^\]]+)\](.+?)\[/url\]").unwrap());
static DB_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[cdprsuv]\d+(?:\.\d+)?\b").unwrap());
static SPOILER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\[spoiler\](.+?)\[/spoiler\]").unwrap());
static QUOTE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\[quote\](.+?)\[/quote\]").unwrap());
static STASHED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\x1A(\d+)\x1A").unwrap());

fn stash(stashed: &mut Vec<String>, rendered: String) -> String {
    stashed.push(rendered);
    format!("\u{1A}{}\u{1A}", stashed.len() - 1)
}

/// Converts VNDB's BBCode-like markup into Discord markdown.
fn convert_formatting(text: &str) -> String {
    let mut stashed = Vec::new();
    let text = text.replace('\u{1A}', "");

    // Raw text, code and links must not be touched by the id linker.
    let text = RAW.replace_all(&text, |caps: &Captures| stash(&mut stashed, caps[1].to_owned()));
    let text = CODE.replace_all(&text, |caps: &Captures| stash(&mut stashed, format!("```{}```", &caps[1])));
    let text = URL.replace_all(&text, |caps: &Captures| {
        let url = &caps[1];
        let url = if url.starts_with('/') { format!("{VNDB_URL}{url}") } else { url.to_owned() };
        stash(&mut stashed, format!("[{}]({url})", &caps[2]))
    });

    let text = DB_ID.replace_all(&text, |caps: &Captures| format!("[{0}]({VNDB_URL}/{0})", &caps[0]));
    let text = SPOILER.replace_all(&text, "||${1}||");
    let text = QUOTE.replace_all(&text, "``${1}``");

    STASHED
        .replace_all(&text, |caps: &Captures| {
            caps[1].parse::<usize>().ok().and_then(|i| stashed.get(i)).cloned().unwrap_or_default()
        })
        .into_owned()
}

impl VisualNovel {
    fn explicit_image(&self) -> bool {
        self.image_nsfw == Some(true) || self.image_flagging.as_ref().is_some_and(|flags| flags.sexual_avg > EXPLICIT_IMAGE)
    }

    fn summary(&self) -> String {
        let mut lines = Vec::new();
        if let Some(original) = self.original.as_deref().filter(|s| !s.is_empty()) {
            lines.push(format!("**Original Title**: {original}"));
        }
        if let Some(aliases) = self.aliases.as_deref().filter(|s| !s.is_empty()) {
            let aliases: Vec<_> = aliases.lines().filter(|line| !line.is_empty()).collect();
            lines.push(format!("**{}**: {}", plural("Alias", aliases.len()), aliases.join(", ")));
        }
        if let Some(description) = self.description.as_deref().filter(|s| !s.is_empty()) {
            lines.push(format!("\n{}", shortify(&convert_formatting(description), DESCRIPTION_LIMIT)));
        }
        lines.join("\n").trim().to_owned()
    }

    fn general_info(&self, today: &str) -> Vec<String> {
        let mut info = Vec::new();
        if let Some(released) = self.released.as_deref() {
            let verb = if is_upcoming(released, today) { "Going to be released" } else { "Released" };
            info.push(format!("{verb} on {}", released.to_uppercase()));
        }
        info.push(format!("It's {}", length_label(self.length)));
        if !self.platforms.is_empty() {
            let platforms: Vec<_> = self.platforms.iter().map(|code| platform_name(code)).collect();
            info.push(format!("**{}**: {}", plural("Platform", platforms.len()), platforms.join(", ")));
        }
        if !self.orig_lang.is_empty() {
            info.push(format!("**{}**: {}", plural("Original Language", self.orig_lang.len()), self.orig_lang.join(" - ")));
        }
        if !self.languages.is_empty() {
            info.push(format!("**{}**: {}", plural("Language", self.languages.len()), self.languages.join(" - ")));
        }
        info
    }

    fn relations_text(&self) -> Option<String> {
        let render = |official: bool| {
            self.relations
                .iter()
                .filter(|relation| relation.official == official)
                .map(|relation| {
                    format!("[{}]({VNDB_URL}/v{}) ({})", relation.title, relation.id, relation_label(&relation.relation))
                })
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut sections = Vec::new();
        let official = render(true);
        if !official.is_empty() {
            sections.push(format!("**Official**: {official}"));
        }
        let unofficial = render(false);
        if !unofficial.is_empty() {
            sections.push(format!("**Non-Official**: {unofficial}"));
        }
        (!sections.is_empty()).then(|| shortify(&sections.join("\n"), FIELD_LIMIT))
    }

    fn related_links(&self, wikipedia: Option<&WikipediaLink>) -> Vec<String> {
        let mut links: Vec<String> = wikipedia.map(WikipediaLink::markdown).into_iter().collect();
        if let Some(wikidata) = &self.links.wikidata {
            links.push(format!("[Wikidata](https://www.wikidata.org/wiki/{wikidata})"));
        }
        if let Some(renai) = &self.links.renai {
            links.push(format!("[Ren'Ai](https://renai.us/game/{renai})"));
        }
        links
    }

    pub fn to_embed(&self, nsfw_channel: bool, today: &str, wikipedia: Option<&WikipediaLink>) -> CreateEmbed {
        let mut embed = CreateEmbed::new().title(&self.title).url(format!("{VNDB_URL}/v{}", self.id));

        if let Some(image) = &self.image {
            if nsfw_channel || !self.explicit_image() {
                embed = embed.thumbnail(image);
            }
        }

        let summary = self.summary();
        if !summary.is_empty() {
            embed = embed.description(summary);
        }

        let stats = [
            format!("**Popularity**: {}/100", self.popularity.unwrap_or_default()),
            format!("**Bayesian rating**: {}/10", self.rating.unwrap_or_default()),
            format!("**Votes**: {}", self.votecount.unwrap_or_default()),
        ];
        embed = embed
            .field("General Info", format!("• {}", self.general_info(today).join("\n• ")), true)
            .field("User Statistics", format!("• {}", stats.join("\n• ")), true);

        if let Some(relations) = self.relations_text() {
            embed = embed.field("Relations", relations, false);
        }
        let links = self.related_links(wikipedia);
        if !links.is_empty() {
            embed = embed.field("Related Links", links.join(" - "), false);
        }
        embed
    }
}

async fn wikipedia_link(data: &BotData, vn: &VisualNovel) -> Option<WikipediaLink> {
    let id = vn.links.wikidata.as_deref()?;
    match wikidata::entity(&data.http, id).await {
        Ok(entity) => entity.wikipedia(),
        Err(err) => {
            log::warn!("Wikidata lookup for {id} failed: {err:#}");
            None
        }
    }
}

pub async fn handle(ctx: &Context, data: &BotData, interaction: &CommandInteraction) -> Result<()> {
    let options = interaction.data.options();
    let query = string_option(&options, "query").ok_or_else(|| anyhow!("/vn was invoked without a query"))?;

    interaction.defer(&ctx.http).await?;
    let vndb = Vndb::connect(&data.config.vndb_client).await.context("Couldn't talk to VNDB")?;
    let results = vndb
        .get::<VisualNovel>("vn", &["basic", "details", "stats", "relations"], &format!("(title ~ {})", vndb::quote(query)), None)
        .await
        .context("VNDB search failed")?;
    drop(vndb);

    let response = match results.items.first() {
        Some(vn) => {
            let nsfw = is_nsfw_channel(ctx, interaction.channel_id).await;
            let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
            let wikipedia = wikipedia_link(data, vn).await;
            EditInteractionResponse::new().embed(vn.to_embed(nsfw, &today, wikipedia.as_ref()))
        }
        None => EditInteractionResponse::new().content(format!("No results found {}", sad_emoji())),
    };
    interaction.edit_response(&ctx.http, response).await?;
    Ok(())
}

pub fn register() -> CreateCommand {
    CreateCommand::new("vn").description("Searches for a visual novel on VNDB")
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "query", "Title of the visual novel")
                .required(true),
        )
}

#[async_trait]
impl SlashCommand for VisualNovelCommand {
    fn name(&self) -> &'static str {
        "vn"
    }

    fn register(&self) -> CreateCommand {
        register()
    }

    async fn run(&self, ctx: &Context, data: &BotData, interaction: &CommandInteraction) -> Result<()> {
        handle(ctx, data, interaction).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;

    fn ever17(image_nsfw: bool) -> VisualNovel {
        serde_json::from_value(json!({
            "id": 17,
            "title": "Ever17 -the out of infinity-",
            "original": null,
            "released": "2002-08-29",
            "languages": ["en", "ja"],
            "orig_lang": ["ja"],
            "platforms": ["win", "ps2"],
            "aliases": "E17\nEver 17",
            "length": 4,
            "description": "Sequel to [url=/v5]Never7[/url]. See also v18.",
            "links": { "wikidata": "Q1130163", "renai": null },
            "image": "https://s2.vndb.org/cv/51/28651.jpg",
            "image_nsfw": image_nsfw,
            "popularity": 55.5,
            "rating": 8.71,
            "votecount": 7000,
            "relations": [
                { "id": 5, "relation": "preq", "title": "Never7", "official": true },
                { "id": 99, "relation": "fan", "title": "Fan remake", "official": false }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn markup_becomes_markdown() {
        assert_eq!(
            convert_formatting("See v17 and [spoiler]she lives[/spoiler]"),
            "See [v17](https://vndb.org/v17) and ||she lives||"
        );
        assert_eq!(convert_formatting("[url=/v5]Never7[/url]"), "[Never7](https://vndb.org/v5)");
        assert_eq!(convert_formatting("[url=https://example.com]v5[/url]"), "[v5](https://example.com)");
        assert_eq!(convert_formatting("[raw]v17[/raw] [code]r1[/code]"), "v17 ```r1```");
        assert_eq!(convert_formatting("[quote]hello[/quote]"), "``hello``");
    }

    #[test]
    fn release_dates_are_compared_with_today() {
        assert!(is_upcoming("tba", "2024-05-01"));
        assert!(is_upcoming("2030", "2024-05-01"));
        assert!(is_upcoming("2024-06", "2024-05-01"));
        assert!(!is_upcoming("2024-05", "2024-05-01"));
        assert!(!is_upcoming("2002-08-29", "2024-05-01"));
    }

    #[test]
    fn labels_fall_back_to_codes() {
        assert_eq!(length_label(Some(3)), "of medium length (10 - 30 hours)");
        assert_eq!(length_label(Some(42)), "of unknown length");
        assert_eq!(length_label(None), "of unknown length");
        assert_eq!(platform_name("swi"), "Switch");
        assert_eq!(platform_name("zzz"), "zzz");
        assert_eq!(relation_label("seq"), "Sequel");
    }

    #[test]
    fn embed_lists_everything() {
        let embed = serde_json::to_value(ever17(false).to_embed(false, "2024-05-01", None)).unwrap();
        assert_eq!(embed["url"], "https://vndb.org/v17");
        assert_eq!(embed["thumbnail"]["url"], "https://s2.vndb.org/cv/51/28651.jpg");

        let description = embed["description"].as_str().unwrap();
        assert!(description.starts_with("**Aliases**: E17, Ever 17"));
        assert!(description.contains("[Never7](https://vndb.org/v5)"));
        assert!(description.contains("[v18](https://vndb.org/v18)"));

        let fields = embed["fields"].as_array().unwrap();
        let names: Vec<_> = fields.iter().map(|field| field["name"].as_str().unwrap()).collect();
        assert_eq!(names, ["General Info", "User Statistics", "Relations", "Related Links"]);
        assert!(fields[0]["value"].as_str().unwrap().starts_with("• Released on 2002-08-29\n• It's long (30 - 50 hours)"));
        assert!(fields[0]["value"].as_str().unwrap().contains("**Platforms**: Windows, PS2"));
        assert_eq!(
            fields[2]["value"],
            "**Official**: [Never7](https://vndb.org/v5) (Prequel)\n**Non-Official**: [Fan remake](https://vndb.org/v99) (Fandisc)"
        );
        assert_eq!(fields[3]["value"], "[Wikidata](https://www.wikidata.org/wiki/Q1130163)");
    }

    #[test]
    fn wikipedia_leads_the_related_links() {
        let wikipedia = WikipediaLink {
            language: "English",
            url: "https://en.wikipedia.org/wiki/Ever17:_The_Out_of_Infinity".to_owned(),
        };
        let embed = serde_json::to_value(ever17(false).to_embed(false, "2024-05-01", Some(&wikipedia))).unwrap();
        let links = embed["fields"].as_array().unwrap().last().unwrap().clone();
        assert_eq!(links["name"], "Related Links");
        assert_eq!(
            links["value"],
            "[English Wikipedia](https://en.wikipedia.org/wiki/Ever17:_The_Out_of_Infinity) - [Wikidata](https://www.wikidata.org/wiki/Q1130163)"
        );
    }

    #[test]
    fn explicit_covers_stay_out_of_sfw_channels() {
        let embed = serde_json::to_value(ever17(true).to_embed(false, "2024-05-01", None)).unwrap();
        assert_eq!(embed["thumbnail"], Value::Null);
        let embed = serde_json::to_value(ever17(true).to_embed(true, "2024-05-01", None)).unwrap();
        assert!(embed["thumbnail"]["url"].is_string());
    }
}
