use std::sync::LazyLock;
use std::time::Duration;

use anyhow::Result;
use rand::seq::SliceRandom;
use regex::Regex;
use serenity::all::{
    Attachment, Channel, ChannelId, CommandInteraction, Context, CreateInteractionResponse,
    CreateInteractionResponseFollowup, CreateInteractionResponseMessage, ResolvedOption,
    ResolvedValue,
};

pub const SAD_EMOJIS: &[&str] = &[
    ":c", ":/", ";-;", "T-T", "（´＿｀）", ":<", "（; ;）", "((´д｀))", "sad emoji", "¯\\_(ツ)_/¯",
    "\\:", "ɔ:", "(╯︵╰,)", ">:", ":p", "q:", "iįomɘ bɒƨ", "(im out of ideas)", ":(", "😖",
];

pub fn sad_emoji() -> &'static str {
    SAD_EMOJIS.choose(&mut rand::thread_rng()).copied().unwrap_or(":c")
}

pub async fn respond_command(ctx: &Context, interaction: &CommandInteraction, text: &str) -> Result<()> {
    let response = CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
        .content(text.to_string())
    );
    interaction.create_response(&ctx.http, response).await?;
    Ok(())
}

pub async fn respond_ephemeral(ctx: &Context, interaction: &CommandInteraction, text: &str) -> Result<()> {
    let response = CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
        .content(text.to_string())
        .ephemeral(true)
    );
    interaction.create_response(&ctx.http, response).await?;
    Ok(())
}

pub async fn followup_command(ctx: &Context, interaction: &CommandInteraction, text: &str, ephemeral: bool) -> Result<()> {
    let response =
        CreateInteractionResponseFollowup::new()
        .content(text.to_string())
        .ephemeral(ephemeral);
    interaction.create_followup(&ctx.http, response).await?;
    Ok(())
}

/// DMs and unreachable channels count as safe for work.
pub async fn is_nsfw_channel(ctx: &Context, channel_id: ChannelId) -> bool {
    match channel_id.to_channel(ctx).await {
        Ok(Channel::Guild(channel)) => channel.nsfw,
        Ok(_) => false,
        Err(err) => {
            log::warn!("Unable to look up channel {channel_id}: {err}");
            false
        }
    }
}

pub fn find_option<'a>(options: &'a [ResolvedOption<'a>], name: &str) -> Option<&'a ResolvedValue<'a>> {
    options.iter().find(|option| option.name == name).map(|option| &option.value)
}

pub fn string_option<'a>(options: &'a [ResolvedOption<'a>], name: &str) -> Option<&'a str> {
    match find_option(options, name)? {
        ResolvedValue::String(value) => Some(*value),
        _ => None,
    }
}

pub fn integer_option(options: &[ResolvedOption<'_>], name: &str) -> Option<i64> {
    match find_option(options, name)? {
        ResolvedValue::Integer(value) => Some(*value),
        _ => None,
    }
}

pub fn attachment_option<'a>(options: &'a [ResolvedOption<'a>], name: &str) -> Option<&'a Attachment> {
    match find_option(options, name)? {
        ResolvedValue::Attachment(attachment) => Some(*attachment),
        _ => None,
    }
}

pub fn escape_markdown(string: &str) -> String {
    let characters_to_escape = "*_~[]()<>-#`\\|";
    let mut new_string = String::with_capacity(string.len());
    for c in string.chars() {
        if characters_to_escape.contains(c) {
            new_string.push('\\');
        }
        new_string.push(c);
    }
    new_string
}

/// Replaces every secret with asterisks of the same length.
pub fn censor(text: &str, secrets: &[&str]) -> String {
    secrets
        .iter()
        .filter(|secret| !secret.is_empty())
        .fold(text.to_owned(), |text, secret| text.replace(secret, &"*".repeat(secret.chars().count())))
}

pub fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs();
    format!("{:0>2}:{:0>2}:{:0>2}", seconds / 3600, seconds / 60 % 60, seconds % 60)
}

/// Cuts `text` to at most `limit` characters, marking the cut with an ellipsis.
pub fn shortify(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_owned();
    }
    let mut short: String = text.chars().take(limit.saturating_sub(3)).collect();
    short.truncate(short.trim_end().len());
    short.push_str("...");
    short
}

pub fn first_paragraph(text: &str) -> &str {
    text.trim().split("\n\n").next().unwrap_or_default().trim()
}

static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static ITALIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</?(i|em)>").unwrap());
static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</?(b|strong)>").unwrap());
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());
static LINE_EDGES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]*\n[ \t]*").unwrap());
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]{2,}").unwrap());

/// Converts the small HTML subset used in AniList descriptions.
pub fn html_to_markdown(html: &str) -> String {
    // Source line breaks are plain whitespace in HTML; only <br> breaks lines.
    let text = html.replace("\r\n", " ").replace('\n', " ");
    let text = LINE_BREAK.replace_all(&text, "\n");
    let text = ITALIC.replace_all(&text, "*");
    let text = BOLD.replace_all(&text, "**");
    let text = ANY_TAG.replace_all(&text, "");
    let text = text
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");
    let text = SPACES.replace_all(&text, " ");
    let text = LINE_EDGES.replace_all(&text, "\n");
    BLANK_LINES.replace_all(text.trim(), "\n\n").into_owned()
}
