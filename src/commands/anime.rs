use anyhow::{anyhow, Result};
use serenity::all::{CommandInteraction, CommandOptionType, Context, CreateCommand, CreateCommandOption};
use serenity::async_trait;

use super::SlashCommand;
use crate::apis::anilist;
use crate::botdata::BotData;
use crate::embed_list::{EmbedList, EmbedListOptions, SendOptions};
use crate::misc::{escape_markdown, is_nsfw_channel, respond_ephemeral, sad_emoji, string_option};

pub struct Anime;

pub async fn handle(ctx: &Context, data: &BotData, interaction: &CommandInteraction) -> Result<()> {
    let options = interaction.data.options();
    let query = string_option(&options, "query").ok_or_else(|| anyhow!("/anime was invoked without a query"))?;

    let media = anilist::search(&data.http, query).await?;
    if media.is_empty() {
        let message = format!("No anime called {} was found {}", escape_markdown(query), sad_emoji());
        return respond_ephemeral(ctx, interaction, &message).await;
    }

    interaction.defer(&ctx.http).await?;
    let nsfw = is_nsfw_channel(ctx, interaction.channel_id).await;
    let mut list = EmbedList::new(EmbedListOptions::default());
    for entry in &media {
        list.add(entry.to_embed(nsfw));
    }
    list.send(ctx, interaction, SendOptions { deferred: true, ..Default::default() }).await?;
    Ok(())
}

pub fn register() -> CreateCommand {
    CreateCommand::new("anime").description("Searches for an anime on AniList")
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "query", "Name of the anime")
                .required(true),
        )
}

#[async_trait]
impl SlashCommand for Anime {
    fn name(&self) -> &'static str {
        "anime"
    }

    fn register(&self) -> CreateCommand {
        register()
    }

    async fn run(&self, ctx: &Context, data: &BotData, interaction: &CommandInteraction) -> Result<()> {
        handle(ctx, data, interaction).await
    }
}
