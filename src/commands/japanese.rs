use anyhow::{anyhow, Result};
use serenity::all::{
    CommandInteraction, CommandOptionType, Context, CreateAutocompleteResponse, CreateCommand,
    CreateCommandOption, CreateInteractionResponse,
};
use serenity::async_trait;

use super::SlashCommand;
use crate::apis::jisho;
use crate::botdata::BotData;
use crate::embed_list::{EmbedList, EmbedListOptions, SendOptions};
use crate::misc::{escape_markdown, respond_ephemeral, sad_emoji, shortify, string_option};

const MAX_PAGES: usize = 12;
const CHOICE_LIMIT: usize = 100;

pub struct Japanese;

pub async fn handle(ctx: &Context, data: &BotData, interaction: &CommandInteraction) -> Result<()> {
    let options = interaction.data.options();
    let word = string_option(&options, "word").ok_or_else(|| anyhow!("/japanese was invoked without a word"))?;

    let response = jisho::search(&data.http, word).await?;
    if response.meta.status != 200 {
        let message = format!("Jisho returned status coded ``{}`` {}", response.meta.status, sad_emoji());
        return respond_ephemeral(ctx, interaction, &message).await;
    }
    if response.data.is_empty() {
        let message = format!("Jisho doesn't know about {} {}", escape_markdown(word), sad_emoji());
        return respond_ephemeral(ctx, interaction, &message).await;
    }

    interaction.defer(&ctx.http).await?;
    let mut list = EmbedList::new(EmbedListOptions::default());
    for entry in response.data.iter().take(MAX_PAGES) {
        list.add(entry.to_embed());
    }
    list.send(ctx, interaction, SendOptions { deferred: true, ..Default::default() }).await?;
    Ok(())
}

pub async fn autocomplete(ctx: &Context, interaction: &CommandInteraction) -> Result<()> {
    let input = interaction.data.autocomplete().map(|option| option.value).unwrap_or_default();
    let response = jisho::suggestions(input)
        .into_iter()
        .map(|choice| shortify(&choice, CHOICE_LIMIT))
        .fold(CreateAutocompleteResponse::new(), |response, choice| {
            response.add_string_choice(choice.clone(), choice)
        });
    interaction.create_response(&ctx.http, CreateInteractionResponse::Autocomplete(response)).await?;
    Ok(())
}

pub fn register() -> CreateCommand {
    CreateCommand::new("japanese").description("Searches in Jisho for the word")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                "word",
                "Can be a kanji, a japanese word or even an english word (Same search features as Jisho)",
            )
            .required(true)
            .set_autocomplete(true),
        )
}

#[async_trait]
impl SlashCommand for Japanese {
    fn name(&self) -> &'static str {
        "japanese"
    }

    fn register(&self) -> CreateCommand {
        register()
    }

    async fn run(&self, ctx: &Context, data: &BotData, interaction: &CommandInteraction) -> Result<()> {
        handle(ctx, data, interaction).await
    }

    async fn autocomplete(&self, ctx: &Context, _data: &BotData, interaction: &CommandInteraction) -> Result<()> {
        autocomplete(ctx, interaction).await
    }
}
