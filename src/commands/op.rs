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

use anyhow::{anyhow, Result};
use serenity::all::{
    CommandInteraction, CommandOptionType, Context, CreateAutocompleteResponse, CreateCommand,
    CreateCommandOption, CreateInteractionResponse,
};
use serenity::async_trait;

use super::SlashCommand;
use crate::apis::animethemes::{self, Theme, ThemeQuery};
use crate::botdata::BotData;
use crate::misc::{respond_command, respond_ephemeral, sad_emoji, shortify, string_option};

const SUGGESTIONS: usize = 25;
const CHOICE_LIMIT: usize = 100;

pub struct Opening;

fn announcement(theme: &Theme, link: &str) -> String {
    let heading = theme.heading();
    if heading.is_empty() {
        link.to_owned()
    } else {
        format!("{heading}\n{link}")
    }
}

pub async fn handle(ctx: &Context, data: &BotData, interaction: &CommandInteraction) -> Result<()> {
    let options = interaction.data.options();
    let input = string_option(&options, "theme").ok_or_else(|| anyhow!("/op was invoked without a theme"))?;

    let theme = match ThemeQuery::parse(input) {
        ThemeQuery::Id(id) => animethemes::theme(&data.http, id).await?,
        ThemeQuery::Text(text) => animethemes::search(&data.http, text, 1).await?.into_iter().next(),
    };
    let Some(theme) = theme else {
        let message = format!(
            "Couldn't find the anime theme {}\nHint: Use the suggestions that pop up while you write so you can search the precise theme you are searching for.",
            sad_emoji()
        );
        return respond_ephemeral(ctx, interaction, &message).await;
    };
    let Some(link) = theme.link() else {
        return respond_ephemeral(ctx, interaction, &format!("This theme is yet to be uploaded. {}", sad_emoji())).await;
    };

    respond_command(ctx, interaction, &announcement(&theme, &link)).await
}

pub async fn autocomplete(ctx: &Context, data: &BotData, interaction: &CommandInteraction) -> Result<()> {
    let input = interaction.data.autocomplete().map(|option| option.value).unwrap_or_default().trim();
    let themes = if input.is_empty() {
        Vec::new()
    } else {
        animethemes::search(&data.http, input, SUGGESTIONS).await?
    };

    let response = themes
        .iter()
        .take(SUGGESTIONS)
        .fold(CreateAutocompleteResponse::new(), |response, theme| {
            response.add_string_choice(shortify(&theme.label(), CHOICE_LIMIT), ThemeQuery::marker(theme.id))
        });
    interaction.create_response(&ctx.http, CreateInteractionResponse::Autocomplete(response)).await?;
    Ok(())
}

pub fn register() -> CreateCommand {
    CreateCommand::new("op").description("Searches for an anime opening or ending")
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "theme", "Theme to look for")
                .required(true)
                .set_autocomplete(true),
        )
}

#[async_trait]
impl SlashCommand for Opening {
    fn name(&self) -> &'static str {
        "op"
    }

    fn register(&self) -> CreateCommand {
        register()
    }

    async fn run(&self, ctx: &Context, data: &BotData, interaction: &CommandInteraction) -> Result<()> {
        handle(ctx, data, interaction).await
    }

    async fn autocomplete(&self, ctx: &Context, data: &BotData, interaction: &CommandInteraction) -> Result<()> {
        autocomplete(ctx, data, interaction).await
    }
}
