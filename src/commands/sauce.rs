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

use std::time::Duration;

use anyhow::{bail, Result};
use futures::FutureExt;
use serenity::all::{
    Attachment, CommandInteraction, CommandOptionType, Context, CreateAttachment, CreateCommand,
    CreateCommandOption, ResolvedOption, ResolvedValue,
};
use serenity::async_trait;

use super::SlashCommand;
use crate::apis::saucenao::{self, Verdict};
use crate::apis::{get_bytes, tracemoe};
use crate::botdata::BotData;
use crate::embed_list::{EmbedList, EmbedListOptions, SendOptions};
use crate::misc::{attachment_option, integer_option, is_nsfw_channel, respond_ephemeral, sad_emoji};

const SAUCE_TIME: Duration = Duration::from_secs(15);

pub struct Sauce;

fn is_image(attachment: &Attachment) -> bool {
    attachment.content_type.as_deref().is_some_and(|kind| kind.starts_with("image"))
}

fn list_options(show: usize) -> EmbedListOptions {
    EmbedListOptions { time: SAUCE_TIME, display_amount: show, ..Default::default() }
}

pub async fn handle(ctx: &Context, data: &BotData, interaction: &CommandInteraction) -> Result<()> {
    let options = interaction.data.options();
    let Some(ResolvedOption { name: subcommand, value: ResolvedValue::SubCommand(sub_options), .. }) = options.first() else {
        bail!("/sauce was invoked without a subcommand");
    };
    let Some(image) = attachment_option(sub_options, "image") else {
        bail!("/sauce was invoked without an image");
    };
    let show = integer_option(sub_options, "show").unwrap_or(1).clamp(1, 2) as usize;

    if !is_image(image) {
        return respond_ephemeral(ctx, interaction, &format!("The URL isn't valid {}", sad_emoji())).await;
    }

    match *subcommand {
        "saucenao" => search_saucenao(ctx, data, interaction, &image.proxy_url, show).await,
        "tracemoe" => search_tracemoe(ctx, data, interaction, &image.proxy_url, show).await,
        other => bail!("Unknown /sauce subcommand {other}"),
    }
}

async fn search_saucenao(ctx: &Context, data: &BotData, interaction: &CommandInteraction, url: &str, show: usize) -> Result<()> {
    let Some(api_key) = data.config.saucenao_token.as_deref() else {
        return respond_ephemeral(ctx, interaction, &format!("SauceNAO isn't set up on this bot {}", sad_emoji())).await;
    };

    let message = match saucenao::search(&data.http, api_key, url).await?.verdict() {
        Verdict::Results(results) if results.is_empty() => format!("SauceNAO didn't find anything {}", sad_emoji()),
        Verdict::Results(results) => {
            interaction.defer(&ctx.http).await?;
            let nsfw = is_nsfw_channel(ctx, interaction.channel_id).await;

            let mut list = EmbedList::new(list_options(show));
            for result in &results {
                list.add(result.to_embed(nsfw));
            }
            list.send(ctx, interaction, SendOptions { deferred: true, ..Default::default() }).await?;
            return Ok(());
        }
        Verdict::ServiceProblem(code) => {
            format!("It seems SauceNAO is having some problems {} (code: {code})", sad_emoji())
        }
        Verdict::Unsupported => format!("The URL isn't a supported image by SauceNAO {}", sad_emoji()),
        Verdict::BadRequest(code) => {
            format!("It seems someone in here did something wrong {} (code {code})", sad_emoji())
        }
    };
    respond_ephemeral(ctx, interaction, &message).await
}

async fn search_tracemoe(ctx: &Context, data: &BotData, interaction: &CommandInteraction, url: &str, show: usize) -> Result<()> {
    let response = tracemoe::search(&data.http, url).await?;
    if !response.error.is_empty() {
        return respond_ephemeral(ctx, interaction, &format!("trace.moe error {}: {}", sad_emoji(), response.error)).await;
    }
    if response.result.is_empty() {
        return respond_ephemeral(ctx, interaction, &format!("trace.moe didn't return any results {}", sad_emoji())).await;
    }

    interaction.defer(&ctx.http).await?;
    let nsfw = is_nsfw_channel(ctx, interaction.channel_id).await;

    let mut list = EmbedList::new(list_options(show));
    for (i, result) in response.result.into_iter().enumerate() {
        if result.is_adult() && !nsfw {
            list.add(result.to_embed(None));
            continue;
        }

        let filename = format!("trace{i}.jpg");
        let embed = result.to_embed(Some(&filename));
        let http = data.http.clone();
        let image_url = result.image;
        list.add_with_memoize(embed, move || {
            async move {
                let bytes = get_bytes(&http, &image_url).await?;
                Ok(vec![CreateAttachment::bytes(bytes, filename)])
            }
            .boxed()
        });
    }
    list.send(ctx, interaction, SendOptions { deferred: true, ..Default::default() }).await?;
    Ok(())
}

fn image_options(subcommand: CreateCommandOption) -> CreateCommandOption {
    subcommand
        .add_sub_option(
            CreateCommandOption::new(CommandOptionType::Attachment, "image", "Image to reverse-lookup for")
                .required(true),
        )
        .add_sub_option(
            CreateCommandOption::new(CommandOptionType::Integer, "show", "Amount of embeds to show (defaults to 1)")
                .min_int_value(1)
                .max_int_value(2)
                .required(false),
        )
}

pub fn register() -> CreateCommand {
    CreateCommand::new("sauce").description("Looks up where an image comes from")
        .add_option(image_options(CreateCommandOption::new(
            CommandOptionType::SubCommand,
            "saucenao",
            "Searches the image's original source with saucenao.com",
        )))
        .add_option(image_options(CreateCommandOption::new(
            CommandOptionType::SubCommand,
            "tracemoe",
            "Searches the anime scene with trace.moe",
        )))
}

#[async_trait]
impl SlashCommand for Sauce {
    fn name(&self) -> &'static str {
        "sauce"
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
    use super::*;

    #[test]
    fn both_subcommands_take_an_image() {
        let definition = serde_json::to_value(register()).unwrap();
        let subcommands = definition["options"].as_array().unwrap();
        assert_eq!(subcommands.len(), 2);
        for subcommand in subcommands {
            let options = subcommand["options"].as_array().unwrap();
            assert_eq!(options[0]["name"], "image");
            assert_eq!(options[0]["required"], true);
            assert_eq!(options[1]["name"], "show");
            assert_eq!(options[1]["max_value"], 2);
        }
    }

    #[test]
    fn sauce_lists_show_up_to_two_pages() {
        let options = list_options(2);
        assert_eq!(options.time, SAUCE_TIME);
        assert_eq!(options.display_amount, 2);
        assert!(options.add_footer);
    }
}
