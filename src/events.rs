use std::sync::Arc;

use serenity::all::{Interaction, Ready};
use serenity::async_trait;
use serenity::prelude::*;

use crate::botdata::BotData;
use crate::commands::{self, CommandRegistry};

pub struct Handler {
    data: Arc<BotData>,
    commands: CommandRegistry,
}

impl Handler {
    pub fn new(data: BotData) -> Self {
        Self { data: Arc::new(data), commands: CommandRegistry::new() }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        log::info!("Logged in as {}", ready.user.name);
        match commands::register_commands(&ctx.http, &self.commands, self.data.config.dev_guild_id).await {
            Ok(registered) => log::info!("Registered {} commands", registered.len()),
            Err(err) => log::error!("Unable to register commands: {err}"),
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Command(ref command) => {
                commands::handle_commands(&ctx, &self.data, &self.commands, command).await
            }
            Interaction::Autocomplete(ref autocomplete) => {
                commands::handle_autocomplete(&ctx, &self.data, &self.commands, autocomplete).await
            }
            // Pager buttons are consumed by each list's own collector.
            _ => (),
        }
    }
}
