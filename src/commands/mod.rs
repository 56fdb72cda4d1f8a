mod anime;
mod japanese;
mod op;
mod sauce;
mod visualnovel;

use std::collections::BTreeMap;
use std::sync::Arc;

use serenity::all::{
    Command, CommandInteraction, Context, CreateAutocompleteResponse, CreateCommand,
    CreateInteractionResponse, GuildId, Http,
};
use serenity::{async_trait, Error};

use crate::botdata::BotData;
use crate::misc::{censor, followup_command, respond_ephemeral, sad_emoji, shortify};

const MESSAGE_LIMIT: usize = 2000;

#[async_trait]
pub trait SlashCommand: Send + Sync {
    fn name(&self) -> &'static str;

    fn register(&self) -> CreateCommand;

    async fn run(&self, ctx: &Context, data: &BotData, interaction: &CommandInteraction) -> anyhow::Result<()>;

    async fn autocomplete(&self, ctx: &Context, _data: &BotData, interaction: &CommandInteraction) -> anyhow::Result<()> {
        let response = CreateInteractionResponse::Autocomplete(CreateAutocompleteResponse::new());
        interaction.create_response(&ctx.http, response).await?;
        Ok(())
    }
}

pub struct CommandRegistry {
    commands: BTreeMap<&'static str, Box<dyn SlashCommand>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        let mut registry = Self { commands: BTreeMap::new() };
        registry.insert(Box::new(anime::Anime));
        registry.insert(Box::new(japanese::Japanese));
        registry.insert(Box::new(op::Opening));
        registry.insert(Box::new(sauce::Sauce));
        registry.insert(Box::new(visualnovel::VisualNovelCommand));
        registry
    }

    fn insert(&mut self, command: Box<dyn SlashCommand>) {
        if self.commands.insert(command.name(), command).is_some() {
            log::warn!("A command was registered twice");
        }
    }

    pub fn get(&self, name: &str) -> Option<&dyn SlashCommand> {
        self.commands.get(name).map(|command| command.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.commands.keys().copied()
    }

    pub fn definitions(&self) -> Vec<CreateCommand> {
        self.commands.values().map(|command| command.register()).collect()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn register_commands(
    http: &Arc<Http>,
    registry: &CommandRegistry,
    dev_guild: Option<GuildId>,
) -> Result<Vec<Command>, Error> {
    let definitions = registry.definitions();
    match dev_guild {
        /*
            Global commands take up to an hour to update,
            guild commands update instantaneously.
        */
        Some(guild_id) => guild_id.set_commands(http, definitions).await,
        None => Command::set_global_commands(http, definitions).await,
    }
}

pub async fn handle_commands(ctx: &Context, data: &BotData, registry: &CommandRegistry, interaction: &CommandInteraction) {
    let name = interaction.data.name.as_str();
    let Some(command) = registry.get(name) else {
        log::warn!("Received unknown command /{name}");
        return;
    };

    log::info!("/{name} invoked by {}", interaction.user.name);
    if let Err(err) = command.run(ctx, data, interaction).await {
        log::error!("/{name} failed: {err:#}");
        report_error(ctx, data, interaction, &err).await;
    }
}

pub async fn handle_autocomplete(ctx: &Context, data: &BotData, registry: &CommandRegistry, interaction: &CommandInteraction) {
    let name = interaction.data.name.as_str();
    let Some(command) = registry.get(name) else {
        log::warn!("Received autocomplete for unknown command /{name}");
        return;
    };

    if let Err(err) = command.autocomplete(ctx, data, interaction).await {
        log::error!("Autocomplete for /{name} failed: {err:#}");
    }
}

fn error_message(err: &anyhow::Error, secrets: &[&str]) -> String {
    let text = format!("{} {}", censor(&format!("{err:#}"), secrets), sad_emoji());
    shortify(&text, MESSAGE_LIMIT)
}

async fn report_error(ctx: &Context, data: &BotData, interaction: &CommandInteraction, err: &anyhow::Error) {
    let text = error_message(err, &data.secrets());
    if respond_ephemeral(ctx, interaction, &text).await.is_ok() {
        return;
    }
    // Already acknowledged (deferred or answered).
    if let Err(err) = followup_command(ctx, interaction, &text, true).await {
        log::error!("Unable to report the error to the user: {err:#}");
    }
}
