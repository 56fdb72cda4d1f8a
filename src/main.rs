mod apis;
mod botdata;
mod commands;
mod config;
mod embed_list;
mod events;
mod misc;
mod pager;
mod session;

use std::env;

use botdata::BotData;
use config::Config;
use events::Handler;
use serenity::prelude::*;
use tokio::signal::unix::{signal, SignalKind};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info")
    }
    tracing_subscriber::fmt::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            log::error!("Invalid configuration: {err:#}");
            return;
        }
    };
    let intents = GatewayIntents::GUILDS;

    log::info!("Sweetie initializing");
    let token = config.discord_token.clone();
    let mut client = match Client::builder(&token, intents)
        .event_handler(Handler::new(BotData::new(config)))
        .await
    {
        Ok(client) => client,
        Err(err) => {
            log::error!("Error creating client: {err:?}");
            return;
        }
    };

    // Shut down on ctrl+C
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(sigint) => sigint,
            Err(err) => {
                log::warn!("Unable to listen for ctrl+C: {err}");
                return;
            }
        };

        loop {
            sigint.recv().await;
            log::info!("Shutting down, goodbye");
            shard_manager.shutdown_all().await;
        }
    });

    if let Err(why) = client.start().await {
        log::error!("Client error: {why:?}");
    }
}
