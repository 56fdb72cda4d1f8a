use std::env;

use anyhow::{anyhow, Context, Result};
use serenity::all::GuildId;

const DEFAULT_VNDB_CLIENT: &str = "sweetie";

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub saucenao_token: Option<String>,
    pub vndb_client: String,
    /// Commands are set on this guild instead of globally, so they update instantly.
    pub dev_guild_id: Option<GuildId>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let value = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let discord_token = value("DISCORD_TOKEN").ok_or_else(|| anyhow!("DISCORD_TOKEN is not set"))?;
        let dev_guild_id = value("DEV_GUILD_ID")
            .map(|id| id.trim().parse::<u64>().context("DEV_GUILD_ID is not a guild id"))
            .transpose()?
            .filter(|id| *id != 0)
            .map(GuildId::new);

        Ok(Self {
            discord_token,
            saucenao_token: value("SAUCENAO_TOKEN"),
            vndb_client: value("VNDB_CLIENT").unwrap_or_else(|| DEFAULT_VNDB_CLIENT.to_owned()),
            dev_guild_id,
        })
    }

    /// Values that must never be echoed back to users.
    pub fn secrets(&self) -> Vec<&str> {
        let mut secrets = vec![self.discord_token.as_str()];
        if let Some(token) = &self.saucenao_token {
            secrets.push(token);
        }
        secrets
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn token_is_required() {
        assert!(config_from(&[]).is_err());
        assert!(config_from(&[("DISCORD_TOKEN", "  ")]).is_err());
    }

    #[test]
    fn optional_values_fall_back() {
        let config = config_from(&[("DISCORD_TOKEN", "abc")]).unwrap();
        assert_eq!(config.vndb_client, "sweetie");
        assert!(config.saucenao_token.is_none());
        assert!(config.dev_guild_id.is_none());
        assert_eq!(config.secrets(), vec!["abc"]);
    }

    #[test]
    fn guild_id_is_parsed() {
        let config = config_from(&[
            ("DISCORD_TOKEN", "abc"),
            ("DEV_GUILD_ID", "1302224187024216175"),
            ("SAUCENAO_TOKEN", "nao"),
        ])
        .unwrap();
        assert_eq!(config.dev_guild_id, Some(GuildId::new(1302224187024216175)));
        assert_eq!(config.secrets(), vec!["abc", "nao"]);

        assert!(config_from(&[("DISCORD_TOKEN", "abc"), ("DEV_GUILD_ID", "general")]).is_err());
    }
}
