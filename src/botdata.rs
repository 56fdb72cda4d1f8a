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

use crate::config::Config;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// State shared by every command handler.
pub struct BotData {
    pub(crate) config: Config,
    pub(crate) http: reqwest::Client,
}

impl BotData {
    pub fn new(config: Config) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|err| {
                log::warn!("Falling back to a default HTTP client: {err}");
                reqwest::Client::new()
            });
        Self { config, http }
    }

    pub fn secrets(&self) -> Vec<&str> {
        self.config.secrets()
    }
}
