use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use futures::future::BoxFuture;
use serenity::all::{
    ButtonStyle, CommandInteraction, ComponentInteraction, ComponentInteractionCollector, Context,
    CreateActionRow, CreateAttachment, CreateButton, CreateEmbed, CreateEmbedFooter,
    CreateInteractionResponse, CreateInteractionResponseMessage, EditInteractionResponse, Http,
    Message,
};
use serenity::async_trait;

use crate::pager::{Nav, PageStore, PageView, PagerState};
use crate::session::{PagerMessage, Session, SessionFilter};

#[derive(Debug, Clone, Copy)]
pub struct EmbedListOptions {
    /// Session budget per page; the collector lives `time * pages` in total.
    pub time: Duration,
    pub add_footer: bool,
    pub display_amount: usize,
}

impl Default for EmbedListOptions {
    fn default() -> Self {
        Self {
            time: Duration::from_secs(7),
            add_footer: true,
            display_amount: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SendOptions {
    /// The interaction was already deferred, so the first render edits the reply.
    pub deferred: bool,
    pub ephemeral: bool,
}

/// A reply made of several embeds, browsed with "< Prev." and "Next >" buttons
/// that only the invoking user can press.
pub struct EmbedList {
    pages: PageStore<CreateEmbed, CreateAttachment>,
    options: EmbedListOptions,
}

impl EmbedList {
    pub fn new(options: EmbedListOptions) -> Self {
        Self { pages: PageStore::new(), options }
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn add(&mut self, embed: CreateEmbed) {
        self.pages.add(embed);
    }

    pub fn add_with_attachment(&mut self, embed: CreateEmbed, attachments: Vec<CreateAttachment>) {
        self.pages.add_with_attachment(embed, attachments);
    }

    /// `producer` runs the first time the page becomes visible, never again.
    pub fn add_with_memoize<F>(&mut self, embed: CreateEmbed, producer: F)
    where
        F: FnOnce() -> BoxFuture<'static, Result<Vec<CreateAttachment>>> + Send + 'static,
    {
        self.pages.add_with_memoize(embed, producer);
    }

    fn annotate_footers(&mut self) {
        let total = self.pages.len();
        for (i, embed) in self.pages.pages_mut().enumerate() {
            *embed = embed.clone().footer(CreateEmbedFooter::new(format!("{}/{}", i + 1, total)));
        }
    }

    /// Sends the first window and, when there is more than one, starts a
    /// background session that follows the requester's button presses.
    pub async fn send(
        mut self,
        ctx: &Context,
        interaction: &CommandInteraction,
        send_options: SendOptions,
    ) -> Result<Message> {
        if self.options.add_footer {
            self.annotate_footers();
        }

        let total = self.len();
        let state = PagerState::new(self.options.display_amount, total);
        let view = self.pages.render(&state).await;

        let message = if send_options.deferred {
            interaction.edit_response(&ctx.http, edit_payload(view)).await?
        } else {
            let payload = create_payload(view, send_options);
            interaction
                .create_response(&ctx.http, CreateInteractionResponse::Message(payload))
                .await?;
            interaction
                .get_response(&ctx.http)
                .await
                .context("Unable to resolve the paginated reply")?
        };

        if !state.is_navigable() {
            return Ok(message);
        }

        let filter = SessionFilter { message_id: message.id, user_id: interaction.user.id };
        let presses = ComponentInteractionCollector::new(&ctx.shard)
            .filter(move |press| filter.accepts(press.message.id, press.user.id, &press.data.custom_id))
            .stream();

        let ttl = self.options.time * total as u32;
        let session = Session::new(self.pages, state, ttl);
        let mut live = InteractionMessage {
            http: ctx.http.clone(),
            interaction: interaction.clone(),
        };
        tokio::spawn(async move {
            match session.run(presses, &mut live).await {
                Ok(handled) => log::debug!("Pager on {} ended after {handled} presses", filter.message_id),
                Err(err) => log::error!("Pager on {} failed: {err:#}", filter.message_id),
            }
        });

        Ok(message)
    }
}

fn nav_row(view: &PageView<CreateEmbed, CreateAttachment>) -> CreateActionRow {
    CreateActionRow::Buttons(vec![
        CreateButton::new(Nav::BACK_ID)
            .label("< Prev.")
            .style(ButtonStyle::Secondary)
            .disabled(view.back_disabled),
        CreateButton::new(Nav::NEXT_ID)
            .label("Next >")
            .style(ButtonStyle::Secondary)
            .disabled(view.next_disabled),
    ])
}

fn create_payload(view: PageView<CreateEmbed, CreateAttachment>, send_options: SendOptions) -> CreateInteractionResponseMessage {
    let row = nav_row(&view);
    CreateInteractionResponseMessage::new()
        .embeds(view.pages)
        .components(vec![row])
        .files(view.attachments)
        .ephemeral(send_options.ephemeral)
}

/// Replaces the previous window's files with the ones of `view`.
fn edit_payload(view: PageView<CreateEmbed, CreateAttachment>) -> EditInteractionResponse {
    let row = nav_row(&view);
    view.attachments.into_iter().fold(
        EditInteractionResponse::new().embeds(view.pages).components(vec![row]).clear_attachments(),
        |payload, attachment| payload.new_attachment(attachment),
    )
}

/// The reply of a command interaction, redrawn through button interactions.
struct InteractionMessage {
    http: Arc<Http>,
    interaction: CommandInteraction,
}

#[async_trait]
impl PagerMessage<CreateEmbed, CreateAttachment> for InteractionMessage {
    type Press = ComponentInteraction;

    async fn acknowledge(&mut self, press: &ComponentInteraction) -> Result<()> {
        press.create_response(&self.http, CreateInteractionResponse::Acknowledge).await?;
        Ok(())
    }

    async fn update(
        &mut self,
        press: ComponentInteraction,
        view: PageView<CreateEmbed, CreateAttachment>,
    ) -> Result<()> {
        press.edit_response(&self.http, edit_payload(view)).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.interaction
            .edit_response(&self.http, EditInteractionResponse::new().components(Vec::new()))
            .await?;
        Ok(())
    }
}
