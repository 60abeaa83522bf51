use crate::commands::context::CommandContext;
use crate::commands::handlers::create_all_handlers;
use crate::commands::registry::CommandRegistry;
use crate::core::{preview, split_message};
use crate::features::companion::voice;
use anyhow::Result;
use log::{debug, error, info, warn};
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::application::interaction::InteractionResponseType;
use serenity::model::channel::Message;
use serenity::prelude::Context;
use std::sync::Arc;
use tokio::time::Instant;
use uuid::Uuid;

/// Free text is only taken from DMs; guild chatter and empty messages are ignored
fn accepts_free_text(is_dm: bool, content: &str) -> bool {
    is_dm && !content.trim().is_empty()
}

#[derive(Clone)]
pub struct CommandHandler {
    context: Arc<CommandContext>,
    registry: CommandRegistry,
}

impl CommandHandler {
    pub fn new(context: CommandContext) -> Self {
        CommandHandler {
            context: Arc::new(context),
            registry: CommandRegistry::with_handlers(create_all_handlers()),
        }
    }

    pub fn context(&self) -> Arc<CommandContext> {
        Arc::clone(&self.context)
    }

    pub async fn handle_message(&self, ctx: &Context, msg: &Message) -> Result<()> {
        let request_id = Uuid::new_v4();
        let is_dm = msg.guild_id.is_none();

        if !accepts_free_text(is_dm, &msg.content) {
            debug!(
                "[{request_id}] Ignoring message in {} (dm: {is_dm})",
                msg.channel_id
            );
            return Ok(());
        }

        info!(
            "[{}] 📥 DM received | User: {} | Channel: {} | Content: '{}'",
            request_id,
            msg.author.id,
            msg.channel_id,
            preview(&msg.content)
        );
        self.handle_dm_message_with_id(ctx, msg, request_id).await
    }

    async fn handle_dm_message_with_id(&self, ctx: &Context, msg: &Message, request_id: Uuid) -> Result<()> {
        let start_time = Instant::now();
        let user_id = msg.author.id.to_string();
        let user_message = msg.content.trim();

        // The DM channel doubles as the delivery address for reminders
        if let Err(e) = self
            .context
            .register_user(&user_id, &msg.author.name, Some(msg.channel_id.to_string()))
            .await
        {
            error!("[{request_id}] ❌ Failed to register user {user_id}: {e}");
        }

        let typing = msg.channel_id.start_typing(&ctx.http)?;

        let nickname = self.context.voice.pick();
        let reply = self
            .context
            .machine
            .handle_text(&user_id, &nickname, user_message)
            .await;

        typing.stop();
        info!(
            "[{request_id}] 🧭 Turn outcome: {:?} | {:?}",
            reply.outcome,
            start_time.elapsed()
        );

        for chunk in split_message(&reply.message) {
            msg.channel_id.say(&ctx.http, chunk).await?;
        }
        debug!("[{request_id}] ✅ Reply sent to {user_id}");
        Ok(())
    }

    pub async fn handle_slash_command(&self, ctx: &Context, command: &ApplicationCommandInteraction) -> Result<()> {
        let request_id = Uuid::new_v4();
        let user_id = command.user.id.to_string();

        info!(
            "[{}] 📥 Slash command received | Command: {} | User: {} | Channel: {}",
            request_id, command.data.name, user_id, command.channel_id
        );

        let Some(handler) = self.registry.get(&command.data.name) else {
            warn!("[{request_id}] ❓ Unknown command: {}", command.data.name);
            command
                .create_interaction_response(&ctx.http, |response| {
                    response
                        .kind(InteractionResponseType::ChannelMessageWithSource)
                        .interaction_response_data(|message| message.content("Unknown command."))
                })
                .await?;
            return Ok(());
        };

        if let Err(e) = handler.handle(self.context(), ctx, command).await {
            error!("[{request_id}] ❌ /{} failed: {e}", command.data.name);
            let apology = voice::apology(&self.context.voice.pick());
            // Either the first response or a follow-up, depending on how far the handler got
            let first = command
                .create_interaction_response(&ctx.http, |response| {
                    response
                        .kind(InteractionResponseType::ChannelMessageWithSource)
                        .interaction_response_data(|message| message.content(&apology))
                })
                .await;
            if first.is_err() {
                command
                    .create_followup_message(&ctx.http, |m| m.content(&apology))
                    .await?;
            }
        } else {
            debug!("[{request_id}] ✅ /{} completed", command.data.name);
        }
        Ok(())
    }
}
