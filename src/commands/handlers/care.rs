//! Companion command handlers
//!
//! Handles: start, help, love

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::application::interaction::InteractionResponseType;
use serenity::prelude::Context;
use std::sync::Arc;

use super::respond;
use crate::commands::context::CommandContext;
use crate::commands::handler::SlashCommandHandler;
use crate::features::companion::voice;

/// Handler for companion commands: start, help, love
pub struct CareHandler;

#[async_trait]
impl SlashCommandHandler for CareHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["start", "help", "love"]
    }

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        match command.data.name.as_str() {
            "start" => self.handle_start(&ctx, serenity_ctx, command).await,
            "help" => respond(serenity_ctx, command, &voice::help_text(&ctx.voice.pick())).await,
            "love" => self.handle_love(&ctx, serenity_ctx, command).await,
            _ => Ok(()),
        }
    }
}

impl CareHandler {
    /// Register the caller with their DM channel as delivery address
    async fn handle_start(
        &self,
        ctx: &CommandContext,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        let user_id = command.user.id.to_string();
        let dm_channel = command.user.create_dm_channel(serenity_ctx).await?;
        ctx.register_user(&user_id, &command.user.name, Some(dm_channel.id.to_string()))
            .await?;

        let nickname = ctx.voice.pick();
        respond(serenity_ctx, command, &voice::welcome(&nickname)).await?;
        info!("Registered user {user_id} via /start");
        Ok(())
    }

    /// Generation can outlast the interaction deadline, so defer first
    async fn handle_love(
        &self,
        ctx: &CommandContext,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        command
            .create_interaction_response(&serenity_ctx.http, |r| {
                r.kind(InteractionResponseType::DeferredChannelMessageWithSource)
            })
            .await?;

        let nickname = ctx.voice.pick();
        let note = voice::love_note(ctx.model.as_ref(), &nickname).await;

        command
            .edit_original_interaction_response(&serenity_ctx.http, |r| r.content(note))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_care_handler_commands() {
        let handler = CareHandler;
        let names = handler.command_names();

        assert!(names.contains(&"start"));
        assert!(names.contains(&"help"));
        assert!(names.contains(&"love"));
        assert_eq!(names.len(), 3);
    }
}
