//! Schedule command handlers
//!
//! Handles: status, clear

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::prelude::Context;
use std::sync::Arc;

use super::respond;
use crate::commands::context::{render_cleared, CommandContext};
use crate::commands::handler::SlashCommandHandler;

/// Handler for schedule commands: status, clear
pub struct ScheduleHandler;

#[async_trait]
impl SlashCommandHandler for ScheduleHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["status", "clear"]
    }

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        let user_id = command.user.id.to_string();
        let nickname = ctx.voice.pick();

        let text = match command.data.name.as_str() {
            "status" => ctx.status_text(&user_id, &nickname).await?,
            "clear" => {
                let cleared = ctx.clear(&user_id).await?;
                render_cleared(cleared, &nickname)
            }
            _ => return Ok(()),
        };

        respond(serenity_ctx, command, &text).await?;
        info!("/{} completed for user {user_id}", command.data.name);
        Ok(())
    }
}
