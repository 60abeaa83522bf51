//! Per-command handler implementations
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

pub mod care;
pub mod schedule;

use anyhow::Result;
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::application::interaction::InteractionResponseType;
use serenity::prelude::Context;
use std::sync::Arc;

use super::handler::SlashCommandHandler;
use crate::core::split_message;

/// Create all registered command handlers
///
/// Returns a vector of handlers ready to be registered with CommandRegistry.
pub fn create_all_handlers() -> Vec<Arc<dyn SlashCommandHandler>> {
    vec![
        Arc::new(care::CareHandler),
        Arc::new(schedule::ScheduleHandler),
    ]
}

/// Reply to an interaction, continuing long text in follow-ups
pub(crate) async fn respond(
    serenity_ctx: &Context,
    command: &ApplicationCommandInteraction,
    text: &str,
) -> Result<()> {
    let mut chunks = split_message(text).into_iter();
    let first = chunks.next().unwrap_or_default();

    command
        .create_interaction_response(&serenity_ctx.http, |response| {
            response
                .kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|message| message.content(first))
        })
        .await?;

    for chunk in chunks {
        command
            .create_followup_message(&serenity_ctx.http, |m| m.content(chunk))
            .await?;
    }
    Ok(())
}
