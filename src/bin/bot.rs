use anyhow::Result;
use dotenvy::dotenv;
use log::{error, info, warn};
use serenity::async_trait;
use serenity::model::application::interaction::Interaction;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::id::GuildId;
use serenity::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use carebot::commands::{
    register_global_commands, register_guild_commands, CommandContext, CommandHandler,
};
use carebot::core::Config;
use carebot::database::Database;
use carebot::features::ai::{LanguageModel, OpenAiChat};
use carebot::features::companion::Voice;
use carebot::features::confirmation::ConfirmationMachine;
use carebot::features::extraction::EntityExtractor;
use carebot::features::get_bot_version;
use carebot::features::reminders::{
    DiscordNotifier, DispatchSettings, ReminderComposer, ReminderScheduler,
};

const EXTRACTION_RETRY_DELAY: Duration = Duration::from_millis(500);

struct Handler {
    command_handler: Arc<CommandHandler>,
    guild_id: Option<GuildId>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        if let Err(e) = self.command_handler.handle_message(&ctx, &msg).await {
            error!("Error handling message: {e}");
            if let Err(why) = msg
                .channel_id
                .say(
                    &ctx.http,
                    "Sorry, my love, something went wrong on my side 😔 Please try again. 💕",
                )
                .await
            {
                error!("Failed to send error message: {why}");
            }
        }
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🎉 {} is connected and ready!", ready.user.name);
        info!("📡 Connected to {} guilds", ready.guilds.len());
        info!("🤖 Bot ID: {}", ready.user.id);

        // Guild commands update instantly; global ones can take an hour to propagate
        if let Some(guild_id) = self.guild_id {
            info!("🔧 Development mode: Registering commands for guild {guild_id}");
            if let Err(e) = register_guild_commands(&ctx, guild_id).await {
                error!("❌ Failed to register guild slash commands: {e}");
            }
        } else {
            info!("🌍 Production mode: Registering commands globally");
            if let Err(e) = register_global_commands(&ctx).await {
                error!("❌ Failed to register global slash commands: {e}");
            }
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::ApplicationCommand(command) = interaction {
            if let Err(e) = self
                .command_handler
                .handle_slash_command(&ctx, &command)
                .await
            {
                error!(
                    "Error handling slash command '{}': {}",
                    command.data.name, e
                );
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    // The openai crate reads its key from the environment, not from our config
    std::env::set_var("OPENAI_API_KEY", &config.openai_api_key);
    std::env::set_var("OPENAI_KEY", &config.openai_api_key);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting carebot v{}...", get_bot_version());

    let database = Database::new(&config.database_path).await?;
    let model: Arc<dyn LanguageModel> =
        Arc::new(OpenAiChat::new(config.openai_model.clone(), config.ai_timeout));
    let voice = Voice::new(config.nicknames.clone());

    let extractor = EntityExtractor::new(
        model.clone(),
        config.extraction_max_attempts,
        EXTRACTION_RETRY_DELAY,
    );
    let machine = Arc::new(ConfirmationMachine::new(
        Arc::new(database.clone()),
        Arc::new(database.clone()),
        extractor,
        config.history_turns,
    ));

    let context = CommandContext::new(
        Arc::new(database.clone()),
        machine,
        model.clone(),
        voice.clone(),
    );

    let guild_id = config
        .discord_guild_id
        .as_ref()
        .and_then(|id| id.parse::<u64>().ok())
        .map(GuildId);

    let handler = Handler {
        command_handler: Arc::new(CommandHandler::new(context)),
        guild_id,
    };

    let intents = GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::GUILDS
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .await
        .map_err(|e| {
            error!("Failed to create Discord client: {e}");
            anyhow::anyhow!("Client creation failed: {}", e)
        })?;

    // Start the reminder scheduler
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let composer = ReminderComposer::new(
        model,
        Arc::new(database.clone()),
        config.history_turns,
        config.ai_timeout,
    );
    let scheduler = ReminderScheduler::new(
        Arc::new(database),
        Arc::new(DiscordNotifier::new(client.cache_and_http.http.clone())),
        Arc::new(composer),
        voice,
        DispatchSettings::from_config(&config),
    );
    tokio::spawn(scheduler.run(shutdown_rx));

    // Ctrl-C stops the ticker and then the gateway
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Could not listen for Ctrl-C: {e}");
            return;
        }
        info!("🛑 Shutdown requested");
        let _ = shutdown_tx.send(true);
        shard_manager.lock().await.shutdown_all().await;
    });

    info!("Establishing WebSocket connection to Discord gateway...");
    if let Err(why) = client.start().await {
        error!("Gateway connection failed: {why:?}");
        return Err(anyhow::anyhow!(
            "Failed to establish gateway connection: {}",
            why
        ));
    }

    Ok(())
}
