//! Slash command name to handler lookup

use std::collections::HashMap;
use std::sync::Arc;

use super::handler::SlashCommandHandler;

/// Maps each slash command name to the handler that answers it
///
/// A handler declaring several names (`start`, `help`, `love`) is stored once
/// per name. Registering a name twice keeps the later handler.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    handlers: HashMap<&'static str, Arc<dyn SlashCommandHandler>>,
}

impl CommandRegistry {
    pub fn with_handlers(handlers: Vec<Arc<dyn SlashCommandHandler>>) -> Self {
        let mut registry = Self::default();
        for handler in handlers {
            registry.register(handler);
        }
        registry
    }

    fn register(&mut self, handler: Arc<dyn SlashCommandHandler>) {
        for name in handler.command_names() {
            self.handlers.insert(name, Arc::clone(&handler));
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn SlashCommandHandler>> {
        self.handlers.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::context::CommandContext;
    use anyhow::Result;
    use async_trait::async_trait;
    use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
    use serenity::prelude::Context;

    struct NamedHandler(&'static [&'static str]);

    #[async_trait]
    impl SlashCommandHandler for NamedHandler {
        fn command_names(&self) -> &'static [&'static str] {
            self.0
        }

        async fn handle(
            &self,
            _ctx: Arc<CommandContext>,
            _serenity_ctx: &Context,
            _command: &ApplicationCommandInteraction,
        ) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_every_declared_name_resolves() {
        let registry = CommandRegistry::with_handlers(vec![
            Arc::new(NamedHandler(&["start", "help", "love"])),
            Arc::new(NamedHandler(&["status"])),
        ]);
        for name in ["start", "help", "love", "status"] {
            assert!(registry.get(name).is_some(), "/{name} missing");
        }
        assert!(registry.get("clear").is_none());
    }

    #[test]
    fn test_later_handler_wins() {
        let registry = CommandRegistry::with_handlers(vec![
            Arc::new(NamedHandler(&["status"])),
            Arc::new(NamedHandler(&["status", "clear"])),
        ]);
        assert_eq!(registry.get("status").unwrap().command_names().len(), 2);
    }
}
