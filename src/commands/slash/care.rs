//! Companion slash commands: /start, /help, /love

use serenity::builder::CreateApplicationCommand;

pub fn create_commands() -> Vec<CreateApplicationCommand> {
    vec![
        CreateApplicationCommand::default()
            .name("start")
            .description("Say hello and let me start looking after you")
            .to_owned(),
        CreateApplicationCommand::default()
            .name("help")
            .description("How to tell me about your medicines and tasks")
            .to_owned(),
        CreateApplicationCommand::default()
            .name("love")
            .description("A little love note from me")
            .to_owned(),
    ]
}
