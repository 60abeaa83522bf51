//! Schedule slash commands: /status, /clear

use serenity::builder::CreateApplicationCommand;

pub fn create_commands() -> Vec<CreateApplicationCommand> {
    vec![create_status_command(), create_clear_command()]
}

fn create_status_command() -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name("status")
        .description("Show the reminders I'm keeping for you")
        .to_owned()
}

/// Removes committed entries and anything still awaiting confirmation
fn create_clear_command() -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name("clear")
        .description("Delete all of your reminders")
        .to_owned()
}
