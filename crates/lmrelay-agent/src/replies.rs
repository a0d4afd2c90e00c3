//! Fixed reply texts.

pub const WELCOME: &str = "Hi! I am your LLM relay bot.\n\
Available commands:\n\
/start - show all available commands\n\
/model - show the name of the language model in use\n\
/clear - clear the dialogue context\n\n\
Send any other message and the language model will answer it.";

pub const REGISTRATION_REQUIRED: &str =
    "Please use the /start command to register before using the bot.";

pub const CONTEXT_CLEARED: &str = "Dialogue context cleared.";

pub const CHAT_FAILED: &str = "An error occurred while contacting the model.";

pub const MODEL_LOOKUP_FAILED: &str = "Failed to retrieve model information.";

/// Markdown reply naming the backend model.
pub fn model_in_use(model_id: &str) -> String {
    format!("Model in use: `{model_id}`")
}
