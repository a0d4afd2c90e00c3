//! Command router — classifies inbound text.
//!
//! Only the leading token is inspected. A `@botname` suffix (as Telegram
//! appends in group chats) is ignored, and unknown slash commands are plain
//! chat text for the model.

/// A bot-level command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Directive {
    /// `/start`, `/register`
    Register,
    /// `/model`
    ShowModel,
    /// `/clear`
    ClearContext,
}

impl Directive {
    /// Match a bare command token such as `/start`.
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "/start" | "/register" => Some(Directive::Register),
            "/model" => Some(Directive::ShowModel),
            "/clear" => Some(Directive::ClearContext),
            _ => None,
        }
    }
}

/// What a message asks for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Directive(Directive),
    Chat(String),
}

impl Command {
    pub fn parse(text: &str) -> Command {
        let directive = text
            .split_whitespace()
            .next()
            .filter(|token| token.starts_with('/'))
            .map(|token| token.split_once('@').map_or(token, |(cmd, _bot)| cmd))
            .and_then(Directive::from_token);

        match directive {
            Some(d) => Command::Directive(d),
            None => Command::Chat(text.to_string()),
        }
    }
}
