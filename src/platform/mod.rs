pub mod discord;

use crate::config::DiscordConfig;

/// A message received from the chat gateway
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub channel_id: u64,
    pub author_id: u64,
    /// Set for any bot account, including this bot itself
    pub author_is_bot: bool,
    pub text: String,
}

/// What to do with a plain channel message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageAction {
    Ignore,
    Ping,
    Relay(String),
}

/// What to do with a `/chat` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatAction {
    Refuse,
    Relay,
}

/// Restricts the bot to a single channel and recognises prefixed commands.
#[derive(Debug, Clone)]
pub struct ChannelGate {
    allowed_channel_id: u64,
    prefix: String,
}

impl ChannelGate {
    pub fn new(allowed_channel_id: u64, prefix: impl Into<String>) -> Self {
        Self {
            allowed_channel_id,
            prefix: prefix.into(),
        }
    }

    pub fn from_config(config: &DiscordConfig) -> Self {
        Self::new(config.allowed_channel_id, config.command_prefix.clone())
    }

    pub fn allowed_channel_id(&self) -> u64 {
        self.allowed_channel_id
    }

    pub fn is_allowed(&self, channel_id: u64) -> bool {
        channel_id == self.allowed_channel_id
    }

    pub fn classify_message(&self, msg: &IncomingMessage) -> MessageAction {
        if msg.author_is_bot || !self.is_allowed(msg.channel_id) {
            return MessageAction::Ignore;
        }

        if let Some(command) = msg.text.strip_prefix(self.prefix.as_str()) {
            return match command.split(char::is_whitespace).next() {
                Some("ping") => MessageAction::Ping,
                _ => MessageAction::Ignore,
            };
        }

        if msg.text.trim().is_empty() {
            return MessageAction::Ignore;
        }

        MessageAction::Relay(msg.text.clone())
    }

    pub fn classify_chat_command(&self, channel_id: u64) -> ChatAction {
        if self.is_allowed(channel_id) {
            ChatAction::Relay
        } else {
            ChatAction::Refuse
        }
    }
}
