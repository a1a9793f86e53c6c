use std::sync::Arc;

use anyhow::{Context as _, Result};
use serenity::all::{
    ChannelId, Client, Command, CommandInteraction, CommandOptionType, Context, CreateCommand,
    CreateCommandOption, CreateInteractionResponse, CreateInteractionResponseFollowup,
    CreateInteractionResponseMessage, CreateMessage, EventHandler, GatewayIntents, Http,
    Interaction, InteractionId, Message, MessageId, Ready,
};
use serenity::async_trait;
use tracing::{debug, error, info, warn};

use crate::config::DiscordConfig;
use crate::platform::{ChannelGate, ChatAction, IncomingMessage, MessageAction};
use crate::relay::Relay;

const PONG: &str = "🏓 Pong! Bot is working!";
const WRONG_CHANNEL: &str = "❌ This command can only be used in the allowed channel.";

/// The `/chat message:<text>` slash command
fn chat_command() -> CreateCommand {
    CreateCommand::new("chat")
        .description("Chat with the AI assistant")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                "message",
                "Your message to the assistant",
            )
            .required(true),
        )
}

fn incoming_message(msg: &Message) -> IncomingMessage {
    IncomingMessage {
        channel_id: msg.channel_id.get(),
        author_id: msg.author.id.get(),
        author_is_bot: msg.author.bot,
        text: msg.content.clone(),
    }
}

/// The parts of a `/chat` interaction needed to answer it
struct ChatInvocation<'a> {
    interaction_id: InteractionId,
    token: &'a str,
    channel_id: u64,
    user_id: u64,
    text: &'a str,
}

impl<'a> ChatInvocation<'a> {
    fn from_command(command: &'a CommandInteraction) -> Self {
        let text = command
            .data
            .options
            .iter()
            .find(|opt| opt.name == "message")
            .and_then(|opt| opt.value.as_str())
            .unwrap_or_default();

        Self {
            interaction_id: command.id,
            token: &command.token,
            channel_id: command.channel_id.get(),
            user_id: command.user.id.get(),
            text,
        }
    }
}

struct Handler {
    relay: Arc<Relay>,
    gate: ChannelGate,
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("Logged in as {}", ready.user.tag());

        match Command::set_global_commands(&ctx.http, vec![chat_command()]).await {
            Ok(synced) => info!("Synced {} slash command(s)", synced.len()),
            Err(e) => error!("Failed to sync commands: {}", e),
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        self.handle_message(&ctx.http, &incoming_message(&msg), msg.id).await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };

        match command.data.name.as_str() {
            "chat" => {
                self.handle_chat_command(&ctx.http, &ChatInvocation::from_command(&command))
                    .await
            }
            other => warn!("Unknown command: {}", other),
        }
    }
}

impl Handler {
    async fn handle_message(&self, http: &Arc<Http>, incoming: &IncomingMessage, id: MessageId) {
        let channel = ChannelId::new(incoming.channel_id);

        match self.gate.classify_message(incoming) {
            MessageAction::Ignore => {}
            MessageAction::Ping => {
                if let Err(e) = channel.say(&**http, PONG).await {
                    error!("Failed to send pong: {}", e);
                }
            }
            MessageAction::Relay(text) => {
                info!(
                    "Message from {} in channel {}: {} chars",
                    incoming.author_id,
                    incoming.channel_id,
                    text.chars().count()
                );

                let typing = channel.start_typing(http);
                let response = self.relay.complete(&text).await;
                typing.stop();

                let reply = CreateMessage::new()
                    .content(response)
                    .reference_message((channel, id));
                if let Err(e) = channel.send_message(&**http, reply).await {
                    error!("Failed to send reply: {}", e);
                }
            }
        }
    }

    async fn handle_chat_command(&self, http: &Http, chat: &ChatInvocation<'_>) {
        if self.gate.classify_chat_command(chat.channel_id) == ChatAction::Refuse {
            debug!(
                "Refusing /chat from {} in channel {}",
                chat.user_id, chat.channel_id
            );
            let refusal = CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(WRONG_CHANNEL)
                    .ephemeral(true),
            );
            if let Err(e) = http
                .create_interaction_response(
                    chat.interaction_id,
                    chat.token,
                    &refusal,
                    Vec::new(),
                )
                .await
            {
                error!("Failed to send refusal: {}", e);
            }
            return;
        }

        let defer = CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new());
        if let Err(e) = http
            .create_interaction_response(chat.interaction_id, chat.token, &defer, Vec::new())
            .await
        {
            error!("Cannot defer response: {}", e);
            return;
        }

        info!(
            "/chat from {} in channel {}: {} chars",
            chat.user_id,
            chat.channel_id,
            chat.text.chars().count()
        );

        let response = self.relay.complete(chat.text).await;

        let followup = CreateInteractionResponseFollowup::new().content(response);
        if let Err(e) = http
            .create_followup_message(chat.token, &followup, Vec::new())
            .await
        {
            error!("Failed to send follow-up: {}", e);
        }
    }
}

/// Connect to the Discord gateway and serve events until shutdown.
pub async fn run(relay: Arc<Relay>, config: &DiscordConfig) -> Result<()> {
    let gate = ChannelGate::from_config(config);
    info!(
        "Starting Discord platform (channel {})...",
        gate.allowed_channel_id()
    );

    let handler = Handler { relay, gate };

    let intents = GatewayIntents::non_privileged() | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&config.bot_token, intents)
        .event_handler(handler)
        .await
        .context("Failed to create Discord client")?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received, stopping Discord client...");
        shard_manager.shutdown_all().await;
    });

    client.start().await.context("Discord client error")?;

    info!("Discord client stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {}", e);
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.ok();
    }
}
