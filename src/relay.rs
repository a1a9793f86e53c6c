use tracing::{info, warn};

use crate::llm::LlmClient;

/// Discord's outbound message limit, in characters.
pub const MESSAGE_LIMIT: usize = 2000;
const ELLIPSIS: &str = "...";

/// Turns user text into the text the bot sends back.
/// Platform-agnostic: every failure is already rendered as a reply string.
pub struct Relay {
    llm: LlmClient,
}

impl Relay {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }

    pub async fn complete(&self, text: &str) -> String {
        match self.llm.complete(text).await {
            Ok(reply) => {
                info!(
                    "Completion from {}: {} chars",
                    self.llm.model(),
                    reply.chars().count()
                );
                truncate_reply(&reply)
            }
            Err(e) => {
                warn!("Completion failed: {}", e);
                truncate_reply(&e.user_message())
            }
        }
    }
}

/// Cut `text` to [`MESSAGE_LIMIT`] characters, marking the cut with `...`.
pub fn truncate_reply(text: &str) -> String {
    if text.chars().count() <= MESSAGE_LIMIT {
        return text.to_string();
    }

    let keep = MESSAGE_LIMIT - ELLIPSIS.len();
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}
