//! Upstream context assembly.
//!
//! The message list sent upstream is, in order:
//! 1. one system turn describing tier, project, and user;
//! 2. the last N persisted turns of the session, oldest first, not
//!    including the message being sent;
//! 3. the new user turn, plain text or text + image parts.

use base64::Engine;
use dashchat_types::chat::{Turn, TurnRole};
use dashchat_types::error::ChatError;
use dashchat_types::identity::Identity;
use dashchat_types::permission::Tier;
use dashchat_types::project::Project;
use dashchat_types::upstream::{
    ContentPart, ImageUrl, MessageContent, UpstreamMessage, UpstreamRole,
};

/// Placeholder stored as the user turn for an image sent without text.
pub const IMAGE_ONLY_PLACEHOLDER: &str = "[image]";

/// A validated inline image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    data_url: String,
}

impl InlineImage {
    /// Accept `data:image/<type>;base64,<payload>` with a decodable payload.
    pub fn parse(data_url: String) -> Result<Self, ChatError> {
        let rest = data_url
            .strip_prefix("data:image/")
            .ok_or_else(|| ChatError::InvalidImage("expected a data:image/ URL".to_string()))?;
        let (_media, payload) = rest
            .split_once(";base64,")
            .ok_or_else(|| ChatError::InvalidImage("image must be base64 encoded".to_string()))?;
        if payload.is_empty() {
            return Err(ChatError::InvalidImage("image payload is empty".to_string()));
        }
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| ChatError::InvalidImage(format!("bad base64 payload: {e}")))?;
        Ok(Self { data_url })
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }
}

/// The in-flight user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMessage {
    text: String,
    image: Option<InlineImage>,
}

impl UserMessage {
    pub fn parse(text: String, image_data_url: Option<String>) -> Result<Self, ChatError> {
        let image = image_data_url
            .filter(|url| !url.is_empty())
            .map(InlineImage::parse)
            .transpose()?;
        if text.trim().is_empty() && image.is_none() {
            return Err(ChatError::EmptyMessage);
        }
        Ok(Self { text, image })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn image(&self) -> Option<&InlineImage> {
        self.image.as_ref()
    }

    /// What gets persisted as the user turn. Image bytes are not stored.
    pub fn persisted_content(&self) -> String {
        if self.text.trim().is_empty() {
            IMAGE_ONLY_PLACEHOLDER.to_string()
        } else {
            self.text.clone()
        }
    }

    fn into_content(self) -> MessageContent {
        match self.image {
            None => MessageContent::Text(self.text),
            Some(image) => {
                let mut parts = Vec::with_capacity(2);
                if !self.text.trim().is_empty() {
                    parts.push(ContentPart::Text { text: self.text });
                }
                parts.push(ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image.data_url,
                    },
                });
                MessageContent::Parts(parts)
            }
        }
    }
}

/// Builds the ordered message list sent upstream.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    history_limit: u32,
    assistant_name: String,
}

impl ContextAssembler {
    pub fn new(history_limit: u32, assistant_name: impl Into<String>) -> Self {
        Self {
            history_limit,
            assistant_name: assistant_name.into(),
        }
    }

    /// How many persisted turns to replay.
    pub fn history_limit(&self) -> u32 {
        self.history_limit
    }

    /// The system turn for a caller bound to a project.
    pub fn system_prompt(&self, tier: Tier, project: &Project, identity: &Identity) -> String {
        let mut prompt = format!(
            "You are {}, the assistant built into the project dashboard.\n\n",
            self.assistant_name
        );

        prompt.push_str(&format!("Project: {}\n", project.name));
        prompt.push_str(&format!("Repository: {}\n", project.repo_full_name));
        if let Some(brief) = project.brief.as_deref().filter(|b| !b.trim().is_empty()) {
            prompt.push_str(&format!("Project brief:\n{}\n", brief.trim()));
        }

        prompt.push_str(&format!(
            "\nYou are talking to {} ({}). Their access level is \"{tier}\".\n",
            identity.addressed_as(),
            identity.email
        ));
        prompt.push_str(tier_guidance(tier));
        prompt
    }

    /// Assemble system + history + new user turn.
    ///
    /// `history` must not contain the in-flight message; only its newest
    /// `history_limit` turns are used.
    pub fn assemble(
        &self,
        system_prompt: String,
        history: &[Turn],
        message: UserMessage,
    ) -> Vec<UpstreamMessage> {
        let skip = history.len().saturating_sub(self.history_limit as usize);
        let mut messages = Vec::with_capacity(history.len() - skip + 2);

        messages.push(UpstreamMessage::text(UpstreamRole::System, system_prompt));
        for turn in &history[skip..] {
            let role = match turn.role {
                TurnRole::User => UpstreamRole::User,
                TurnRole::Assistant => UpstreamRole::Assistant,
            };
            messages.push(UpstreamMessage::text(role, turn.content.clone()));
        }
        messages.push(UpstreamMessage {
            role: UpstreamRole::User,
            content: message.into_content(),
        });

        messages
    }
}

fn tier_guidance(tier: Tier) -> &'static str {
    match tier {
        Tier::None => "You must not help this user.\n",
        Tier::Guide => {
            "Explain how to use the dashboard and this project's features. \
             Do not discuss source code or implementation details.\n"
        }
        Tier::Bug => {
            "Help the user describe and triage problems: ask for reproduction \
             steps, expected and actual behaviour, and environment. You may \
             refer to the project's general structure but do not propose code \
             changes.\n"
        }
        Tier::Developer => {
            "You may discuss the repository's code, architecture, and \
             implementation in full technical depth.\n"
        }
    }
}
