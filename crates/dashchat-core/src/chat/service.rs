//! Chat service tying permission checks, history, and the relay together.
//!
//! `send` performs every check that can still produce an HTTP status
//! (permission, project binding, message validation), persists the user
//! turn, and only then hands back the frame stream. Once the caller starts
//! streaming, failures are reported in-band by the relay.

use std::sync::Arc;
use std::time::Duration;

use dashchat_types::chat::{SessionKey, Turn, TurnRole};
use dashchat_types::error::ChatError;
use dashchat_types::identity::Identity;
use dashchat_types::upstream::CompletionRequest;
use tracing::{info, warn};

use crate::chat::context::{ContextAssembler, UserMessage};
use crate::chat::history::HistoryStore;
use crate::chat::session_key::SessionKeyBuilder;
use crate::permission::repository::{GrantRepository, ProjectRepository};
use crate::permission::resolver::PermissionResolver;
use crate::relay::upstream::CompletionUpstream;
use crate::relay::{AfterPersist, ClientStream, RelayExchange, StreamRelay};
use crate::task::BackgroundTasks;

/// Name of the post-exchange project activity task.
pub const TOUCH_ACTIVITY_TASK: &str = "touch_project_activity";

/// Tunables for the chat service.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub model: String,
    pub history_limit: u32,
    pub assistant_name: String,
    /// Upper bound on one upstream exchange, connect through last frame.
    pub time_limit: Duration,
}

/// The storage and upstream ports a chat service runs against.
pub struct ChatPorts<H, G, P, U> {
    pub history: Arc<H>,
    pub grants: Arc<G>,
    pub projects: Arc<P>,
    pub upstream: Arc<U>,
}

/// A chat message as submitted by a client.
#[derive(Debug, Clone, Default)]
pub struct SendRequest {
    pub message: String,
    pub project_id: Option<i64>,
    pub image_data_url: Option<String>,
}

/// Orchestrates one chat exchange from permission check to relay.
///
/// Generic over the ports so dashchat-core never depends on
/// dashchat-infra.
pub struct ChatService<H, G, P, U>
where
    H: HistoryStore,
    G: GrantRepository,
    P: ProjectRepository,
    U: CompletionUpstream,
{
    history: Arc<H>,
    projects: Arc<P>,
    resolver: PermissionResolver<G, P>,
    keys: SessionKeyBuilder,
    assembler: ContextAssembler,
    relay: StreamRelay<H, U>,
    model: String,
    tasks: BackgroundTasks,
}

impl<H, G, P, U> ChatService<H, G, P, U>
where
    H: HistoryStore + 'static,
    G: GrantRepository,
    P: ProjectRepository + 'static,
    U: CompletionUpstream + 'static,
{
    pub fn new(ports: ChatPorts<H, G, P, U>, settings: ChatSettings, tasks: BackgroundTasks) -> Self {
        let ChatPorts {
            history,
            grants,
            projects,
            upstream,
        } = ports;
        Self {
            resolver: PermissionResolver::new(grants, Arc::clone(&projects)),
            relay: StreamRelay::new(Arc::clone(&history), upstream, settings.time_limit),
            keys: SessionKeyBuilder::default(),
            assembler: ContextAssembler::new(settings.history_limit, settings.assistant_name),
            model: settings.model,
            history,
            projects,
            tasks,
        }
    }

    pub fn tasks(&self) -> &BackgroundTasks {
        &self.tasks
    }

    /// Validate a chat message, persist it, and start relaying the reply.
    pub async fn send(
        &self,
        identity: &Identity,
        request: SendRequest,
    ) -> Result<ClientStream, ChatError> {
        let resolution = self
            .resolver
            .resolve(identity.user_id, request.project_id, identity.is_admin)
            .await?;

        if !resolution.tier.can_chat() {
            warn!(
                user_id = identity.user_id,
                project_id = request.project_id,
                "Chat denied: no chat access"
            );
            return Err(ChatError::PermissionDenied);
        }
        let project = resolution.project.ok_or(ChatError::MissingProjectContext)?;
        let message = UserMessage::parse(request.message, request.image_data_url)?;

        let session_key = self.keys.build(identity.user_id, Some(&project.slug));
        let history = self
            .history
            .recent(&session_key, self.assembler.history_limit())
            .await?;

        let user_turn = Turn::new(
            identity.user_id,
            session_key.clone(),
            TurnRole::User,
            message.persisted_content(),
        );
        self.history.append(&user_turn).await?;

        let system = self
            .assembler
            .system_prompt(resolution.tier, &project, identity);
        let messages = self.assembler.assemble(system, &history, message);

        info!(
            user_id = identity.user_id,
            project = %project.slug,
            session_key = %session_key,
            tier = %resolution.tier,
            replayed_turns = history.len(),
            "Starting chat exchange"
        );

        let tasks = self.tasks.clone();
        let projects = Arc::clone(&self.projects);
        let project_id = project.id;
        let after_persist: AfterPersist = Box::new(move |_turn: &Turn| {
            tasks.spawn(TOUCH_ACTIVITY_TASK, async move {
                projects.touch_chat_activity(project_id).await
            });
        });

        Ok(self.relay.relay(RelayExchange {
            user_id: identity.user_id,
            session_key: session_key.clone(),
            request: CompletionRequest {
                model: self.model.clone(),
                stream: true,
                user: session_key.to_string(),
                messages,
            },
            after_persist: Some(after_persist),
        }))
    }

    /// The caller's persisted turns for one project, oldest first.
    pub async fn history(
        &self,
        identity: &Identity,
        project_id: Option<i64>,
    ) -> Result<(SessionKey, Vec<Turn>), ChatError> {
        let resolution = self
            .resolver
            .resolve(identity.user_id, project_id, identity.is_admin)
            .await?;
        if !resolution.tier.can_chat() {
            return Err(ChatError::PermissionDenied);
        }
        let project = resolution.project.ok_or(ChatError::MissingProjectContext)?;

        let session_key = self.keys.build(identity.user_id, Some(&project.slug));
        let turns = self
            .history
            .recent(&session_key, self.assembler.history_limit())
            .await?;
        Ok((session_key, turns))
    }

    /// Delete every turn of the caller's session for one scope.
    ///
    /// Needs only an identity: users who lost chat access may still clear
    /// what they said.
    pub async fn clear_history(
        &self,
        identity: &Identity,
        project_id: Option<i64>,
    ) -> Result<(SessionKey, u64), ChatError> {
        let project = match project_id {
            Some(id) => self.projects.find_project(id).await?,
            None => None,
        };
        let session_key = self
            .keys
            .build(identity.user_id, project.as_ref().map(|p| p.slug.as_str()));

        let deleted = self.history.clear(&session_key).await?;
        info!(
            user_id = identity.user_id,
            session_key = %session_key,
            deleted,
            "Cleared chat history"
        );
        Ok((session_key, deleted))
    }
}
