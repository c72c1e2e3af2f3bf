//! In-memory port implementations shared by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures_util::StreamExt;

use dashchat_types::chat::{SessionKey, Turn};
use dashchat_types::error::{RepositoryError, UpstreamError};
use dashchat_types::permission::{ProjectOverride, Tier};
use dashchat_types::project::Project;
use dashchat_types::upstream::CompletionRequest;

use crate::chat::history::HistoryStore;
use crate::permission::repository::{GrantRepository, ProjectRepository};
use crate::relay::upstream::{CompletionUpstream, UpstreamBody};
use crate::relay::ClientStream;

/// A project named after its slug ("acme" -> "Acme", "org/acme").
pub fn project(id: i64, slug: &str) -> Project {
    let mut name = slug.to_string();
    if let Some(first) = name.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    Project {
        id,
        slug: slug.to_string(),
        name,
        repo_full_name: format!("org/{slug}"),
        created_by_user_id: 1,
        brief: None,
    }
}

/// Drain a relay into UTF-8 frames.
pub async fn collect_frames(stream: ClientStream) -> Vec<String> {
    stream
        .map(|frame| String::from_utf8(frame.to_vec()).unwrap())
        .collect()
        .await
}

// -- history --

#[derive(Default)]
pub struct InMemoryHistory {
    turns: Mutex<Vec<Turn>>,
    fail_appends: AtomicBool,
}

impl InMemoryHistory {
    pub fn turns_for(&self, key: &SessionKey) -> Vec<Turn> {
        self.turns
            .lock()
            .unwrap()
            .iter()
            .filter(|t| &t.session_key == key)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.turns.lock().unwrap().len()
    }

    pub fn fail_appends(&self) {
        self.fail_appends.store(true, Ordering::SeqCst);
    }
}

impl HistoryStore for InMemoryHistory {
    async fn append(&self, turn: &Turn) -> Result<(), RepositoryError> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(RepositoryError::Query("disk full".to_string()));
        }
        self.turns.lock().unwrap().push(turn.clone());
        Ok(())
    }

    async fn recent(&self, key: &SessionKey, limit: u32) -> Result<Vec<Turn>, RepositoryError> {
        let turns = self.turns_for(key);
        let skip = turns.len().saturating_sub(limit as usize);
        Ok(turns.into_iter().skip(skip).collect())
    }

    async fn clear(&self, key: &SessionKey) -> Result<u64, RepositoryError> {
        let mut turns = self.turns.lock().unwrap();
        let before = turns.len();
        turns.retain(|t| &t.session_key != key);
        Ok((before - turns.len()) as u64)
    }
}

// -- grants and projects --

#[derive(Default)]
pub struct StaticGrants {
    globals: HashMap<i64, Tier>,
    overrides: HashMap<(i64, i64), Tier>,
}

impl StaticGrants {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global(mut self, user_id: i64, tier: Tier) -> Self {
        self.globals.insert(user_id, tier);
        self
    }

    pub fn project_override(mut self, user_id: i64, project_id: i64, tier: Tier) -> Self {
        self.overrides.insert((user_id, project_id), tier);
        self
    }
}

impl GrantRepository for StaticGrants {
    async fn global_tier(&self, user_id: i64) -> Result<Tier, RepositoryError> {
        Ok(self.globals.get(&user_id).copied().unwrap_or_default())
    }

    async fn project_override(
        &self,
        user_id: i64,
        project_id: i64,
    ) -> Result<ProjectOverride, RepositoryError> {
        Ok(self
            .overrides
            .get(&(user_id, project_id))
            .copied()
            .map(ProjectOverride::Explicit)
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct StaticProjects {
    projects: Vec<Project>,
    touched: Mutex<Vec<i64>>,
    fail_touch: AtomicBool,
}

impl StaticProjects {
    pub fn with(projects: Vec<Project>) -> Self {
        Self {
            projects,
            ..Self::default()
        }
    }

    pub fn touched(&self) -> Vec<i64> {
        self.touched.lock().unwrap().clone()
    }

    pub fn fail_touch(&self) {
        self.fail_touch.store(true, Ordering::SeqCst);
    }
}

impl ProjectRepository for StaticProjects {
    async fn find_project(&self, project_id: i64) -> Result<Option<Project>, RepositoryError> {
        Ok(self.projects.iter().find(|p| p.id == project_id).cloned())
    }

    async fn touch_chat_activity(&self, project_id: i64) -> Result<(), RepositoryError> {
        if self.fail_touch.load(Ordering::SeqCst) {
            return Err(RepositoryError::Query("database is locked".to_string()));
        }
        self.touched.lock().unwrap().push(project_id);
        Ok(())
    }
}

// -- upstream --

/// What a `ScriptedUpstream` does when asked to open a stream.
#[derive(Debug, Clone)]
pub enum UpstreamScript {
    /// Deliver these chunks, then end cleanly.
    Chunks(Vec<String>),
    /// Reject with this status before any frame.
    Rejected { status: u16 },
    /// Fail to connect at all.
    ConnectFails,
    /// Deliver these chunks, then fail with a transport error.
    FailsAfter(Vec<String>),
    /// Deliver these chunks, then never produce anything again.
    Stalls(Vec<String>),
}

impl UpstreamScript {
    pub fn body(chunks: &[&str]) -> Self {
        UpstreamScript::Chunks(chunks.iter().map(|c| c.to_string()).collect())
    }
}

pub struct ScriptedUpstream {
    script: UpstreamScript,
    requests: Mutex<Vec<CompletionRequest>>,
    body_alive: Arc<AtomicBool>,
}

struct BodyGuard(Arc<AtomicBool>);

impl Drop for BodyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ScriptedUpstream {
    pub fn new(script: UpstreamScript) -> Self {
        Self {
            script,
            requests: Mutex::new(Vec::new()),
            body_alive: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Whether a body handed out by this upstream is still held.
    pub fn body_alive(&self) -> bool {
        self.body_alive.load(Ordering::SeqCst)
    }
}

enum Tail {
    End,
    Fail,
    Stall,
}

impl CompletionUpstream for ScriptedUpstream {
    async fn open_stream(&self, request: CompletionRequest) -> Result<UpstreamBody, UpstreamError> {
        self.requests.lock().unwrap().push(request);

        let (chunks, tail) = match &self.script {
            UpstreamScript::Rejected { status } => {
                return Err(UpstreamError::Rejected {
                    status: *status,
                    body: "upstream says no".to_string(),
                });
            }
            UpstreamScript::ConnectFails => {
                return Err(UpstreamError::Transport("connection refused".to_string()));
            }
            UpstreamScript::Chunks(chunks) => (chunks.clone(), Tail::End),
            UpstreamScript::FailsAfter(chunks) => (chunks.clone(), Tail::Fail),
            UpstreamScript::Stalls(chunks) => (chunks.clone(), Tail::Stall),
        };

        self.body_alive.store(true, Ordering::SeqCst);
        let guard = BodyGuard(Arc::clone(&self.body_alive));

        Ok(Box::pin(async_stream::stream! {
            let _guard = guard;
            for chunk in chunks {
                yield Ok(Bytes::from(chunk));
            }
            match tail {
                Tail::End => {}
                Tail::Fail => yield Err(UpstreamError::Transport("connection reset".to_string())),
                Tail::Stall => futures_util::future::pending::<()>().await,
            }
        }))
    }
}
