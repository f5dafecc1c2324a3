//! Orchestrator facade: the single entry point for collaboration sessions.
//!
//! [`CollabOrchestrator`] validates preconditions, resolves the two
//! participating agents, creates and stores the [`Session`], and drives the
//! selected protocol on a spawned task while the caller consumes a live
//! [`EventStream`]. Every failure path still ends the stream with exactly
//! one [`Done`](CollabEvent::Done) event.
//!
//! # Architecture
//!
//! ```text
//! caller ──start_session──▶ CollabOrchestrator
//!                             ├─ SessionStore (key → Session)
//!                             └─ ProtocolRunner (owns the session)
//!                                  ├─ StreamInterleaver ──▶ AgentGateway (×2, concurrent)
//!                                  ├─ Convergence scorer (per discussion round)
//!                                  └─ Synthesis fallback chain
//! caller ◀──────────────── live CollabEvent stream ... Done
//! ```

use crate::collabllm::config::CollabConfig;
use crate::collabllm::event::{CollabEvent, EventSink};
use crate::collabllm::gateway::{AgentGateway, ContextItem};
use crate::collabllm::runner::ProtocolRunner;
use crate::collabllm::session::{CollabPhase, Session, DEFAULT_SESSION_KEY};
use crate::collabllm::store::SessionStore;
use futures_util::stream::{self, Stream};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;

/// The live event sequence produced by one `start_session` call.
pub type EventStream = Pin<Box<dyn Stream<Item = CollabEvent> + Send>>;

/// Routes one user query through two concurrently responding agents under
/// the configured collaboration protocol.
pub struct CollabOrchestrator {
    gateway: Arc<dyn AgentGateway>,
    config: CollabConfig,
    store: Arc<SessionStore>,
}

impl CollabOrchestrator {
    pub fn new(gateway: Arc<dyn AgentGateway>, config: CollabConfig) -> Self {
        Self {
            gateway,
            config,
            store: Arc::new(SessionStore::new()),
        }
    }

    /// Start a collaboration session and return its live event sequence.
    ///
    /// Preconditions are checked on the spawned task: when fewer than two
    /// configured agents are reachable the stream is exactly
    /// `[Error, Done]` and no session is created. Otherwise the session is
    /// stored under `session_key` (superseding any previous session under
    /// that key) and remains retrievable after completion until explicitly
    /// cleared.
    pub fn start_session(
        &self,
        query: impl Into<String>,
        context_items: Vec<ContextItem>,
        settings: serde_json::Value,
        session_key: Option<&str>,
    ) -> EventStream {
        let key = session_key.unwrap_or(DEFAULT_SESSION_KEY).to_string();
        let query = query.into();
        let gateway = Arc::clone(&self.gateway);
        let store = Arc::clone(&self.store);
        let config = self.config.clone();

        let (tx, rx) = mpsc::unbounded_channel();
        let events = EventSink::new(tx);

        tokio::spawn(async move {
            drive_session(gateway, store, config, query, context_items, settings, key, events)
                .await;
        });

        Box::pin(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        }))
    }

    /// Cancel the session under `session_key`: tell the gateway to drop any
    /// request tagged with the key and mark the session complete. In-flight
    /// teardown is not awaited.
    pub async fn cancel_session(&self, session_key: &str) -> bool {
        self.gateway.cancel_requests(session_key).await;
        match self.store.get(session_key) {
            Some(shared) => {
                shared.lock().unwrap().advance_phase(CollabPhase::Complete);
                log::info!("session '{}' cancelled", session_key);
                true
            }
            None => false,
        }
    }

    /// Remove the session under `session_key` from the store.
    pub fn clear_session(&self, session_key: &str) -> bool {
        self.store.remove(session_key)
    }

    /// Read-only snapshot of the current session under `session_key`.
    pub fn get_current_session(&self, session_key: &str) -> Option<Session> {
        self.store.snapshot(session_key)
    }

    /// Whether a session exists under `session_key` and has not completed.
    pub fn is_session_active(&self, session_key: &str) -> bool {
        self.store.is_active(session_key)
    }
}

/// The spawned per-session task: precondition checks, session creation,
/// protocol run, and the guaranteed terminal `Done`.
#[allow(clippy::too_many_arguments)]
async fn drive_session(
    gateway: Arc<dyn AgentGateway>,
    store: Arc<SessionStore>,
    mut config: CollabConfig,
    query: String,
    context_items: Vec<ContextItem>,
    settings: serde_json::Value,
    key: String,
    events: EventSink,
) {
    let mut reachable = Vec::new();
    for participant in &config.participants {
        if gateway.is_reachable(&participant.agent_id).await {
            reachable.push(participant.agent_id.clone());
        } else {
            log::warn!("agent '{}' is not reachable", participant.agent_id);
        }
    }
    if reachable.len() < 2 {
        events.emit(CollabEvent::Error {
            message: format!(
                "collaboration requires 2 reachable agents, found {}",
                reachable.len()
            ),
        });
        events.emit(CollabEvent::Done { total_tokens: 0 });
        return;
    }

    // The synthesis agent is replaced quietly; participants are not.
    if !gateway.is_reachable(&config.synthesis_agent_id).await {
        let replacement = reachable[0].clone();
        log::warn!(
            "synthesis agent '{}' unreachable, substituting '{}'",
            config.synthesis_agent_id,
            replacement
        );
        config.synthesis_agent_id = replacement;
    }

    let session = Session::new(query, config.strategy, config.participants.clone());
    log::info!(
        "session '{}' started under key '{}' (strategy {})",
        session.id,
        key,
        config.strategy.as_str()
    );
    let shared = store.insert(&key, session);

    let runner = ProtocolRunner::new(
        Arc::clone(&gateway),
        Arc::clone(&shared),
        key.clone(),
        config,
        context_items,
        settings,
        events.clone(),
    );
    if let Err(err) = runner.run().await {
        log::error!("protocol run under key '{}' failed: {}", key, err);
        events.emit(CollabEvent::Error {
            message: err.to_string(),
        });
    }

    // Never leave a session dangling, whatever happened above.
    let total_tokens = {
        let mut guard = shared.lock().unwrap();
        guard.advance_phase(CollabPhase::Complete);
        guard.total_tokens_used()
    };
    events.emit(CollabEvent::Done { total_tokens });
}
