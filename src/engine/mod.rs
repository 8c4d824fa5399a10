//! Reconciliation engine
//!
//! The engine owns the current `RootState` and applies gateway events to it
//! one at a time. Each event is parsed and reconciled against the current
//! snapshot; only a fully successful step replaces it (apply-then-swap).
//! Every committed snapshot is published on a `watch` channel so readers
//! hold a stable view while events keep arriving.

mod config;

pub use config::MirrorConfig;

use crate::core::{MirrorError, Result};
use crate::events::{EventKind, EventRouter};
use crate::state::RootState;
use serde_json::Value as JsonValue;
use tokio::sync::{mpsc, watch};
use tracing::{Level, event, info_span};

/// One raw event from the gateway feed.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    pub name: String,
    pub payload: JsonValue,
}

impl InboundEvent {
    pub fn new(name: impl Into<String>, payload: JsonValue) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

pub struct ReconciliationEngine {
    state: RootState,
    router: EventRouter,
    config: MirrorConfig,
    publisher: watch::Sender<RootState>,
}

impl Default for ReconciliationEngine {
    fn default() -> Self {
        Self::assemble(MirrorConfig::default(), RootState::new())
    }
}

impl ReconciliationEngine {
    /// Fails with `ValidationError` when `config` does not validate.
    pub fn new(config: MirrorConfig) -> Result<Self> {
        Self::with_state(config, RootState::new())
    }

    /// Starts from an existing snapshot, e.g. one restored by the host.
    pub fn with_state(config: MirrorConfig, state: RootState) -> Result<Self> {
        config.validate().map_err(MirrorError::ValidationError)?;
        Ok(Self::assemble(config, state))
    }

    fn assemble(config: MirrorConfig, state: RootState) -> Self {
        let (publisher, _) = watch::channel(state.clone());
        Self {
            state,
            router: EventRouter::with_default_handlers(),
            config,
            publisher,
        }
    }

    /// Replaces the handler set.
    pub fn with_router(mut self, router: EventRouter) -> Self {
        self.router = router;
        self
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    pub fn current_state(&self) -> RootState {
        self.state.clone()
    }

    /// Receiver observing every committed snapshot.
    pub fn subscribe(&self) -> watch::Receiver<RootState> {
        self.publisher.subscribe()
    }

    /// Applies one event and returns the resulting state.
    ///
    /// Events that change nothing return the current state. On error the
    /// current state is left exactly as it was.
    pub fn apply_event(&mut self, name: &str, payload: &JsonValue) -> Result<RootState> {
        let span = info_span!("mirror.apply_event", event_name = %name);
        let _enter = span.enter();

        let kind = match name.parse::<EventKind>() {
            Ok(kind) => kind,
            Err(err) if self.config.strict_unknown_events => {
                event!(Level::WARN, error = %err, "unknown event rejected");
                return Err(err);
            }
            Err(_) => {
                event!(Level::DEBUG, "unknown event ignored");
                return Ok(self.current_state());
            }
        };

        let next = match self.router.dispatch(kind, payload, &self.state, &self.config) {
            Ok(next) => next,
            Err(err) => {
                event!(Level::ERROR, error = %err, "event reconciliation failed");
                return Err(err);
            }
        };

        match next {
            Some(state) => {
                self.state = state;
                self.publisher.send_replace(self.state.clone());
                event!(
                    Level::DEBUG,
                    guilds = self.state.guilds().len(),
                    "mirror state replaced"
                );
            }
            None => event!(Level::TRACE, "event left mirror unchanged"),
        }
        Ok(self.current_state())
    }

    /// Bounded channel sized by `MirrorConfig::feed_capacity`, for feeding
    /// `run`.
    pub fn feed(&self) -> (mpsc::Sender<InboundEvent>, mpsc::Receiver<InboundEvent>) {
        mpsc::channel(self.config.feed_capacity)
    }

    /// Applies events from `feed` in arrival order until every sender is
    /// dropped. Events that fail are logged and skipped. Returns how many
    /// events were skipped.
    pub async fn run(&mut self, mut feed: mpsc::Receiver<InboundEvent>) -> usize {
        let mut skipped = 0;
        while let Some(inbound) = feed.recv().await {
            if let Err(err) = self.apply_event(&inbound.name, &inbound.payload) {
                skipped += 1;
                event!(
                    Level::WARN,
                    event_name = %inbound.name,
                    error = %err,
                    "inbound event skipped"
                );
            }
        }
        skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_events_follow_strictness() {
        let mut lenient = ReconciliationEngine::default();
        let state = lenient.apply_event("TYPING_START", &json!({})).unwrap();
        assert_eq!(state, RootState::new());

        let mut strict = ReconciliationEngine::new(MirrorConfig::new().strict_unknown_events(true)).unwrap();
        assert_eq!(
            strict.apply_event("TYPING_START", &json!({})),
            Err(MirrorError::UnknownEvent("TYPING_START".to_string()))
        );
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let err = ReconciliationEngine::new(MirrorConfig::new().message_cache_limit(0))
            .err()
            .unwrap();
        assert!(matches!(err, MirrorError::ValidationError(_)));

        assert!(
            ReconciliationEngine::with_state(MirrorConfig::new().feed_capacity(0), RootState::new())
                .is_err()
        );
        assert!(ReconciliationEngine::new(MirrorConfig::new().message_cache_limit(1)).is_ok());
    }

    #[test]
    fn subscribers_see_committed_states_only() {
        let mut engine = ReconciliationEngine::default();
        let receiver = engine.subscribe();

        engine.apply_event("GUILD_CREATE", &json!({"id": 1})).unwrap();
        assert_eq!(receiver.borrow().guilds().len(), 1);

        assert!(engine.apply_event("GUILD_CREATE", &json!({"name": "no id"})).is_err());
        assert_eq!(receiver.borrow().guilds().len(), 1);
    }

    #[tokio::test]
    async fn run_drains_feed_and_skips_bad_events() {
        let mut engine = ReconciliationEngine::default();
        let (sender, receiver) = engine.feed();

        sender.send(InboundEvent::new("GuildCreate", json!({"id": 1}))).await.unwrap();
        sender.send(InboundEvent::new("GuildCreate", json!([]))).await.unwrap();
        sender.send(InboundEvent::new("GuildCreate", json!({"id": 2}))).await.unwrap();
        drop(sender);

        let skipped = engine.run(receiver).await;
        assert_eq!(skipped, 1);
        assert_eq!(engine.current_state().guilds().len(), 2);
    }
}
