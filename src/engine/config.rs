use crate::collection::OrderPolicy;

/// Tuning knobs of the reconciliation engine.
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorConfig {
    /// Position of a replaced entity, for the entity itself and for every
    /// ancestor re-inserted by bubble-replace.
    pub order_policy: OrderPolicy,

    /// Fail unrecognized event names with `UnknownEvent` instead of
    /// ignoring them.
    pub strict_unknown_events: bool,

    /// Messages kept per channel; `None` keeps everything.
    pub message_cache_limit: Option<usize>,

    /// Buffer size of the inbound event channel built by `feed`.
    pub feed_capacity: usize,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl MirrorConfig {
    pub fn new() -> Self {
        Self {
            order_policy: OrderPolicy::Preserve,
            strict_unknown_events: false,
            message_cache_limit: None,
            feed_capacity: 256,
        }
    }

    pub fn order_policy(mut self, policy: OrderPolicy) -> Self {
        self.order_policy = policy;
        self
    }

    pub fn strict_unknown_events(mut self, strict: bool) -> Self {
        self.strict_unknown_events = strict;
        self
    }

    pub fn message_cache_limit(mut self, limit: usize) -> Self {
        self.message_cache_limit = Some(limit);
        self
    }

    pub fn feed_capacity(mut self, capacity: usize) -> Self {
        self.feed_capacity = capacity;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.feed_capacity == 0 {
            return Err("feed_capacity must be > 0".to_string());
        }
        if self.message_cache_limit == Some(0) {
            return Err("message_cache_limit must be > 0".to_string());
        }
        Ok(())
    }
}
