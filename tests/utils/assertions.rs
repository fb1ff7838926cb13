//! Test assertion helpers - fluent API for verifying published events
#![allow(dead_code)] // Test utilities may not all be used in every test

use codeconquer::event::{EventKind, GameEvent};
use tokio::sync::broadcast::error::TryRecvError;

use super::setup::TestSetup;

// ============================================================================
// Assertion Helpers
// ============================================================================

pub struct EventAssertion {
    events: Vec<GameEvent>,
}

impl EventAssertion {
    /// Drains every event the setup's subscription has received so far
    pub fn drain(setup: &mut TestSetup) -> Self {
        let mut events = vec![];
        loop {
            match setup.events.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
                Err(TryRecvError::Lagged(skipped)) => {
                    panic!("event subscription lagged by {}", skipped)
                }
            }
        }
        Self { events }
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.iter().map(|e| e.kind).collect()
    }

    /// Asserts the exact kinds received, in order
    pub fn exactly(self, expected: &[EventKind]) -> Self {
        assert_eq!(self.kinds(), expected, "unexpected event sequence");
        self
    }

    pub fn contains(self, kind: EventKind) -> Self {
        assert!(
            self.kinds().contains(&kind),
            "expected a {} event in {:?}",
            kind,
            self.kinds()
        );
        self
    }

    pub fn none(self) -> Self {
        assert!(self.events.is_empty(), "expected no events, got {:?}", self.kinds());
        self
    }

    /// Sequence numbers must increase by exactly one
    pub fn contiguous(self) -> Self {
        for pair in self.events.windows(2) {
            assert_eq!(pair[1].seq, pair[0].seq + 1, "event sequence has a gap");
        }
        self
    }

    pub fn last_message(&self) -> &str {
        self.events
            .last()
            .map(|e| e.message.as_str())
            .expect("no events received")
    }
}
