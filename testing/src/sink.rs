use parking_lot::Mutex;
use std::sync::Arc;
use wardencore::ac::event::{DecisionEvent, DecisionSink};

/// Keeps every recorded decision event for later inspection.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<DecisionEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DecisionEvent> {
        self.events.lock().clone()
    }

    pub fn take(&self) -> Vec<DecisionEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl DecisionSink for RecordingSink {
    fn record(&self, event: &DecisionEvent) {
        self.events.lock().push(event.clone());
    }
}
