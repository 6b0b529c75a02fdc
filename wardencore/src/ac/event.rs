use serde::{Deserialize, Serialize};
use std::fmt;

/// One recorded outcome of an imperative access check.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct DecisionEvent {
    pub privilege: String,
    pub resource_class: String,
    pub resource_id: Option<i64>,
    pub user_id: Option<i64>,
    pub user_name: Option<String>,
    pub success: bool,
}

/// Receives decision events; persistence is up to the implementation.
pub trait DecisionSink: Send + Sync {
    fn record(&self, event: &DecisionEvent);
}

/// Writes decision events through the `log` facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl DecisionSink for LogSink {
    fn record(&self, event: &DecisionEvent) {
        if event.success {
            log::debug!("passed permission check: {event}");
        } else {
            log::warn!("=== FAILED permission check: {event}");
        }
    }
}

impl fmt::Display for DecisionEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} on {}",
            self.privilege,
            self.resource_class,
        )?;
        match self.resource_id {
            Some(id) => write!(f, " ({id})")?,
            None => f.write_str(" (UNSAVED)")?,
        }
        match (self.user_id, &self.user_name) {
            (Some(id), Some(name)) => write!(f, " by {name} ({id})"),
            (Some(id), None) => write!(f, " by user {id}"),
            _ => f.write_str(" by nobody"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::DecisionEvent;

    #[test]
    fn display() {
        let mut event = DecisionEvent {
            privilege: "post".to_string(),
            resource_class: "Blog".to_string(),
            resource_id: Some(3),
            user_id: Some(1),
            user_name: Some("fred".to_string()),
            success: false,
        };
        assert_eq!(event.to_string(), "post on Blog (3) by fred (1)");
        event.resource_id = None;
        event.user_id = None;
        assert_eq!(event.to_string(), "post on Blog (UNSAVED) by nobody");
    }
}
