//! Events and the append-only process history.
//!
//! Every state change a process goes through is recorded as an [`Event`] in
//! its [`History`]. The history is the sole input to decision replay: a
//! backend may hand the same history to decision logic any number of times
//! (after a crash, after redelivery) and relies on the log never being
//! reordered, mutated, or truncated. The only way to change a history is
//! [`History::append`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::decision::Decision;

/// Which clock bound an activity task exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeoutKind {
    /// The task waited in the queue longer than its scheduled timeout.
    ScheduleToStart,
    /// The task ran longer than its execution timeout.
    StartToClose,
    /// The task went silent for longer than its heartbeat timeout.
    Heartbeat,
}

/// What happened to a process, as recorded in its history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum EventKind {
    /// The process was created with this workflow type and input.
    ///
    /// Always the first event of a history; replay derives the process
    /// identity from it.
    ProcessStarted { workflow_type: String, input: Value },
    /// A decision scheduled an activity with this (resolved) input.
    ActivityScheduled { activity_type: String, input: Value },
    /// A worker picked up the activity task.
    ActivityStarted { activity_type: String },
    /// The activity returned a success value.
    ActivityCompleted { activity_type: String, result: Value },
    /// The activity failed, or its execution propagated an error.
    ActivityFailed { activity_type: String, error: String },
    /// The activity chose to cancel itself.
    ActivityCanceled {
        activity_type: String,
        reason: Option<String>,
    },
    /// The activity exceeded one of its clock bounds.
    ActivityTimedOut {
        activity_type: String,
        timeout: TimeoutKind,
    },
    /// The decisions committed at one decision point, in order.
    DecisionsRecorded { decisions: Vec<Decision> },
    /// A decision completed the process with this result.
    ProcessCompleted { result: Value },
    /// A decision failed the process.
    ProcessFailed { reason: String },
    /// A decision canceled the process.
    ProcessCanceled { reason: Option<String> },
    /// An external signal was delivered to the process.
    SignalReceived { name: String, payload: Value },
}

impl EventKind {
    /// Returns `true` for the three terminal process events.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EventKind::ProcessCompleted { .. }
                | EventKind::ProcessFailed { .. }
                | EventKind::ProcessCanceled { .. }
        )
    }
}

/// Immutable record of something that happened to a process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Position in the history. Starts at 1, strictly increasing.
    pub sequence: u64,
    /// When the backend appended the event.
    pub recorded_at: OffsetDateTime,
    /// What happened.
    pub kind: EventKind,
}

/// Ordered, append-only sequence of events belonging to one process.
///
/// Owned and mutated only by the backend; decision logic receives it
/// read-only. The query helpers below are the surface workflows use to
/// inspect past activity outcomes without pattern-matching raw events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    events: Vec<Event>,
}

impl History {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events recorded so far.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if no event has been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterate over events in append order.
    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    /// The first event, if any.
    pub fn first(&self) -> Option<&Event> {
        self.events.first()
    }

    /// The most recent event, if any.
    pub fn last(&self) -> Option<&Event> {
        self.events.last()
    }

    /// Append an event, assigning the next sequence number and a timestamp.
    ///
    /// Returns the assigned sequence. This is the only mutating operation a
    /// history exposes.
    pub fn append(&mut self, kind: EventKind) -> u64 {
        let sequence = self.events.last().map_or(1, |event| event.sequence + 1);
        self.events.push(Event {
            sequence,
            recorded_at: OffsetDateTime::now_utc(),
            kind,
        });
        sequence
    }

    /// Returns `true` if a terminal process event has been recorded.
    pub fn is_closed(&self) -> bool {
        self.events.iter().any(|event| event.kind.is_terminal())
    }

    /// Activities scheduled so far, as `(activity_type, input)`.
    pub fn scheduled_activities(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.events.iter().filter_map(|event| match &event.kind {
            EventKind::ActivityScheduled {
                activity_type,
                input,
            } => Some((activity_type.as_str(), input)),
            _ => None,
        })
    }

    /// Successful activity outcomes, as `(activity_type, result)`.
    pub fn completed_activities(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.events.iter().filter_map(|event| match &event.kind {
            EventKind::ActivityCompleted {
                activity_type,
                result,
            } => Some((activity_type.as_str(), result)),
            _ => None,
        })
    }

    /// Failed activity outcomes, as `(activity_type, error)`.
    pub fn failed_activities(&self) -> impl Iterator<Item = (&str, &str)> {
        self.events.iter().filter_map(|event| match &event.kind {
            EventKind::ActivityFailed {
                activity_type,
                error,
            } => Some((activity_type.as_str(), error.as_str())),
            _ => None,
        })
    }

    /// Canceled activity outcomes, as `(activity_type, reason)`.
    pub fn canceled_activities(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.events.iter().filter_map(|event| match &event.kind {
            EventKind::ActivityCanceled {
                activity_type,
                reason,
            } => Some((activity_type.as_str(), reason.as_deref())),
            _ => None,
        })
    }

    /// Timed-out activities, as `(activity_type, timeout kind)`.
    pub fn timed_out_activities(&self) -> impl Iterator<Item = (&str, TimeoutKind)> {
        self.events.iter().filter_map(|event| match &event.kind {
            EventKind::ActivityTimedOut {
                activity_type,
                timeout,
            } => Some((activity_type.as_str(), *timeout)),
            _ => None,
        })
    }

    /// Signals delivered so far, as `(name, payload)`.
    pub fn signals(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.events.iter().filter_map(|event| match &event.kind {
            EventKind::SignalReceived { name, payload } => Some((name.as_str(), payload)),
            _ => None,
        })
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn started() -> EventKind {
        EventKind::ProcessStarted {
            workflow_type: "foo".into(),
            input: json!([5, 3]),
        }
    }

    #[test]
    fn append_assigns_increasing_sequences() {
        let mut history = History::new();

        assert_eq!(history.append(started()), 1);
        assert_eq!(
            history.append(EventKind::ActivityStarted {
                activity_type: "multiplication".into(),
            }),
            2
        );

        let sequences: Vec<u64> = history.iter().map(|event| event.sequence).collect();
        assert_eq!(sequences, vec![1, 2]);
    }

    #[test]
    fn sequences_stay_strictly_ordered() {
        let mut history = History::new();
        for _ in 0..10 {
            history.append(started());
        }

        let events: Vec<&Event> = history.iter().collect();
        for pair in events.windows(2) {
            assert!(pair[0].sequence < pair[1].sequence);
        }
    }

    #[test]
    fn completed_activities_filters_results() {
        let mut history = History::new();
        history.append(started());
        history.append(EventKind::ActivityCompleted {
            activity_type: "multiplication".into(),
            result: json!(15),
        });
        history.append(EventKind::ActivityFailed {
            activity_type: "division".into(),
            error: "division by zero".into(),
        });

        let completed: Vec<_> = history.completed_activities().collect();
        assert_eq!(completed, vec![("multiplication", &json!(15))]);

        let failed: Vec<_> = history.failed_activities().collect();
        assert_eq!(failed, vec![("division", "division by zero")]);
    }

    #[test]
    fn canceled_activities_expose_reason() {
        let mut history = History::new();
        history.append(EventKind::ActivityCanceled {
            activity_type: "multiplication".into(),
            reason: Some("first operand must be <= 10".into()),
        });

        let canceled: Vec<_> = history.canceled_activities().collect();
        assert_eq!(
            canceled,
            vec![("multiplication", Some("first operand must be <= 10"))]
        );
    }

    #[test]
    fn is_closed_after_terminal_event() {
        let mut history = History::new();
        history.append(started());
        assert!(!history.is_closed());

        history.append(EventKind::ProcessCompleted { result: json!(15) });
        assert!(history.is_closed());
    }

    #[test]
    fn signals_are_queryable() {
        let mut history = History::new();
        history.append(started());
        history.append(EventKind::SignalReceived {
            name: "approve".into(),
            payload: json!({"by": "ops"}),
        });

        let signals: Vec<_> = history.signals().collect();
        assert_eq!(signals, vec![("approve", &json!({"by": "ops"}))]);
    }
}
