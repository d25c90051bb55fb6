//! Append-only, insertion-ordered shot log for one game.

use serde::{Deserialize, Serialize};

use crate::shot::ShotEvent;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventLog {
    events: Vec<ShotEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The only mutator. Events are never reordered or deduplicated.
    pub fn append(&mut self, event: ShotEvent) {
        self.events.push(event);
    }

    pub fn size(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// All events in recording order.
    pub fn all(&self) -> &[ShotEvent] {
        &self.events
    }

    pub fn last(&self) -> Option<&ShotEvent> {
        self.events.last()
    }

    pub fn events_in_period(&self, period: u32) -> impl Iterator<Item = &ShotEvent> {
        self.events.iter().filter(move |e| e.period == period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shot::ShotOutcome;
    use crate::shot::fixtures::shot;

    #[test]
    fn test_append_keeps_recording_order() {
        let mut log = EventLog::new();
        let a = shot(ShotOutcome::Save, 1);
        let b = shot(ShotOutcome::Goal, 1);
        log.append(a.clone());
        log.append(b.clone());
        log.append(a.clone());
        assert_eq!(log.size(), 3);
        assert_eq!(log.all()[0], a);
        assert_eq!(log.all()[1], b);
        assert_eq!(log.all()[2].id, a.id, "duplicates are kept");
    }

    #[test]
    fn test_events_in_period() {
        let mut log = EventLog::new();
        log.append(shot(ShotOutcome::Save, 1));
        log.append(shot(ShotOutcome::Save, 3));
        log.append(shot(ShotOutcome::Goal, 1));
        assert_eq!(log.events_in_period(1).count(), 2);
        assert_eq!(log.events_in_period(2).count(), 0);
        assert_eq!(log.events_in_period(3).count(), 1);
    }
}
