//! Daemon scheduler: a priority queue of future turn-events.
//!
//! `BinaryHeap<Reverse<(turn, idx)>>` plus a parallel `Vec` so indices stay
//! stable across pops; popping a due event leaves its slot vacated via
//! `mem::take` instead of shifting the vector. Events carry either a named
//! daemon to dispatch or a literal action batch, re-arming per their
//! `Recurring`/`Countdown`/`OneShot` kind (spec §4.H).

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use hollowgate_data::ActionDef;
use serde::{Deserialize, Serialize};

/// What fires when a scheduled event comes due: a named daemon handler
/// looked up in a registry (§4.H's "recurring effects" — lantern fuel,
/// candle burn), or a literal action batch queued by a trigger's
/// `scheduleIn`/`scheduleOn` (§4.E/§9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    Daemon(String),
    Actions(Vec<ActionDef>),
}

/// How a daemon re-arms itself after firing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DaemonKind {
    /// Fires every `period` turns, forever (or until explicitly cancelled).
    Recurring { period: u64 },
    /// Fires once per tick while `ticks_left > 0`, decrementing each time;
    /// removed once it reaches zero.
    Countdown { ticks_left: u64 },
    /// Fires exactly once then is removed.
    OneShot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledEvent {
    pub name: String,
    pub due_turn: u64,
    pub kind: Option<DaemonKind>,
    pub note: Option<String>,
    pub payload: Option<EventPayload>,
}

impl Default for ScheduledEvent {
    /// The "empty" placeholder `pop_due` leaves behind (`name.is_empty()`
    /// marks a slot as vacated).
    fn default() -> Self {
        Self {
            name: String::new(),
            due_turn: 0,
            kind: None,
            note: None,
            payload: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Scheduler {
    events: Vec<ScheduledEvent>,
    #[serde(skip)]
    heap: BinaryHeap<Reverse<(u64, usize)>>,
    #[serde(skip)]
    heap_dirty: bool,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn rebuild_heap_if_needed(&mut self) {
        if self.heap_dirty || (self.heap.is_empty() && !self.events.is_empty()) {
            self.heap = self
                .events
                .iter()
                .enumerate()
                .filter(|(_, e)| !e.name.is_empty())
                .map(|(idx, e)| Reverse((e.due_turn, idx)))
                .collect();
            self.heap_dirty = false;
        }
    }

    pub fn schedule_in(
        &mut self,
        now: u64,
        turns_ahead: u64,
        name: String,
        kind: Option<DaemonKind>,
        payload: Option<EventPayload>,
        note: Option<String>,
    ) {
        self.schedule_on(now + turns_ahead, name, kind, payload, note);
    }

    pub fn schedule_on(
        &mut self,
        on_turn: u64,
        name: String,
        kind: Option<DaemonKind>,
        payload: Option<EventPayload>,
        note: Option<String>,
    ) {
        let idx = self.events.len();
        self.events.push(ScheduledEvent {
            name,
            due_turn: on_turn,
            kind,
            note,
            payload,
        });
        self.heap.push(Reverse((on_turn, idx)));
    }

    /// Pop the next event due at or before `now`, leaving a default
    /// placeholder in its slot so every other index stays valid.
    pub fn pop_due(&mut self, now: u64) -> Option<ScheduledEvent> {
        self.rebuild_heap_if_needed();
        loop {
            let Reverse((due, idx)) = self.heap.peek().copied()?;
            if due > now {
                return None;
            }
            self.heap.pop();
            let event = std::mem::take(&mut self.events[idx]);
            if event.name.is_empty() {
                continue;
            }
            return Some(event);
        }
    }

    /// Re-arm a `Recurring`/`Countdown` daemon after it fires, called by the
    /// turn loop once the daemon's handler has run.
    pub fn rearm(&mut self, event: ScheduledEvent, fired_on: u64) {
        match event.kind.clone() {
            Some(DaemonKind::Recurring { period }) => {
                self.schedule_on(fired_on + period, event.name, event.kind, event.payload, event.note);
            },
            Some(DaemonKind::Countdown { ticks_left }) if ticks_left > 1 => {
                self.schedule_on(
                    fired_on + 1,
                    event.name,
                    Some(DaemonKind::Countdown { ticks_left: ticks_left - 1 }),
                    event.payload,
                    event.note,
                );
            },
            _ => {},
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.iter().all(|e| e.name.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduler_new_is_empty() {
        assert!(Scheduler::new().is_empty());
    }

    #[test]
    fn events_fire_in_turn_order() {
        let mut s = Scheduler::new();
        s.schedule_on(5, "late".into(), None, None, None);
        s.schedule_on(2, "early".into(), None, None, None);
        assert_eq!(s.pop_due(10).unwrap().name, "early");
        assert_eq!(s.pop_due(10).unwrap().name, "late");
        assert!(s.pop_due(10).is_none());
    }

    #[test]
    fn pop_due_respects_turn_boundary() {
        let mut s = Scheduler::new();
        s.schedule_on(5, "future".into(), None, None, None);
        assert!(s.pop_due(4).is_none());
        assert_eq!(s.pop_due(5).unwrap().name, "future");
    }

    #[test]
    fn recurring_daemon_rearms() {
        let mut s = Scheduler::new();
        s.schedule_on(3, "heartbeat".into(), Some(DaemonKind::Recurring { period: 3 }), None, None);
        let event = s.pop_due(3).unwrap();
        s.rearm(event, 3);
        assert!(s.pop_due(5).is_none());
        assert_eq!(s.pop_due(6).unwrap().name, "heartbeat");
    }

    #[test]
    fn countdown_daemon_expires() {
        let mut s = Scheduler::new();
        s.schedule_on(1, "fuse".into(), Some(DaemonKind::Countdown { ticks_left: 2 }), None, None);
        let first = s.pop_due(1).unwrap();
        s.rearm(first, 1);
        let second = s.pop_due(2).unwrap();
        s.rearm(second, 2);
        assert!(s.pop_due(10).is_none());
    }

    #[test]
    fn one_shot_does_not_rearm() {
        let mut s = Scheduler::new();
        s.schedule_on(1, "blip".into(), Some(DaemonKind::OneShot), None, None);
        let event = s.pop_due(1).unwrap();
        s.rearm(event, 1);
        assert!(s.pop_due(100).is_none());
    }
}
