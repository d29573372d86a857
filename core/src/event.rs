use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use serde::{Deserialize, Serialize};

use crate::*;

/// Everything a presentation layer needs to draw a round. Bomb positions only appear
/// once the round is resolved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum RoundEvent {
    LayoutReady {
        grid: Grid,
        bomb_count: CellCount,
        commitment: Option<Commitment>,
    },
    RoundStarted {
        stake: Amount,
        grid: Grid,
        bomb_count: CellCount,
    },
    CellRevealedSafe {
        index: CellIndex,
        multiplier: f64,
        safe_count: CellCount,
    },
    CellFlagged {
        index: CellIndex,
        flagged: bool,
    },
    Bust {
        index: CellIndex,
        layout: Vec<CellIndex>,
    },
    CashedOut {
        payout: Amount,
        layout: Vec<CellIndex>,
    },
    AutoWin {
        payout: Amount,
        layout: Vec<CellIndex>,
    },
}

impl RoundEvent {
    pub const fn ends_round(&self) -> bool {
        matches!(self, Self::Bust { .. } | Self::CashedOut { .. } | Self::AutoWin { .. })
    }
}

pub trait EventSink {
    fn on_event(&mut self, event: &RoundEvent);
}

impl<F: FnMut(&RoundEvent)> EventSink for F {
    fn on_event(&mut self, event: &RoundEvent) {
        self(event)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// Fan-out to every subscribed sink, in subscription order.
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    sinks: Vec<(SubscriberId, Box<dyn EventSink>)>,
}

impl EventBus {
    pub fn subscribe(&mut self, sink: impl EventSink + 'static) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.sinks.push((id, Box::new(sink)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.sinks.len();
        self.sinks.retain(|(sink_id, _)| *sink_id != id);
        self.sinks.len() != before
    }

    pub fn publish(&mut self, event: RoundEvent) {
        log::trace!("event: {event:?}");
        for (_, sink) in &mut self.sinks {
            sink.on_event(&event);
        }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl core::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.sinks.len())
            .finish()
    }
}

/// Shared recording sink; clones see the same log.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<RoundEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RoundEvent> {
        self.events.borrow().clone()
    }

    pub fn take(&self) -> Vec<RoundEvent> {
        core::mem::take(&mut *self.events.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl EventSink for EventLog {
    fn on_event(&mut self, event: &RoundEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publishes_to_all_subscribers_until_unsubscribed() {
        let mut bus = EventBus::default();
        let first = EventLog::new();
        let second = EventLog::new();

        let first_id = bus.subscribe(first.clone());
        bus.subscribe(second.clone());
        bus.publish(RoundEvent::CellFlagged {
            index: 3,
            flagged: true,
        });

        assert!(bus.unsubscribe(first_id));
        assert!(!bus.unsubscribe(first_id));
        bus.publish(RoundEvent::CellFlagged {
            index: 3,
            flagged: false,
        });

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 2);
        assert_eq!(bus.len(), 1);
    }

    #[test]
    fn closures_are_sinks() {
        let mut bus = EventBus::default();
        let seen = Rc::new(RefCell::new(0));
        let counter = seen.clone();

        bus.subscribe(move |event: &RoundEvent| {
            if event.ends_round() {
                *counter.borrow_mut() += 1;
            }
        });
        bus.publish(RoundEvent::CashedOut {
            payout: 20,
            layout: Vec::new(),
        });

        assert_eq!(*seen.borrow(), 1);
    }

    #[test]
    fn events_are_tagged_by_type_in_camel_case() {
        let safe = RoundEvent::CellRevealedSafe {
            index: 6,
            multiplier: 1.25,
            safe_count: 1,
        };
        assert_eq!(
            serde_json::to_string(&safe).unwrap(),
            r#"{"type":"cellRevealedSafe","index":6,"multiplier":1.25,"safeCount":1}"#
        );

        let ready = RoundEvent::LayoutReady {
            grid: Grid::new_unchecked(5, 5),
            bomb_count: 5,
            commitment: None,
        };
        let json = serde_json::to_string(&ready).unwrap();
        assert_eq!(
            json,
            r#"{"type":"layoutReady","grid":{"rows":5,"cols":5},"bombCount":5,"commitment":null}"#
        );
        assert_eq!(serde_json::from_str::<RoundEvent>(&json).unwrap(), ready);

        let won: RoundEvent =
            serde_json::from_str(r#"{"type":"autoWin","payout":80,"layout":[0]}"#).unwrap();
        assert_eq!(
            won,
            RoundEvent::AutoWin {
                payout: 80,
                layout: alloc::vec![0]
            }
        );
    }
}
