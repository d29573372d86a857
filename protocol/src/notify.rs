use minefair_core::{EventSink, RoundEvent};

use crate::*;

/// Length of the glow the host plays on a payout.
pub const GLOW_MS: u64 = 700;

/// Notices the host should hear about for `event`.
pub fn notices_for(event: &RoundEvent) -> Vec<Request> {
    match event {
        RoundEvent::CashedOut { payout, .. } | RoundEvent::AutoWin { payout, .. } => {
            let mut meta = Meta::new();
            meta.insert("payout".to_string(), (*payout).into());
            meta.insert("auto".to_string(), matches!(event, RoundEvent::AutoWin { .. }).into());
            vec![
                Request::Win(meta),
                Request::FxGlow {
                    duration_ms: GLOW_MS,
                },
            ]
        }
        RoundEvent::Bust { index, .. } => {
            let mut meta = Meta::new();
            meta.insert("index".to_string(), (*index).into());
            vec![Request::Lose(meta)]
        }
        _ => Vec::new(),
    }
}

/// Event sink forwarding round results to the host as `win`, `lose` and `fx:glow`.
#[derive(Debug)]
pub struct HostNotifier<T> {
    channel: SharedChannel<T>,
}

impl<T: Transport> HostNotifier<T> {
    pub fn new(channel: SharedChannel<T>) -> Self {
        Self { channel }
    }
}

impl<T: Transport> EventSink for HostNotifier<T> {
    fn on_event(&mut self, event: &RoundEvent) {
        for notice in notices_for(event) {
            let name = notice.name();
            if let Err(err) = self.channel.borrow_mut().notify(notice) {
                log::warn!("Could not send {name} notice: {err}");
            }
        }
    }
}
