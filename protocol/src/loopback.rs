use std::collections::VecDeque;

use minefair_core::Amount;

use crate::*;

/// In-process stand-in for the casino page: keeps the balance, answers requests and
/// records every notice.
#[derive(Clone, Debug, Default)]
pub struct LoopbackHost {
    balance: Amount,
    outbox: VecDeque<String>,
    received: Vec<Request>,
}

impl LoopbackHost {
    pub fn new(balance: Amount) -> Self {
        Self {
            balance,
            ..Default::default()
        }
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    /// Every request handled so far, in arrival order.
    pub fn received(&self) -> &[Request] {
        &self.received
    }

    pub fn take_received(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.received)
    }

    /// Applies one event frame and returns the reply, if the request calls for one.
    pub fn handle(&mut self, frame: &str) -> Result<Option<Envelope<Reply>>> {
        let Envelope { id, body, .. } = Envelope::<Request>::decode(frame, EVENT_KIND)?;

        let reply = match &body {
            Request::GetBalance {} => Some(Reply::Balance {
                balance: self.balance,
            }),
            Request::Bet { amount } => {
                let accepted = *amount <= self.balance;
                if accepted {
                    self.balance -= amount;
                }
                Some(Reply::Bet {
                    accepted,
                    balance: self.balance,
                })
            }
            Request::Cashout { amount } => {
                self.balance = self.balance.saturating_add(*amount);
                None
            }
            Request::FxGlow { .. } | Request::Win(_) | Request::Lose(_) => None,
        };
        self.received.push(body);

        Ok(reply.map(|reply| Envelope::reply(id, reply)))
    }
}

impl Transport for LoopbackHost {
    fn send(&mut self, frame: String) -> Result<()> {
        match self.handle(&frame) {
            Ok(Some(reply)) => self.outbox.push_back(reply.encode()?),
            Ok(None) => {}
            // a page ignores messages it does not understand
            Err(err) => log::warn!("Host ignored frame: {err}"),
        }
        Ok(())
    }

    fn recv(&mut self) -> Result<String> {
        self.outbox.pop_front().ok_or(ProtocolError::Closed)
    }
}
