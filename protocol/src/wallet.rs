use std::cell::Cell;

use minefair_core::{Amount, Wallet, WalletError};

use crate::*;

/// [`Wallet`] kept by the host page: stakes go out as `bet`, payouts as `cashout`.
///
/// A `bet` whose reply is lost may still have been applied by the host. The wallet then
/// compares the host balance with the last one it saw and refunds a stake that was taken.
/// Stakes it cannot account for are reported by [`RemoteWallet::in_doubt`].
#[derive(Debug)]
pub struct RemoteWallet<T> {
    channel: SharedChannel<T>,
    unsettled: Amount,
    in_doubt: Amount,
    last_balance: Cell<Option<Amount>>,
}

impl<T: Transport> RemoteWallet<T> {
    pub fn new(channel: SharedChannel<T>) -> Self {
        Self {
            channel,
            unsettled: 0,
            in_doubt: 0,
            last_balance: Cell::new(None),
        }
    }

    pub fn channel(&self) -> &SharedChannel<T> {
        &self.channel
    }

    /// Asks the host for the current balance.
    pub fn balance(&self) -> Result<Amount> {
        let reply = self.channel.borrow_mut().call(Request::GetBalance {})?;
        match reply {
            Reply::Balance { balance } => {
                self.last_balance.set(Some(balance));
                Ok(balance)
            }
            other => Err(ProtocolError::UnexpectedReply {
                expected: "getBalance",
                found: other.name(),
            }),
        }
    }

    /// Payouts that could not be delivered yet.
    pub fn unsettled(&self) -> Amount {
        self.unsettled
    }

    /// Stakes sent without a reply that the host balance could not explain.
    pub fn in_doubt(&self) -> Amount {
        self.in_doubt
    }

    /// Retries delivering unsettled payouts.
    pub fn settle(&mut self) -> Result<()> {
        if self.unsettled == 0 {
            return Ok(());
        }
        self.channel.borrow_mut().notify(Request::Cashout {
            amount: self.unsettled,
        })?;
        log::info!("Settled {} owed to the player", self.unsettled);
        self.paid_out(self.unsettled);
        self.unsettled = 0;
        Ok(())
    }

    fn paid_out(&self, amount: Amount) {
        if let Some(balance) = self.last_balance.get() {
            self.last_balance.set(Some(balance.saturating_add(amount)));
        }
    }

    /// Works out what happened to a `bet` of `amount` that got no reply.
    fn recover_stake(&mut self, amount: Amount, before: Option<Amount>) {
        let after = match self.balance() {
            Ok(after) => after,
            Err(err) => {
                log::error!("Stake of {amount} in doubt, balance unavailable: {err}");
                self.in_doubt = self.in_doubt.saturating_add(amount);
                return;
            }
        };
        match before {
            Some(before) if before.checked_sub(amount) == Some(after) => {
                log::warn!("Host took a stake of {amount} without replying, refunding it");
                self.credit(amount);
            }
            Some(before) if before == after => {
                log::info!("Unanswered bet of {amount} was not applied");
            }
            _ => {
                log::error!("Stake of {amount} in doubt, host balance {after} (was {before:?})");
                self.in_doubt = self.in_doubt.saturating_add(amount);
            }
        }
    }
}

impl<T: Transport> Wallet for RemoteWallet<T> {
    fn debit(&mut self, amount: Amount) -> std::result::Result<(), WalletError> {
        let before = self.last_balance.get();
        let sent = self.channel.borrow_mut().call(Request::Bet { amount });
        let reply = match sent {
            Ok(reply) => reply,
            Err(err) => {
                if err.is_in_doubt() {
                    self.recover_stake(amount, before);
                }
                return Err(WalletError::Unavailable(err.to_string()));
            }
        };

        match reply {
            Reply::Bet {
                accepted: true,
                balance,
            } => {
                self.last_balance.set(Some(balance));
                Ok(())
            }
            Reply::Bet {
                accepted: false,
                balance,
            } => {
                log::debug!("Host refused bet of {amount}, balance {balance}");
                self.last_balance.set(Some(balance));
                Err(WalletError::InsufficientFunds { requested: amount })
            }
            other => Err(WalletError::Unavailable(format!(
                "host answered bet with {}",
                other.name()
            ))),
        }
    }

    fn credit(&mut self, amount: Amount) {
        let sent = self.channel.borrow_mut().notify(Request::Cashout { amount });
        match sent {
            Ok(()) => self.paid_out(amount),
            Err(err) => {
                log::error!("Payout of {amount} not delivered: {err}");
                self.unsettled = self.unsettled.saturating_add(amount);
            }
        }
    }
}
