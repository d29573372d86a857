use serde::{Deserialize, Serialize};

use crate::*;

/// Balance holder the game settles against. The game never reads a balance; it debits
/// the stake once when a round starts and credits at most once when a round is won.
pub trait Wallet {
    fn debit(&mut self, amount: Amount) -> core::result::Result<(), WalletError>;

    fn credit(&mut self, amount: Amount);
}

impl<W: Wallet + ?Sized> Wallet for &mut W {
    fn debit(&mut self, amount: Amount) -> core::result::Result<(), WalletError> {
        (**self).debit(amount)
    }

    fn credit(&mut self, amount: Amount) {
        (**self).credit(amount)
    }
}

/// Plain in-process balance.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryWallet {
    balance: Amount,
}

impl MemoryWallet {
    pub const fn new(balance: Amount) -> Self {
        Self { balance }
    }

    pub const fn balance(&self) -> Amount {
        self.balance
    }
}

impl Wallet for MemoryWallet {
    fn debit(&mut self, amount: Amount) -> core::result::Result<(), WalletError> {
        self.balance = self
            .balance
            .checked_sub(amount)
            .ok_or(WalletError::InsufficientFunds { requested: amount })?;
        Ok(())
    }

    fn credit(&mut self, amount: Amount) {
        self.balance = self.balance.saturating_add(amount);
    }
}
