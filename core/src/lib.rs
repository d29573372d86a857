//! Round state machine and fair-payout engine for a Mines game.
//!
//! A [`MinesGame`] takes a stake from a [`Wallet`], deals a [`BombLayout`] from a
//! [`FairnessSource`], and pays out `stake * multiplier` when the player cashes out or
//! clears every safe cell. Presentation code follows along through [`RoundEvent`]s.

#![no_std]

extern crate alloc;

pub use cell::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use fairness::*;
pub use layout::*;
pub use multiplier::*;
pub use round::*;
pub use types::*;
pub use wallet::*;

mod cell;
mod config;
mod error;
mod event;
mod fairness;
mod layout;
mod multiplier;
mod round;
mod types;
mod wallet;
