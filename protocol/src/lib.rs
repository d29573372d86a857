//! Message contract between an embedded Mines game and the casino page hosting it.
//!
//! Frames are JSON envelopes `{kind, version, id?, type, ...}`. The game sends
//! `casino:event` frames, the host answers requests that carry an `id` with
//! `casino:reply` frames echoing it.

pub use channel::*;
pub use error::*;
pub use loopback::*;
pub use message::*;
pub use notify::*;
pub use wallet::*;

mod channel;
mod error;
mod loopback;
mod message;
mod notify;
mod wallet;
