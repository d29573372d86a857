use minefair_core::Amount;
use serde::{Deserialize, Serialize};

use crate::*;

pub const EVENT_KIND: &str = "casino:event";
pub const REPLY_KIND: &str = "casino:reply";
pub const PROTOCOL_VERSION: &str = "1.0.0";

/// Free-form details attached to `win` and `lose` notices.
pub type Meta = serde_json::Map<String, serde_json::Value>;

/// Game to host. `getBalance` and `bet` expect a reply, the rest are notices.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Request {
    /// Credit `amount` to the player.
    Cashout { amount: Amount },
    GetBalance {},
    #[serde(rename = "fx:glow")]
    FxGlow { duration_ms: u64 },
    Win(Meta),
    Lose(Meta),
    /// Debit `amount`; the host answers with [`Reply::Bet`].
    Bet { amount: Amount },
}

impl Request {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Cashout { .. } => "cashout",
            Self::GetBalance {} => "getBalance",
            Self::FxGlow { .. } => "fx:glow",
            Self::Win(_) => "win",
            Self::Lose(_) => "lose",
            Self::Bet { .. } => "bet",
        }
    }

    pub const fn expects_reply(&self) -> bool {
        matches!(self, Self::GetBalance {} | Self::Bet { .. })
    }
}

/// Host to game, fields sit next to `type` in the envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Reply {
    Balance { balance: Amount },
    Bet { accepted: bool, balance: Amount },
    Error { message: String },
}

impl Reply {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Balance { .. } => "balance",
            Self::Bet { .. } => "bet",
            Self::Error { .. } => "error",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope<B> {
    pub kind: String,
    pub version: String,
    /// Correlates a reply with its request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(flatten)]
    pub body: B,
}

impl Envelope<Request> {
    pub fn event(id: Option<u64>, request: Request) -> Self {
        Self::new(EVENT_KIND, id, request)
    }
}

impl Envelope<Reply> {
    pub fn reply(id: Option<u64>, reply: Reply) -> Self {
        Self::new(REPLY_KIND, id, reply)
    }
}

impl<B> Envelope<B> {
    fn new(kind: &str, id: Option<u64>, body: B) -> Self {
        Self {
            kind: kind.to_string(),
            version: PROTOCOL_VERSION.to_string(),
            id,
            body,
        }
    }
}

impl<B: Serialize> Envelope<B> {
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl<B: for<'de> Deserialize<'de>> Envelope<B> {
    /// Parses a frame, accepting any `1.x` version of the expected kind.
    pub fn decode(frame: &str, expected: &'static str) -> Result<Self> {
        let envelope: Self = serde_json::from_str(frame)?;
        if envelope.kind != expected {
            return Err(ProtocolError::UnexpectedKind {
                expected,
                found: envelope.kind,
            });
        }
        if !is_compatible(&envelope.version) {
            return Err(ProtocolError::UnsupportedVersion(envelope.version));
        }
        Ok(envelope)
    }
}

fn is_compatible(version: &str) -> bool {
    let ours = PROTOCOL_VERSION.split('.').next();
    version.split('.').next() == ours
}
