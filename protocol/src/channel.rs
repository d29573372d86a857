use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::*;

/// Moves raw frames between the game and its host, like `postMessage` does.
pub trait Transport {
    fn send(&mut self, frame: String) -> Result<()>;

    /// Next frame from the host, [`ProtocolError::Closed`] once there is none.
    fn recv(&mut self) -> Result<String>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, frame: String) -> Result<()> {
        (**self).send(frame)
    }

    fn recv(&mut self) -> Result<String> {
        (**self).recv()
    }
}

/// Scripted transport: records what was sent and plays back queued frames.
#[derive(Clone, Debug, Default)]
pub struct QueueTransport {
    pub sent: Vec<String>,
    pub inbox: VecDeque<String>,
}

impl Transport for QueueTransport {
    fn send(&mut self, frame: String) -> Result<()> {
        self.sent.push(frame);
        Ok(())
    }

    fn recv(&mut self) -> Result<String> {
        self.inbox.pop_front().ok_or(ProtocolError::Closed)
    }
}

/// Request/response layer over a [`Transport`].
#[derive(Debug)]
pub struct Channel<T> {
    transport: T,
    next_id: u64,
}

/// One channel shared by the wallet adapter and the notice forwarder.
pub type SharedChannel<T> = Rc<RefCell<Channel<T>>>;

impl<T: Transport> Channel<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            next_id: 1,
        }
    }

    pub fn shared(transport: T) -> SharedChannel<T> {
        Rc::new(RefCell::new(Self::new(transport)))
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Fire-and-forget frame without an id.
    pub fn notify(&mut self, request: Request) -> Result<()> {
        log::trace!("notify {}", request.name());
        let frame = Envelope::event(None, request).encode()?;
        self.transport.send(frame)
    }

    /// Sends `request` with a fresh id and waits for the reply carrying it. Replies to
    /// other ids are stale and get dropped.
    pub fn call(&mut self, request: Request) -> Result<Reply> {
        let id = self.next_id;
        self.next_id += 1;
        let name = request.name();

        let frame = Envelope::event(Some(id), request).encode()?;
        self.transport.send(frame)?;

        loop {
            let frame = self.transport.recv().map_err(|err| ProtocolError::NoReply {
                request: name,
                id,
                source: Box::new(err),
            })?;
            let reply = match Envelope::<Reply>::decode(&frame, REPLY_KIND) {
                Ok(reply) => reply,
                Err(err) => {
                    log::warn!("Ignoring frame while waiting for {name} #{id}: {err}");
                    continue;
                }
            };
            if reply.id != Some(id) {
                log::warn!("Dropping reply {:?} while waiting for {name} #{id}", reply.id);
                continue;
            }
            return match reply.body {
                Reply::Error { message } => Err(ProtocolError::Rejected(message)),
                body => Ok(body),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply_frame(id: Option<u64>, reply: Reply) -> String {
        Envelope::reply(id, reply).encode().unwrap()
    }

    #[test]
    fn call_skips_stale_replies() {
        let mut transport = QueueTransport::default();
        transport.inbox.push_back(reply_frame(Some(7), Reply::Balance { balance: 1 }));
        transport.inbox.push_back("not json".to_string());
        transport.inbox.push_back(reply_frame(Some(1), Reply::Balance { balance: 42 }));
        let mut channel = Channel::new(transport);

        let reply = channel.call(Request::GetBalance {}).unwrap();

        assert_eq!(reply, Reply::Balance { balance: 42 });
        assert!(channel.transport().inbox.is_empty());
    }

    #[test]
    fn ids_increase_per_call() {
        let mut channel = Channel::new(QueueTransport::default());

        let err = channel.call(Request::GetBalance {}).unwrap_err();
        assert!(err.is_in_doubt());
        assert!(matches!(
            err,
            ProtocolError::NoReply { request: "getBalance", id: 1, ref source }
                if matches!(**source, ProtocolError::Closed)
        ));
        assert!(channel.call(Request::Bet { amount: 3 }).is_err());
        channel.notify(Request::FxGlow { duration_ms: 700 }).unwrap();

        let ids: Vec<Option<u64>> = channel
            .transport()
            .sent
            .iter()
            .map(|frame| Envelope::<Request>::decode(frame, EVENT_KIND).unwrap().id)
            .collect();
        assert_eq!(ids, vec![Some(1), Some(2), None]);
    }

    #[test]
    fn error_replies_are_rejections() {
        let mut transport = QueueTransport::default();
        transport.inbox.push_back(reply_frame(
            Some(1),
            Reply::Error {
                message: "table closed".to_string(),
            },
        ));
        let mut channel = Channel::new(transport);

        let err = channel.call(Request::Bet { amount: 5 }).unwrap_err();
        assert!(!err.is_in_doubt());
        assert!(matches!(err, ProtocolError::Rejected(message) if message == "table closed"));
    }
}
