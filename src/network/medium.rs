//! In-process broadcast medium
//!
//! Every registered participant owns one FIFO [`Inbox`]. A send encodes the
//! envelope once and appends the frame to every inbox except the sender's.
//! The medium never looks at `destination`; receivers filter.

use super::codec::{self, Frame};
use super::messages::{Envelope, ParticipantId};
use crate::error::DhError;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Inbound queue of one participant
#[derive(Debug, Default)]
pub struct Inbox {
    frames: Mutex<VecDeque<Frame>>,
}

impl Inbox {
    pub(crate) fn push(&self, frame: Frame) {
        lock(&self.frames).push_back(frame);
    }

    /// Removes the oldest frame
    pub fn pop(&self) -> Option<Frame> {
        lock(&self.frames).pop_front()
    }

    pub fn len(&self) -> usize {
        lock(&self.frames).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.frames).is_empty()
    }
}

/// Broadcast bus shared by all participants of one simulation
#[derive(Debug, Default)]
pub struct Medium {
    /// Registration order; fan-out walks this list under the lock
    recipients: Mutex<Vec<(ParticipantId, Arc<Inbox>)>>,

    /// Total number of `send` calls
    sends: AtomicU64,
}

impl Medium {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `id` to the broadcast group and returns its inbox.
    ///
    /// Registering the same id again returns the existing inbox.
    pub fn register(&self, id: &ParticipantId) -> Arc<Inbox> {
        let mut recipients = lock(&self.recipients);
        if let Some((_, inbox)) = recipients.iter().find(|(known, _)| known == id) {
            return Arc::clone(inbox);
        }

        let inbox = Arc::new(Inbox::default());
        recipients.push((id.clone(), Arc::clone(&inbox)));
        debug!(participant = %id, group_size = recipients.len(), "registered with medium");
        inbox
    }

    /// Delivers `envelope` to every registered inbox except `sender`'s.
    ///
    /// The recipient list stays locked for the whole fan-out, so two sends
    /// reach every recipient in the same relative order.
    ///
    /// Returns the number of inboxes the frame was appended to.
    pub fn send(&self, sender: &ParticipantId, envelope: &Envelope) -> Result<usize, DhError> {
        let frame = codec::encode(envelope)?;
        let recipients = lock(&self.recipients);

        let mut delivered = 0;
        for (id, inbox) in recipients.iter() {
            if id != sender {
                inbox.push(frame.clone());
                delivered += 1;
            }
        }
        self.sends.fetch_add(1, Ordering::Relaxed);

        debug!(
            source = %sender,
            kind = envelope.message().kind(),
            seq = envelope.sequence_hint(),
            delivered,
            "sent"
        );
        Ok(delivered)
    }

    /// Number of registered participants
    pub fn recipient_count(&self) -> usize {
        lock(&self.recipients).len()
    }

    /// Total number of `send` calls so far
    pub fn sends(&self) -> u64 {
        self.sends.load(Ordering::Relaxed)
    }

    /// True when every registered inbox is empty
    pub fn is_drained(&self) -> bool {
        lock(&self.recipients)
            .iter()
            .all(|(_, inbox)| inbox.is_empty())
    }
}

/// Locks `mutex`, recovering the guard if a previous holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::messages::Message;

    fn id(s: &str) -> ParticipantId {
        ParticipantId::from(s)
    }

    #[test]
    fn test_register_is_idempotent() {
        let medium = Medium::new();
        let first = medium.register(&id("a"));
        let second = medium.register(&id("a"));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(medium.recipient_count(), 1);
    }

    #[test]
    fn test_send_skips_sender() {
        let medium = Medium::new();
        let a = medium.register(&id("a"));
        let b = medium.register(&id("b"));
        let c = medium.register(&id("c"));

        let delivered = medium
            .send(&id("a"), &Envelope::broadcast(id("a"), 0, Message::Ping))
            .unwrap();

        assert_eq!(delivered, 2);
        assert!(a.is_empty());
        assert_eq!(b.len(), 1);
        assert_eq!(c.len(), 1);
        assert_eq!(medium.sends(), 1);
    }

    #[test]
    fn test_addressed_envelopes_are_still_broadcast() {
        let medium = Medium::new();
        medium.register(&id("a"));
        let b = medium.register(&id("b"));
        let c = medium.register(&id("c"));

        let envelope = Envelope::addressed(id("a"), id("b"), 0, Message::Pong);
        medium.send(&id("a"), &envelope).unwrap();

        assert_eq!(b.len(), 1);
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn test_inbox_is_fifo() {
        let medium = Medium::new();
        medium.register(&id("a"));
        let b = medium.register(&id("b"));

        for seq in 0..5 {
            medium
                .send(&id("a"), &Envelope::broadcast(id("a"), seq, Message::Announce))
                .unwrap();
        }

        let seqs: Vec<u64> = std::iter::from_fn(|| b.pop())
            .map(|frame| codec::decode(&frame).unwrap().sequence_hint())
            .collect();
        assert_eq!(seqs, vec![0, 1, 2, 3, 4]);
        assert!(medium.is_drained());
    }
}
