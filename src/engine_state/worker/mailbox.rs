//! Inbound message queue of the worker thread.
//!
//! Messages arrive as raw JSON text over an mpsc channel. While a script runs,
//! messages that must wait for the run to finish are parked in a deferred
//! queue; the deferred queue is always drained before the channel again.

use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};

use web_time::Duration;

/// What a wait on the mailbox produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mail {
    /// A message to handle
    Message(String),
    /// The wait timed out
    Idle,
    /// Every sender is gone and nothing is left to read
    Closed,
}

/// Channel end plus deferred messages.
#[derive(Debug, Default)]
pub struct Mailbox {
    rx: Option<Receiver<String>>,
    deferred: VecDeque<String>,
}

impl Mailbox {
    /// A mailbox reading from `rx`.
    pub fn new(rx: Receiver<String>) -> Self {
        Self {
            rx: Some(rx),
            deferred: VecDeque::new(),
        }
    }

    /// A mailbox with no channel. Hosts that call the controller directly use this.
    pub fn detached() -> Self {
        Self::default()
    }

    /// Takes the next message from the channel without blocking. Deferred
    /// messages are not returned here.
    pub fn try_receive(&mut self) -> Option<String> {
        match self.rx.as_ref()?.try_recv() {
            Ok(text) => Some(text),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Parks `text` until the current run finishes.
    pub fn defer(&mut self, text: String) {
        self.deferred.push_back(text);
    }

    pub fn has_deferred(&self) -> bool {
        !self.deferred.is_empty()
    }

    /// Returns the next message, deferred ones first.
    ///
    /// # Arguments
    /// * `timeout` - Longest time to block on the channel; `None` blocks until
    ///   a message arrives or the channel closes
    pub fn wait(&mut self, timeout: Option<Duration>) -> Mail {
        if let Some(text) = self.deferred.pop_front() {
            return Mail::Message(text);
        }
        let Some(rx) = self.rx.as_ref() else {
            return Mail::Closed;
        };
        match timeout {
            Some(timeout) => match rx.recv_timeout(timeout) {
                Ok(text) => Mail::Message(text),
                Err(RecvTimeoutError::Timeout) => Mail::Idle,
                Err(RecvTimeoutError::Disconnected) => Mail::Closed,
            },
            None => match rx.recv() {
                Ok(text) => Mail::Message(text),
                Err(_) => Mail::Closed,
            },
        }
    }

    /// Returns a deferred message, if any, without touching the channel.
    pub fn next_deferred(&mut self) -> Option<String> {
        self.deferred.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;

    #[test]
    fn deferred_messages_come_first() {
        let (tx, rx) = mpsc::channel();
        let mut mailbox = Mailbox::new(rx);
        tx.send("live".to_string()).unwrap();
        mailbox.defer("parked".to_string());
        assert_eq!(mailbox.wait(Some(Duration::ZERO)), Mail::Message("parked".into()));
        assert_eq!(mailbox.wait(Some(Duration::ZERO)), Mail::Message("live".into()));
        assert_eq!(mailbox.wait(Some(Duration::ZERO)), Mail::Idle);
    }

    #[test]
    fn try_receive_skips_deferred() {
        let (tx, rx) = mpsc::channel();
        let mut mailbox = Mailbox::new(rx);
        mailbox.defer("parked".to_string());
        assert_eq!(mailbox.try_receive(), None);
        tx.send("live".to_string()).unwrap();
        assert_eq!(mailbox.try_receive(), Some("live".into()));
        assert!(mailbox.has_deferred());
    }

    #[test]
    fn closed_when_senders_are_gone() {
        let (tx, rx) = mpsc::channel::<String>();
        let mut mailbox = Mailbox::new(rx);
        drop(tx);
        assert_eq!(mailbox.wait(None), Mail::Closed);
        assert_eq!(Mailbox::detached().wait(None), Mail::Closed);
    }
}
