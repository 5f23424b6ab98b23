//! Progress channel between the pipeline and whatever renders it.

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::Event;

/// Producer half, handed to the pipeline and cloned into helpers.
///
/// Sending never blocks and never fails from the caller's point of view, so
/// a slow or absent front end cannot stall fingerprinting.
#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    /// Emit an event; dropped silently once the receiver is gone
    pub fn send(&self, event: Event) {
        let _ = self.inner.send(event);
    }
}

/// Consumer half, usually drained on a UI thread.
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Block until the next event, or `None` once every sender is dropped
    pub fn recv(&self) -> Option<Event> {
        self.inner.recv().ok()
    }

    /// Drain events until every sender has been dropped
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }
}

/// Creates connected sender/receiver pairs.
pub struct EventChannel;

impl EventChannel {
    /// Unbounded pair, so progress emission never waits on the reader
    pub fn new() -> (EventSender, EventReceiver) {
        let (sender, receiver) = unbounded();
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }
}

/// A sender for runs nobody watches; its receiver is dropped immediately.
pub fn null_sender() -> EventSender {
    let (sender, _receiver) = EventChannel::new();
    sender
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{FingerprintEvent, FingerprintProgress, PipelineEvent};
    use std::path::PathBuf;
    use std::thread;

    #[test]
    fn progress_crosses_threads_intact() {
        let (sender, receiver) = EventChannel::new();

        thread::spawn(move || {
            sender.send(Event::Fingerprint(FingerprintEvent::Progress(
                FingerprintProgress {
                    completed: 3,
                    total: 25,
                    elapsed_ms: 120,
                    current_path: PathBuf::from("/test/a.png"),
                },
            )));
        })
        .join()
        .unwrap();

        match receiver.recv() {
            Some(Event::Fingerprint(FingerprintEvent::Progress(p))) => {
                assert_eq!(p.completed, 3);
                assert_eq!(p.total, 25);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn sending_without_a_receiver_is_silent() {
        let sender = null_sender();
        sender.send(Event::Pipeline(PipelineEvent::Started));
    }

    #[test]
    fn recv_returns_none_after_senders_drop() {
        let (sender, receiver) = EventChannel::new();
        sender.send(Event::Pipeline(PipelineEvent::Started));
        sender.send(Event::Pipeline(PipelineEvent::Cancelled));
        drop(sender);

        assert_eq!(receiver.iter().count(), 2);
        assert!(receiver.recv().is_none());
    }
}
