//! Event channel over crossbeam-channel.

use super::Event;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

/// Handed to every stage of a run.
///
/// A send never fails: once the receiver is gone, scan, hash and sort events
/// are discarded and the run goes on unobserved.
#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    pub fn send(&self, event: Event) {
        let _ = self.inner.send(event);
    }
}

/// Consumer end, usually drained on a front-end thread
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Next event, or `None` once every sender is dropped
    pub fn recv(&self) -> Option<Event> {
        self.inner.recv().ok()
    }

    /// Events until every sender is dropped
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }
}

pub struct EventChannel;

impl EventChannel {
    pub fn new() -> (EventSender, EventReceiver) {
        let (sender, receiver) = unbounded();
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }

    /// Channel holding at most `capacity` undelivered events.
    ///
    /// With a capacity of zero every send waits for the consumer, so the run
    /// never gets ahead of whoever is watching it.
    pub fn bounded(capacity: usize) -> (EventSender, EventReceiver) {
        let (sender, receiver) = bounded(capacity);
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }
}

/// Sender for runs nobody watches
pub fn null_sender() -> EventSender {
    let (sender, _receiver) = EventChannel::new();
    sender
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{PipelineEvent, SortEvent, SortProgress};
    use std::path::PathBuf;
    use std::thread;

    fn progress(completed: usize) -> Event {
        Event::Sort(SortEvent::Progress(SortProgress {
            completed,
            total: 3,
            current_path: PathBuf::from(format!("/in/{}.jpg", completed)),
        }))
    }

    #[test]
    fn sort_progress_crosses_threads_in_order() {
        let (sender, receiver) = EventChannel::new();

        thread::spawn(move || {
            for completed in 1..=3 {
                sender.send(progress(completed));
            }
        })
        .join()
        .unwrap();

        let seen: Vec<usize> = receiver
            .iter()
            .filter_map(|event| match event {
                Event::Sort(SortEvent::Progress(p)) => Some(p.completed),
                _ => None,
            })
            .collect();
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn sending_without_a_listener_is_harmless() {
        let sender = null_sender();
        sender.send(Event::Pipeline(PipelineEvent::Started));
        sender.send(progress(1));
    }

    #[test]
    fn zero_capacity_send_waits_for_consumer() {
        let (sender, receiver) = EventChannel::bounded(0);

        let producer = thread::spawn(move || {
            sender.send(progress(1));
            sender.send(Event::Pipeline(PipelineEvent::Cancelled));
        });

        assert!(matches!(
            receiver.recv(),
            Some(Event::Sort(SortEvent::Progress(_)))
        ));
        assert!(matches!(
            receiver.recv(),
            Some(Event::Pipeline(PipelineEvent::Cancelled))
        ));
        producer.join().unwrap();
        assert!(receiver.recv().is_none());
    }
}
