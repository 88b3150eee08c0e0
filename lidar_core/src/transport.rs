// lidar_core/src/transport.rs

//! The publish channel a sensor sends its `LaserScan` messages to.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::error::TransportError;
use crate::messages::LaserScan;

/// The primitive a sensor needs from its transport.
pub trait ScanPublisher: Send + Sync {
    fn send(&mut self, message: &LaserScan) -> Result<(), TransportError>;
}

// =========================================================================
// == Topic Ring Buffer ==
// =========================================================================

/// A message stored within a Topic, wrapping the data with a unique ID for cursor tracking.
#[derive(Clone, Debug)]
pub struct StampedMessage<T> {
    pub id: u64,
    pub message: T,
}

/// A bounded, in-process topic. When full, the oldest message is dropped.
#[derive(Debug)]
pub struct Topic<T> {
    name: String,
    buffer: VecDeque<StampedMessage<T>>,
    next_id: u64,
    capacity: usize,
    closed: bool,
}

impl<T: Clone> Topic<T> {
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            name: name.into(),
            buffer: VecDeque::with_capacity(capacity),
            next_id: 0,
            capacity,
            closed: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Total number of messages ever accepted.
    pub fn published(&self) -> u64 {
        self.next_id
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Stops accepting messages. Buffered messages stay readable.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn publish(&mut self, message: T) -> Result<u64, TransportError> {
        if self.closed {
            return Err(TransportError::Closed(self.name.clone()));
        }
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        let id = self.next_id;
        self.buffer.push_back(StampedMessage { id, message });
        self.next_id += 1;
        Ok(id)
    }

    pub fn latest(&self) -> Option<&T> {
        self.buffer.back().map(|stamped| &stamped.message)
    }
}

/// A cursor over a topic that yields each message at most once.
#[derive(Debug, Default, Clone)]
pub struct TopicReader {
    last_id_read: Option<u64>,
}

impl TopicReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages published since the previous call. Messages that were
    /// evicted before being read are skipped.
    pub fn read<'a, T: Clone>(
        &mut self,
        topic: &'a Topic<T>,
    ) -> impl Iterator<Item = &'a StampedMessage<T>> {
        let start_index = match self.last_id_read {
            None => 0,
            Some(last_id) => topic
                .buffer
                .iter()
                .position(|msg| msg.id > last_id)
                .unwrap_or(topic.buffer.len()),
        };

        if let Some(newest_message) = topic.buffer.back() {
            self.last_id_read = Some(newest_message.id);
        }
        topic.buffer.range(start_index..)
    }
}

// =========================================================================
// == Shared Topic Publisher ==
// =========================================================================

/// A topic shared between the publishing sensor and its readers.
pub type SharedTopic<T> = Arc<Mutex<Topic<T>>>;

/// Publishes laser scans into a `SharedTopic`.
#[derive(Debug, Clone)]
pub struct TopicPublisher {
    topic: SharedTopic<LaserScan>,
}

impl TopicPublisher {
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            topic: Arc::new(Mutex::new(Topic::new(name, capacity))),
        }
    }

    /// A handle to the underlying topic, for readers.
    pub fn topic(&self) -> SharedTopic<LaserScan> {
        Arc::clone(&self.topic)
    }
}

impl ScanPublisher for TopicPublisher {
    fn send(&mut self, message: &LaserScan) -> Result<(), TransportError> {
        self.topic.lock().publish(message.clone()).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_topic_drops_oldest() {
        let mut topic = Topic::new("/t", 2);
        for i in 0..3 {
            topic.publish(i).unwrap();
        }
        assert_eq!(topic.len(), 2);
        assert_eq!(topic.published(), 3);
        assert_eq!(topic.latest(), Some(&2));
    }

    #[test]
    fn reader_sees_each_message_once() {
        let mut topic = Topic::new("/t", 8);
        let mut reader = TopicReader::new();
        topic.publish("a").unwrap();
        topic.publish("b").unwrap();

        let first: Vec<_> = reader.read(&topic).map(|m| m.message).collect();
        assert_eq!(first, vec!["a", "b"]);
        assert_eq!(reader.read(&topic).count(), 0);

        topic.publish("c").unwrap();
        let second: Vec<_> = reader.read(&topic).map(|m| m.message).collect();
        assert_eq!(second, vec!["c"]);
    }

    #[test]
    fn reader_skips_evicted_messages() {
        let mut topic = Topic::new("/t", 2);
        let mut reader = TopicReader::new();
        topic.publish(1).unwrap();
        assert_eq!(reader.read(&topic).count(), 1);
        for i in 2..6 {
            topic.publish(i).unwrap();
        }
        let ids: Vec<_> = reader.read(&topic).map(|m| m.message).collect();
        assert_eq!(ids, vec![4, 5]);
    }

    #[test]
    fn closed_topic_rejects_messages() {
        let mut topic = Topic::new("/lidar", 4);
        topic.publish(1).unwrap();
        assert!(!topic.is_closed());
        topic.close();
        assert!(topic.is_closed());
        assert_eq!(
            topic.publish(2),
            Err(TransportError::Closed("/lidar".to_string()))
        );
        assert_eq!(topic.len(), 1);
    }
}
