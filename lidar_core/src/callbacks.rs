// lidar_core/src/callbacks.rs

//! Frame callbacks: subscribers that receive every new scan synchronously.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

/// `(frame, width, height, channels, format)`; see `ScanBuffer::frame`.
pub type FrameCallback = dyn Fn(&[f32], u32, u32, u32, &str) + Send + Sync;

#[derive(Default)]
struct Registry {
    next_id: u64,
    callbacks: BTreeMap<u64, Arc<FrameCallback>>,
}

/// The set of callbacks registered on a sensor.
#[derive(Default, Clone)]
pub struct FrameCallbacks {
    registry: Arc<Mutex<Registry>>,
}

impl FrameCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback`. It stays registered exactly as long as the
    /// returned connection lives.
    #[must_use = "dropping the connection immediately disconnects the callback"]
    pub fn connect<F>(&self, callback: F) -> FrameConnection
    where
        F: Fn(&[f32], u32, u32, u32, &str) + Send + Sync + 'static,
    {
        let mut registry = self.registry.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.callbacks.insert(id, Arc::new(callback));
        FrameConnection {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    pub fn len(&self) -> usize {
        self.registry.lock().callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Calls every callback in registration order. The registry lock is
    /// released first, so a callback may drop its own connection.
    pub fn emit(&self, frame: &[f32], width: u32, height: u32, channels: u32, format: &str) {
        let callbacks: Vec<Arc<FrameCallback>> =
            self.registry.lock().callbacks.values().cloned().collect();
        for callback in callbacks {
            callback(frame, width, height, channels, format);
        }
    }

    pub fn clear(&self) {
        self.registry.lock().callbacks.clear();
    }
}

impl std::fmt::Debug for FrameCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameCallbacks")
            .field("len", &self.len())
            .finish()
    }
}

/// Keeps a frame callback registered. Dropping it disconnects the callback.
#[derive(Debug)]
pub struct FrameConnection {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl FrameConnection {
    pub fn is_connected(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.lock().callbacks.contains_key(&self.id))
    }

    pub fn disconnect(self) {
        // Drop does the work.
    }
}

impl Drop for FrameConnection {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().callbacks.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn dropping_the_connection_disconnects() {
        let callbacks = FrameCallbacks::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        let connection = callbacks.connect(move |_, _, _, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(connection.is_connected());

        callbacks.emit(&[], 0, 0, 3, "PF_FLOAT32_RGB");
        drop(connection);
        callbacks.emit(&[], 0, 0, 3, "PF_FLOAT32_RGB");

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(callbacks.is_empty());
    }

    #[test]
    fn callbacks_receive_frame_arguments() {
        let callbacks = FrameCallbacks::new();
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let _connection = callbacks.connect(move |frame, w, h, c, format| {
            *sink.lock() = Some((frame.to_vec(), w, h, c, format.to_string()));
        });

        callbacks.emit(&[1.0, 2.0, 3.0], 1, 1, 3, "PF_FLOAT32_RGB");
        let (frame, w, h, c, format) = seen.lock().clone().unwrap();
        assert_eq!(frame, vec![1.0, 2.0, 3.0]);
        assert_eq!((w, h, c), (1, 1, 3));
        assert_eq!(format, "PF_FLOAT32_RGB");
    }

    #[test]
    fn connection_outliving_registry_is_harmless() {
        let callbacks = FrameCallbacks::new();
        let connection = callbacks.connect(|_, _, _, _, _| {});
        drop(callbacks);
        assert!(!connection.is_connected());
        connection.disconnect();
    }
}
