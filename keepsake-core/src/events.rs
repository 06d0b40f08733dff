//! Save lifecycle notifications.
//!
//! Observers are called synchronously, in subscription order, once the
//! operation they describe has completed.

use std::fmt;

/// Something that happened to a save generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveEvent {
    /// A commit is about to write `key`.
    Saving {
        /// Generation key being written.
        key: String,
    },
    /// A commit finished.
    Saved {
        /// Generation key written.
        key: String,
        /// Generation number written.
        generation: u32,
        /// Records flushed from the pending batch.
        flushed: usize,
    },
    /// A commit failed; pending saves were kept.
    FlushFailed {
        /// Generation key that could not be written.
        key: String,
        /// Error text.
        reason: String,
    },
    /// A generation was read back.
    Loaded {
        /// Generation key read.
        key: String,
        /// Generation number read.
        generation: u32,
        /// Number of records it holds.
        records: usize,
    },
}

type Observer = Box<dyn Fn(&SaveEvent) + Send + Sync>;

/// An ordered list of save observers.
#[derive(Default)]
pub struct SaveObservers {
    observers: Vec<Observer>,
}

impl fmt::Debug for SaveObservers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveObservers")
            .field("count", &self.observers.len())
            .finish()
    }
}

impl SaveObservers {
    /// No observers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer.
    pub fn subscribe<F>(&mut self, observer: F)
    where
        F: Fn(&SaveEvent) + Send + Sync + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    /// Deliver `event` to every observer.
    pub fn notify(&self, event: &SaveEvent) {
        for observer in &self.observers {
            observer(event);
        }
    }

    /// Number of observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Whether no one is listening.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}
