use parking_lot::{Condvar, Mutex};

use super::element::GraphElement;

struct QueueState {
    data: Vec<u64>,
    complete: bool,
}

// Append-only log of packed elements for the current epoch. One producer
// appends, any number of readers read by index.
pub struct ElementQueue {
    state: Mutex<QueueState>,
    available: Condvar,
    capacity: usize,
}

impl ElementQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                data: Vec::with_capacity(capacity),
                complete: false,
            }),
            available: Condvar::new(),
            capacity,
        }
    }

    // Blocks while `index` is past the end of an unfinished epoch. `None`
    // means the epoch ended before reaching `index`.
    pub fn get(&self, index: usize) -> Option<GraphElement> {
        let mut state = self.state.lock();
        loop {
            if let Some(&data) = state.data.get(index) {
                return Some(GraphElement::unpack(data));
            }
            if state.complete {
                return None;
            }
            self.available.wait(&mut state);
        }
    }

    // Copies out `data[start..end]` without blocking, clamped to what has
    // been appended so far.
    pub fn read_available(&self, start: usize, end: usize, out: &mut Vec<GraphElement>) {
        let state = self.state.lock();
        let end = end.min(state.data.len());
        if start < end {
            out.extend(state.data[start..end].iter().copied().map(GraphElement::unpack));
        }
    }

    #[cfg(test)]
    pub fn max_len(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.state.lock().data.len()
    }

    #[cfg(test)]
    pub fn is_complete(&self) -> bool {
        self.state.lock().complete
    }

    // Length and completion read under one lock.
    pub fn snapshot(&self) -> (usize, bool) {
        let state = self.state.lock();
        (state.data.len(), state.complete)
    }

    pub fn add(&self, batch: &[u64]) {
        if batch.is_empty() {
            return;
        }
        let mut state = self.state.lock();
        if state.data.len() + batch.len() > self.capacity {
            panic!(
                "element queue overflow: {} queued + {} new exceeds capacity {}",
                state.data.len(),
                batch.len(),
                self.capacity
            );
        }
        state.data.extend_from_slice(batch);
        self.available.notify_all();
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.data.clear();
        state.complete = false;
        self.available.notify_all();
    }

    pub fn end(&self) {
        let mut state = self.state.lock();
        state.complete = true;
        self.available.notify_all();
    }
}
