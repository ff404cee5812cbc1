// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bounded buffer of home server log lines.
//!
//! The child's output pumps call [`LogBuffer::append`] from their own tasks
//! while `start()` is still awaiting readiness, so the lock here is only held
//! for a single push or copy.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::config::LOGS_BUFFER_SIZE;

/// FIFO of the most recent log lines; the oldest line is evicted on overflow.
#[derive(Debug)]
pub struct LogBuffer {
    lines: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(LOGS_BUFFER_SIZE)
    }
}

impl LogBuffer {
    /// Create a buffer holding at most `capacity` lines (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Add a line at the tail, evicting from the head past capacity.
    pub fn append(&self, line: impl Into<String>) {
        let line = line.into();
        let mut lines = match self.lines.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        lines.push_back(line);
        while lines.len() > self.capacity {
            lines.pop_front();
        }
    }

    /// Point-in-time copy of the buffered lines, oldest first.
    pub fn snapshot(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    pub fn reset(&self) {
        match self.lines.lock() {
            Ok(mut lines) => lines.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }

    pub fn len(&self) -> usize {
        match self.lines.lock() {
            Ok(lines) => lines.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn keeps_the_last_thousand_lines_in_order() {
        let buffer = LogBuffer::default();
        for i in 0..1500 {
            buffer.append(format!("line {i}"));
        }

        let lines = buffer.snapshot();
        assert_eq!(lines.len(), 1000);
        assert_eq!(lines.first().unwrap(), "line 500");
        assert_eq!(lines.last().unwrap(), "line 1499");
        for (offset, line) in lines.iter().enumerate() {
            assert_eq!(line, &format!("line {}", 500 + offset));
        }
    }

    #[test]
    fn snapshot_is_a_copy() {
        let buffer = LogBuffer::new(4);
        buffer.append("one");
        let snapshot = buffer.snapshot();
        buffer.append("two");
        assert_eq!(snapshot, vec!["one".to_string()]);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn reset_clears_everything() {
        let buffer = LogBuffer::new(4);
        buffer.append("one");
        buffer.append("two");
        buffer.reset();
        assert!(buffer.is_empty());
        assert!(buffer.snapshot().is_empty());
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let buffer = LogBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
        buffer.append("a");
        buffer.append("b");
        assert_eq!(buffer.snapshot(), vec!["b".to_string()]);
    }

    #[test]
    fn concurrent_appends_respect_capacity() {
        let buffer = Arc::new(LogBuffer::new(100));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let buffer = Arc::clone(&buffer);
                std::thread::spawn(move || {
                    for i in 0..250 {
                        buffer.append(format!("{t}-{i}"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(buffer.len(), 100);
    }
}
