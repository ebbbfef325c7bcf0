use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Half-open range `[start, start + size)` of canonical positions to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchWindow {
    pub start: usize,
    pub size: usize,
}

impl FetchWindow {
    #[must_use]
    pub fn end(&self) -> usize {
        self.start + self.size
    }

    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.end()
    }
}

/// Why a batch could not be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadFailure {
    #[error("content load failed")]
    ContentLoadFailed,
    #[error("connectivity lost")]
    ConnectivityLost,
}

/// How far into the canonical order questions have been requested.
///
/// Requests always cover a contiguous prefix, so the cursor is one number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCursor {
    total: usize,
    threshold: usize,
    requested: usize,
}

impl FetchCursor {
    #[must_use]
    pub fn new(total: usize, threshold: usize) -> Self {
        Self {
            total,
            threshold: threshold.max(1),
            requested: 0,
        }
    }

    #[must_use]
    pub fn requested(&self) -> usize {
        self.requested
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.requested >= self.total
    }

    /// First batch, if nothing has been requested yet.
    pub fn initial(&mut self) -> Option<FetchWindow> {
        if self.requested > 0 {
            return None;
        }
        self.advance_to(self.threshold)
    }

    /// Called when `index` (0-based) becomes current. Requests through `index`
    /// plus one more batch once the learner sits on the last requested
    /// question, or beyond it.
    pub fn on_visit(&mut self, index: usize) -> Option<FetchWindow> {
        if index + 1 < self.requested {
            return None;
        }
        let target = (index + 1).max(self.requested) + self.threshold;
        self.advance_to(target)
    }

    fn advance_to(&mut self, target: usize) -> Option<FetchWindow> {
        let end = target.min(self.total);
        if end <= self.requested {
            return None;
        }
        let window = FetchWindow {
            start: self.requested,
            size: end - self.requested,
        };
        self.requested = end;
        Some(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_window_is_one_threshold() {
        let mut cursor = FetchCursor::new(7, 3);
        assert_eq!(cursor.initial(), Some(FetchWindow { start: 0, size: 3 }));
        assert_eq!(cursor.initial(), None);
    }

    #[test]
    fn visiting_last_loaded_requests_next_batch() {
        let mut cursor = FetchCursor::new(7, 3);
        cursor.initial();
        assert_eq!(cursor.on_visit(0), None);
        assert_eq!(cursor.on_visit(1), None);
        assert_eq!(cursor.on_visit(2), Some(FetchWindow { start: 3, size: 3 }));
        assert_eq!(cursor.on_visit(5), Some(FetchWindow { start: 6, size: 1 }));
        assert!(cursor.is_exhausted());
        assert_eq!(cursor.on_visit(6), None);
    }

    #[test]
    fn jumping_far_ahead_covers_the_gap() {
        let mut cursor = FetchCursor::new(20, 3);
        cursor.initial();
        let window = cursor.on_visit(10).unwrap();
        assert_eq!(window, FetchWindow { start: 3, size: 11 });
        assert!(window.contains(10));
    }
}
