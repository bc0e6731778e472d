use std::collections::VecDeque;

pub const DEFAULT_WINDOW_CAPACITY: usize = 5;

/// Fixed-capacity moving average over the most recent samples
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    values: VecDeque<f64>,
    capacity: usize,
}

impl SlidingWindow {
    /// Create a window holding at most `capacity` samples (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest once the window is full
    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    /// Arithmetic mean of the current contents.
    ///
    /// Callers push before reading; an empty window reports 0.0.
    pub fn mean(&self) -> f64 {
        match self.values.len() {
            0 => 0.0,
            1 => self.values[0],
            n => self.values.iter().sum::<f64>() / n as f64,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

impl Default for SlidingWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_value_mean() {
        let mut window = SlidingWindow::default();
        window.push(42.5);
        assert_eq!(window.mean(), 42.5);
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn test_mean_tracks_only_recent_values() {
        let mut window = SlidingWindow::new(3);
        for value in [100.0, 200.0, 1.0, 2.0, 3.0] {
            window.push(value);
        }

        assert_eq!(window.len(), 3);
        assert!((window.mean() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut window = SlidingWindow::new(0);
        window.push(1.0);
        window.push(9.0);

        assert_eq!(window.capacity(), 1);
        assert_eq!(window.mean(), 9.0);
    }

    #[test]
    fn test_clear() {
        let mut window = SlidingWindow::default();
        window.push(10.0);
        window.push(20.0);
        window.clear();

        assert!(window.is_empty());
        assert_eq!(window.capacity(), DEFAULT_WINDOW_CAPACITY);
    }
}
