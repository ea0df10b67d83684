//! Sets of integers stored as sorted, disjoint, inclusive intervals.
//!
//! Used for character classes in lexer automata and token sets in parser automata.

use std::fmt;

/// Inclusive integer interval `start..=stop`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Interval {
    pub start: i32,
    pub stop: i32,
}

impl Interval {
    pub fn new(start: i32, stop: i32) -> Self {
        Self { start, stop }
    }

    pub fn len(&self) -> usize {
        (i64::from(self.stop) - i64::from(self.start) + 1).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.stop < self.start
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct IntervalSet {
    intervals: Vec<Interval>,
}

impl IntervalSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of(value: i32) -> Self {
        Self::of_range(value, value)
    }

    pub fn of_range(start: i32, stop: i32) -> Self {
        let mut set = Self::new();
        set.add_range(start, stop);
        set
    }

    pub fn add(&mut self, value: i32) {
        self.add_range(value, value);
    }

    /// Adds `start..=stop`, merging with overlapping or adjacent intervals.
    pub fn add_range(&mut self, start: i32, stop: i32) {
        if stop < start {
            return;
        }
        let mut merged = Interval::new(start, stop);
        let mut result = Vec::with_capacity(self.intervals.len() + 1);
        let mut inserted = false;
        for interval in self.intervals.drain(..) {
            if i64::from(interval.stop) + 1 < i64::from(merged.start) {
                result.push(interval);
            } else if i64::from(merged.stop) + 1 < i64::from(interval.start) {
                if !inserted {
                    result.push(merged);
                    inserted = true;
                }
                result.push(interval);
            } else {
                merged = Interval::new(
                    merged.start.min(interval.start),
                    merged.stop.max(interval.stop),
                );
            }
        }
        if !inserted {
            result.push(merged);
        }
        self.intervals = result;
    }

    pub fn add_set(&mut self, other: &IntervalSet) {
        for interval in &other.intervals {
            self.add_range(interval.start, interval.stop);
        }
    }

    pub fn contains(&self, value: i32) -> bool {
        self.intervals
            .iter()
            .any(|i| i.start <= value && value <= i.stop)
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Number of values in the set
    pub fn size(&self) -> usize {
        self.intervals.iter().map(Interval::len).sum()
    }

    pub fn min(&self) -> Option<i32> {
        self.intervals.first().map(|i| i.start)
    }

    /// Values of `min..=max` that are not in this set
    pub fn complement(&self, min: i32, max: i32) -> IntervalSet {
        let mut result = IntervalSet::new();
        let mut next = i64::from(min);
        for interval in &self.intervals {
            if i64::from(interval.stop) < next {
                continue;
            }
            if i64::from(interval.start) > i64::from(max) {
                break;
            }
            if i64::from(interval.start) > next {
                result.add_range(next as i32, interval.start - 1);
            }
            next = i64::from(interval.stop) + 1;
        }
        if next <= i64::from(max) {
            result.add_range(next as i32, max);
        }
        result
    }

    /// The `index`-th value in ascending order
    pub fn nth(&self, mut index: usize) -> Option<i32> {
        for interval in &self.intervals {
            let len = interval.len();
            if index < len {
                return Some(interval.start + index as i32);
            }
            index -= len;
        }
        None
    }

    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.intervals.iter().flat_map(|i| i.start..=i.stop)
    }
}

impl fmt::Display for IntervalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, interval) in self.intervals.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if interval.start == interval.stop {
                write!(f, "{}", interval.start)?;
            } else {
                write!(f, "{}..{}", interval.start, interval.stop)?;
            }
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_merges_adjacent_and_overlapping() {
        let mut set = IntervalSet::new();
        set.add_range(10, 20);
        set.add(5);
        set.add_range(21, 25);
        set.add_range(18, 30);
        assert_eq!(set.intervals(), &[Interval::new(5, 5), Interval::new(10, 30)]);
        assert_eq!(set.size(), 22);
        assert!(set.contains(30));
        assert!(!set.contains(6));
    }

    #[test]
    fn test_complement() {
        let set = IntervalSet::of_range(b'a' as i32, b'z' as i32);
        let complement = set.complement(0, 200);
        assert_eq!(
            complement.intervals(),
            &[Interval::new(0, 96), Interval::new(123, 200)]
        );
    }

    #[test]
    fn test_nth_and_display() {
        let mut set = IntervalSet::of_range(1, 3);
        set.add(7);
        assert_eq!(set.nth(3), Some(7));
        assert_eq!(set.nth(4), None);
        assert_eq!(set.to_string(), "{1..3, 7}");
    }

    #[test]
    fn test_eof_is_representable() {
        let mut set = IntervalSet::of(-1);
        set.add_range(3, 4);
        assert_eq!(set.min(), Some(-1));
        assert!(set.contains(-1));
    }
}
