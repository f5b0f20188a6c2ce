// phimask-core/src/span_store.rs
//! Character-interval storage for a single document.
//!
//! A [`SpanStore`] maps interval starts to interval stops over one document's
//! code-point index space. One store exists per document per role (include,
//! exclude, and one exclude store per category). Besides the ordered map, the
//! store keeps a coverage index of every character position currently covered
//! by some interval so membership tests do not rescan the map.
//!
//! License: MIT OR APACHE 2.0

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::errors::PhimaskError;

/// A half-open `[start, stop)` interval measured in code points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub stop: usize,
}

impl Span {
    /// Builds a span, rejecting empty or inverted intervals.
    pub fn new(start: usize, stop: usize) -> Result<Self, PhimaskError> {
        if start >= stop {
            return Err(PhimaskError::InvalidSpan { start, stop });
        }
        Ok(Self { start, stop })
    }

    pub fn len(&self) -> usize {
        self.stop - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.stop <= self.start
    }
}

/// Ordered interval container with a coverage index.
#[derive(Debug, Default, Clone)]
pub struct SpanStore {
    map: BTreeMap<usize, usize>,
    covered: HashSet<usize>,
}

impl SpanStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `[start, stop)`.
    ///
    /// In strict mode an intersecting interval makes the call fail with
    /// [`PhimaskError::OverlapConflict`] and leaves the store untouched.
    /// Otherwise the interval is inserted unconditionally.
    pub fn insert(&mut self, start: usize, stop: usize, strict: bool) -> Result<(), PhimaskError> {
        let span = Span::new(start, stop)?;
        if strict && self.overlaps(start, stop) {
            return Err(PhimaskError::OverlapConflict { start, stop });
        }
        if let Some(previous_stop) = self.map.insert(span.start, span.stop) {
            if previous_stop > span.stop {
                self.refresh_coverage(span.stop, previous_stop);
            }
        }
        self.mark(span.start, span.stop);
        Ok(())
    }

    /// Inserts `[start, stop)`, fusing it with every stored interval it touches.
    ///
    /// Boundary contact counts as intersection. All intersecting intervals are
    /// removed and replaced by a single interval from the minimum start to the
    /// maximum stop of everything involved. Returns the interval actually stored.
    pub fn insert_merging(&mut self, start: usize, stop: usize) -> Result<Span, PhimaskError> {
        let span = Span::new(start, stop)?;

        // Every candidate has s <= stop; it intersects when s >= start or start <= e,
        // which for s <= e reduces to e >= start.
        let touching: Vec<(usize, usize)> = self
            .map
            .range(..=span.stop)
            .filter(|(_, &e)| e >= span.start)
            .map(|(&s, &e)| (s, e))
            .collect();

        if touching.is_empty() {
            self.insert(span.start, span.stop, false)?;
            return Ok(span);
        }

        let merged_start = touching.iter().map(|&(s, _)| s).fold(span.start, usize::min);
        let merged_stop = touching.iter().map(|&(_, e)| e).fold(span.stop, usize::max);
        for (s, e) in touching {
            self.remove(s, e);
        }
        self.insert(merged_start, merged_stop, false)?;
        Span::new(merged_start, merged_stop)
    }

    /// Deletes the interval keyed at `start` and clears coverage for
    /// `[start, stop]` inclusive. Returns false (and does nothing) when no
    /// interval starts at `start`.
    pub fn remove(&mut self, start: usize, stop: usize) -> bool {
        if self.map.remove(&start).is_none() {
            return false;
        }
        self.refresh_coverage(start, stop.saturating_add(1));
        true
    }

    /// Carves `[start, stop)` out of every stored interval, keeping the
    /// remainders on either side. Returns the number of intervals affected.
    pub fn subtract(&mut self, start: usize, stop: usize) -> usize {
        let affected: Vec<(usize, usize)> = self
            .map
            .range(..stop)
            .filter(|(_, &e)| e > start)
            .map(|(&s, &e)| (s, e))
            .collect();

        for &(s, e) in &affected {
            self.map.remove(&s);
            if s < start {
                self.map.insert(s, start);
            }
            if e > stop {
                self.map.insert(stop, e);
            }
        }
        if !affected.is_empty() {
            self.refresh_coverage(start, stop);
        }
        affected.len()
    }

    /// True if any index in `[start, stop]` inclusive is covered.
    pub fn overlaps(&self, start: usize, stop: usize) -> bool {
        if self.covered.is_empty() {
            return false;
        }
        (start..=stop).any(|i| self.covered.contains(&i))
    }

    /// True if `index` is covered by some stored interval.
    pub fn covers(&self, index: usize) -> bool {
        self.covered.contains(&index)
    }

    /// True if `index` is the start of a stored interval.
    pub fn contains_start(&self, index: usize) -> bool {
        self.map.contains_key(&index)
    }

    /// True if `index` is the stop of a stored interval.
    pub fn contains_stop(&self, index: usize) -> bool {
        self.map.values().any(|&e| e == index)
    }

    /// Looks up the stop of the interval starting at `start`.
    pub fn get(&self, start: usize) -> Result<usize, PhimaskError> {
        self.map
            .get(&start)
            .copied()
            .ok_or(PhimaskError::NotFound { start })
    }

    /// All stored intervals sorted by start.
    pub fn ordered_spans(&self) -> Vec<Span> {
        self.iter().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = Span> + '_ {
        self.map.iter().map(|(&start, &stop)| Span { start, stop })
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Maximal runs of `text` positions that are neither covered nor rejected
    /// by `is_excluded_char`, as half-open spans in ascending order.
    pub fn complement<F>(&self, text: &str, is_excluded_char: F) -> Vec<Span>
    where
        F: Fn(char) -> bool,
    {
        let mut runs = Vec::new();
        let mut run_start: Option<usize> = None;
        let mut length = 0;

        for (i, c) in text.chars().enumerate() {
            length = i + 1;
            let keep = !self.covered.contains(&i) && !is_excluded_char(c);
            match (keep, run_start) {
                (true, None) => run_start = Some(i),
                (false, Some(s)) => {
                    runs.push(Span { start: s, stop: i });
                    run_start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = run_start {
            runs.push(Span { start: s, stop: length });
        }
        runs
    }

    fn mark(&mut self, start: usize, stop: usize) {
        self.covered.extend(start..stop);
    }

    /// Clears coverage over `[from, to)` and re-marks whatever surviving
    /// intervals still reach into that window.
    fn refresh_coverage(&mut self, from: usize, to: usize) {
        for i in from..to {
            self.covered.remove(&i);
        }
        let survivors: Vec<(usize, usize)> = self
            .map
            .range(..to)
            .filter(|(_, &e)| e > from)
            .map(|(&s, &e)| (s.max(from), e.min(to)))
            .collect();
        for (s, e) in survivors {
            self.mark(s, e);
        }
    }
}
