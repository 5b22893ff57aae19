//! Keeps the price and volume panes scrolled together.

use crate::chart::viewport::LogicalRange;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pane {
    Price,
    Volume,
}

impl Pane {
    pub fn other(self) -> Self {
        match self {
            Self::Price => Self::Volume,
            Self::Volume => Self::Price,
        }
    }
}

/// Apply `range` to `target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mirror {
    pub target: Pane,
    pub range: LogicalRange,
}

/// Unacknowledged writes kept per pane. Older ones are dropped first.
const MAX_PENDING_ECHOES: usize = 16;

/// Mirrors range changes between the two panes without feedback loops.
///
/// A change already shown by the other pane is not mirrored. Every mirrored
/// write is queued against its target pane until that pane reports it back;
/// a report matching a queued write is swallowed, anything else is a user
/// change and discards the pane's queue.
#[derive(Debug, Default)]
pub struct RangeSync {
    price: Option<LogicalRange>,
    volume: Option<LogicalRange>,
    price_echoes: VecDeque<LogicalRange>,
    volume_echoes: VecDeque<LogicalRange>,
}

impl RangeSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn range(&self, pane: Pane) -> Option<LogicalRange> {
        match pane {
            Pane::Price => self.price,
            Pane::Volume => self.volume,
        }
    }

    /// Mirrored writes to `pane` that it has not reported back yet.
    pub fn pending_echoes(&self, pane: Pane) -> usize {
        match pane {
            Pane::Price => self.price_echoes.len(),
            Pane::Volume => self.volume_echoes.len(),
        }
    }

    fn slot(&mut self, pane: Pane) -> &mut Option<LogicalRange> {
        match pane {
            Pane::Price => &mut self.price,
            Pane::Volume => &mut self.volume,
        }
    }

    fn echoes(&mut self, pane: Pane) -> &mut VecDeque<LogicalRange> {
        match pane {
            Pane::Price => &mut self.price_echoes,
            Pane::Volume => &mut self.volume_echoes,
        }
    }

    /// True if `range` acknowledges a queued write to `pane`. Writes queued
    /// before it were coalesced by the pane and are dropped with it.
    fn take_echo(&mut self, pane: Pane, range: LogicalRange) -> bool {
        let echoes = self.echoes(pane);
        match echoes.iter().position(|r| *r == range) {
            Some(at) => {
                echoes.drain(..=at);
                true
            }
            None => {
                echoes.clear();
                false
            }
        }
    }

    pub fn on_range_changed(&mut self, source: Pane, range: LogicalRange) -> Option<Mirror> {
        if self.take_echo(source, range) {
            return None;
        }

        *self.slot(source) = Some(range);
        let target = source.other();
        if self.range(target) == Some(range) {
            return None;
        }

        *self.slot(target) = Some(range);
        let echoes = self.echoes(target);
        if echoes.len() == MAX_PENDING_ECHOES {
            echoes.pop_front();
        }
        echoes.push_back(range);
        Some(Mirror { target, range })
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
