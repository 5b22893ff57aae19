//! Two-point line drawing over the price pane.
//!
//! While drawing is on, the first click places a start point, the second
//! completes the line. Between the two a hover preview follows the pointer.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_LINE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineId(u64);

impl LineId {
    fn next() -> Self {
        Self(NEXT_LINE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A point in chart space: unix milliseconds and price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorPoint {
    pub time: i64,
    pub price: f64,
}

impl AnchorPoint {
    pub fn new(time: i64, price: f64) -> Self {
        Self { time, price }
    }
}

/// Two points as they should be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: AnchorPoint,
    pub end: AnchorPoint,
}

impl Segment {
    /// Points ready for a time-indexed series. A vertical marker (equal
    /// times) gets its end shifted one millisecond forward.
    pub fn render_points(&self) -> [AnchorPoint; 2] {
        let mut end = self.end;
        if end.time == self.start.time {
            end.time += 1;
        }
        [self.start, end]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub id: LineId,
    pub start: AnchorPoint,
    pub end: AnchorPoint,
}

impl Line {
    pub fn segment(&self) -> Segment {
        Segment {
            start: self.start,
            end: self.end,
        }
    }
}

pub type LinesListener = Box<dyn Fn(&[Line]) + Send + Sync>;

#[derive(Default)]
pub struct Annotations {
    drawing: bool,
    lines: Vec<Line>,
    pending: Option<AnchorPoint>,
    preview: Option<Segment>,
    listeners: Vec<LinesListener>,
}

impl Annotations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    /// Flip drawing mode. Turning it off cancels the in-progress line.
    pub fn toggle_drawing(&mut self) -> bool {
        self.drawing = !self.drawing;
        if !self.drawing {
            self.pending = None;
            self.preview = None;
        }
        self.drawing
    }

    /// Place a point. Returns the line it completed, if any.
    pub fn click(&mut self, point: AnchorPoint) -> Option<Line> {
        if !self.drawing {
            return None;
        }
        self.preview = None;
        match self.pending.take() {
            None => {
                self.pending = Some(point);
                None
            }
            Some(start) => {
                let line = Line {
                    id: LineId::next(),
                    start,
                    end: point,
                };
                self.lines.push(line);
                self.notify();
                Some(line)
            }
        }
    }

    /// Move the preview end. Ignored unless exactly one point is placed.
    pub fn hover(&mut self, point: AnchorPoint) {
        if let Some(start) = self.pending.filter(|_| self.drawing) {
            self.preview = Some(Segment { start, end: point });
        }
    }

    pub fn clear_all(&mut self) {
        self.lines.clear();
        self.pending = None;
        self.preview = None;
        self.notify();
    }

    pub fn on_lines_changed(&mut self, listener: impl Fn(&[Line]) + Send + Sync + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn pending(&self) -> Option<AnchorPoint> {
        self.pending
    }

    pub fn preview(&self) -> Option<Segment> {
        self.preview
    }

    fn notify(&self) {
        for listener in &self.listeners {
            listener(&self.lines);
        }
    }
}

impl std::fmt::Debug for Annotations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Annotations")
            .field("drawing", &self.drawing)
            .field("lines", &self.lines.len())
            .field("pending", &self.pending)
            .field("preview", &self.preview)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
