//! Pixel to chart-space conversion for one pane.
//!
//! X maps through the visible logical range onto bar indices, then onto the
//! series' timestamps. Beyond the loaded bars, times are extrapolated one
//! interval per index. Y maps linearly onto the pane's price range.

use crate::chart::annotation::AnchorPoint;
use crate::chart::viewport::LogicalRange;
use crate::domain::candle::Candle;

#[derive(Debug, Clone, Copy)]
pub struct CoordinateMapper<'a> {
    pub range: LogicalRange,
    pub width: f64,
    pub height: f64,
    pub price_min: f64,
    pub price_max: f64,
    pub interval_ms: i64,
    pub candles: &'a [Candle],
}

impl<'a> CoordinateMapper<'a> {
    pub fn x_to_logical(&self, x: f64) -> f64 {
        if self.width <= 0.0 {
            return self.range.from;
        }
        self.range.from + x / self.width * self.range.width()
    }

    pub fn logical_to_x(&self, logical: f64) -> f64 {
        let span = self.range.width();
        if span == 0.0 {
            return 0.0;
        }
        (logical - self.range.from) / span * self.width
    }

    pub fn y_to_price(&self, y: f64) -> f64 {
        if self.height <= 0.0 {
            return self.price_max;
        }
        self.price_max - y / self.height * (self.price_max - self.price_min)
    }

    pub fn price_to_y(&self, price: f64) -> f64 {
        let span = self.price_max - self.price_min;
        if span == 0.0 {
            return self.height / 2.0;
        }
        (self.price_max - price) / span * self.height
    }

    /// Time of the bar nearest to `logical`.
    pub fn logical_to_time(&self, logical: f64) -> Option<i64> {
        let first = self.candles.first()?.timestamp;
        let last_idx = self.candles.len() as i64 - 1;
        let last = self.candles[last_idx as usize].timestamp;
        let idx = logical.round() as i64;
        Some(if idx < 0 {
            first + idx * self.interval_ms
        } else if idx > last_idx {
            last + (idx - last_idx) * self.interval_ms
        } else {
            self.candles[idx as usize].timestamp
        })
    }

    /// Fractional bar index of `time`. Between two bars it interpolates.
    pub fn time_to_logical(&self, time: i64) -> Option<f64> {
        let first = self.candles.first()?.timestamp;
        let last_idx = self.candles.len() - 1;
        let last = self.candles[last_idx].timestamp;
        let per_bar = self.interval_ms.max(1) as f64;
        if time <= first {
            return Some((time - first) as f64 / per_bar);
        }
        if time >= last {
            return Some(last_idx as f64 + (time - last) as f64 / per_bar);
        }
        match self.candles.binary_search_by_key(&time, |c| c.timestamp) {
            Ok(i) => Some(i as f64),
            Err(i) => {
                let (lo, hi) = (self.candles[i - 1].timestamp, self.candles[i].timestamp);
                let frac = (time - lo) as f64 / (hi - lo) as f64;
                Some((i - 1) as f64 + frac)
            }
        }
    }

    pub fn pixel_to_point(&self, x: f64, y: f64) -> Option<AnchorPoint> {
        let time = self.logical_to_time(self.x_to_logical(x))?;
        Some(AnchorPoint::new(time, self.y_to_price(y)))
    }

    pub fn point_to_pixel(&self, point: &AnchorPoint) -> Option<(f64, f64)> {
        let logical = self.time_to_logical(point.time)?;
        Some((self.logical_to_x(logical), self.price_to_y(point.price)))
    }
}
