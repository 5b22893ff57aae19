//! Declarative render description of a chart.
//!
//! [`describe`] is pure: the rendering layer diffs successive frames and
//! applies them however its chart library wants.

use crate::chart::series::CandleSeries;
use crate::chart::viewport::{LogicalRange, Viewport};
use crate::domain::candle::Candle;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub show_volume: bool,
    /// Simple moving averages over close, one line per period.
    pub sma_periods: Vec<usize>,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            show_volume: true,
            sma_periods: vec![5, 20],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VolumeBar {
    pub timestamp: i64,
    pub volume: f64,
    pub bullish: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinePoint {
    pub timestamp: i64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorLine {
    pub period: usize,
    pub points: Vec<LinePoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartFrame {
    pub candles: Vec<Candle>,
    pub volume: Vec<VolumeBar>,
    pub indicators: Vec<IndicatorLine>,
    /// `None` until the view reports a range.
    pub visible: Option<LogicalRange>,
    pub follow_tail: bool,
    /// Low/high over the visible bars, or over everything when no range is known.
    pub price_range: Option<PriceRange>,
}

pub fn describe(series: &CandleSeries, viewport: &Viewport, config: &IndicatorConfig) -> ChartFrame {
    let candles = series.as_slice();

    let volume = if config.show_volume {
        candles
            .iter()
            .map(|c| VolumeBar {
                timestamp: c.timestamp,
                volume: c.volume,
                bullish: c.is_bullish(),
            })
            .collect()
    } else {
        Vec::new()
    };

    let indicators = config
        .sma_periods
        .iter()
        .filter(|&&period| period > 0)
        .map(|&period| IndicatorLine {
            period,
            points: sma(candles, period),
        })
        .collect();

    let visible = viewport.range();
    let window = match visible.and_then(|r| r.index_span(candles.len())) {
        Some((start, end)) => &candles[start..=end],
        None => candles,
    };

    ChartFrame {
        candles: candles.to_vec(),
        volume,
        indicators,
        visible,
        follow_tail: viewport.follows_tail(),
        price_range: price_range(window),
    }
}

fn sma(candles: &[Candle], period: usize) -> Vec<LinePoint> {
    if candles.len() < period {
        return Vec::new();
    }
    let mut sum: f64 = candles[..period].iter().map(|c| c.close).sum();
    let mut out = Vec::with_capacity(candles.len() - period + 1);
    out.push(LinePoint {
        timestamp: candles[period - 1].timestamp,
        value: sum / period as f64,
    });
    for i in period..candles.len() {
        sum += candles[i].close - candles[i - period].close;
        out.push(LinePoint {
            timestamp: candles[i].timestamp,
            value: sum / period as f64,
        });
    }
    out
}

fn price_range(candles: &[Candle]) -> Option<PriceRange> {
    let first = candles.first()?;
    let init = PriceRange {
        min: first.low,
        max: first.high,
    };
    Some(candles.iter().fold(init, |acc, c| PriceRange {
        min: acc.min.min(c.low),
        max: acc.max.max(c.high),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(closes: &[f64]) -> CandleSeries {
        CandleSeries::from_unsorted(
            closes
                .iter()
                .enumerate()
                .map(|(i, &close)| Candle {
                    timestamp: i as i64 * 60_000,
                    open: 1.0,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 2.0,
                })
                .collect(),
        )
    }

    #[test]
    fn test_sma_values() {
        let s = series(&[1.0, 2.0, 3.0, 4.0]);
        let cfg = IndicatorConfig {
            show_volume: false,
            sma_periods: vec![2, 10],
        };
        let frame = describe(&s, &Viewport::default(), &cfg);
        assert!(frame.volume.is_empty());
        let values: Vec<f64> = frame.indicators[0].points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![1.5, 2.5, 3.5]);
        assert_eq!(frame.indicators[0].points[0].timestamp, 60_000);
        assert!(frame.indicators[1].points.is_empty());
    }

    #[test]
    fn test_price_range_follows_visible_window() {
        let s = series(&[10.0, 50.0, 20.0, 30.0]);
        let mut v = Viewport::default();
        let all = describe(&s, &v, &IndicatorConfig::default());
        assert_eq!(all.price_range, Some(PriceRange { min: 9.0, max: 51.0 }));
        assert!(all.follow_tail);

        v.set_range(LogicalRange::new(2.0, 3.0));
        let part = describe(&s, &v, &IndicatorConfig::default());
        assert_eq!(part.price_range, Some(PriceRange { min: 19.0, max: 31.0 }));
        assert_eq!(part.volume.len(), 4);
        assert!(part.volume[0].bullish);
    }

    #[test]
    fn test_empty_series() {
        let frame = describe(&CandleSeries::new(), &Viewport::default(), &IndicatorConfig::default());
        assert!(frame.candles.is_empty());
        assert!(frame.price_range.is_none());
    }
}
