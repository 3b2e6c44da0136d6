use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Output size of a rendered chart: inches and dots per inch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartOptions {
    pub width: f64,
    pub height: f64,
    pub dpi: u32,
}

impl ChartOptions {
    pub fn line_default() -> Self {
        Self { width: 8.0, height: 4.0, dpi: 100 }
    }

    pub fn pie_default() -> Self {
        Self { width: 6.0, height: 6.0, dpi: 100 }
    }

    pub fn pixel_size(&self) -> (u32, u32) {
        let w = (self.width * self.dpi as f64).round().max(1.0) as u32;
        let h = (self.height * self.dpi as f64).round().max(1.0) as u32;
        (w, h)
    }
}

impl FromStr for ChartOptions {
    type Err = String;

    /// Parses `WxH@DPI`, e.g. `8x4@100`. The `@DPI` part is optional and defaults to 100.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (size, dpi) = match s.trim().split_once('@') {
            Some((size, dpi)) => (
                size,
                dpi.trim()
                    .parse::<u32>()
                    .map_err(|_| format!("Invalid chart dpi in '{}'", s))?,
            ),
            None => (s.trim(), 100),
        };
        let (w, h) = size
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("Chart size must look like 8x4@100, got '{}'", s))?;
        let width: f64 = w.trim().parse().map_err(|_| format!("Invalid chart width in '{}'", s))?;
        let height: f64 = h.trim().parse().map_err(|_| format!("Invalid chart height in '{}'", s))?;

        if width <= 0.0 || height <= 0.0 || dpi == 0 {
            return Err(format!("Chart dimensions must be positive, got '{}'", s));
        }
        if (width * dpi as f64) > 8000.0 || (height * dpi as f64) > 8000.0 {
            return Err(format!("Chart '{}' exceeds 8000 pixels per side", s));
        }

        Ok(Self { width, height, dpi })
    }
}

/// A rendered PNG chart. Produced by the chart service and moved into the
/// document composer, which embeds it and drops it.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartAsset {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// The charts handed to the composer for one factsheet.
#[derive(Debug, Default)]
pub struct ChartSet {
    pub performance: Option<ChartAsset>,
    pub sectors: Option<ChartAsset>,
}
