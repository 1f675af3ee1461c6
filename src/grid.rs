//! Grid quantization.

use serde::{Deserialize, Serialize};

use crate::error::{DiagramError, Result};
use crate::model::Point;

/// Rounds positions to the nearest multiple of a fixed pitch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSnapper {
    pitch: f64,
}

impl GridSnapper {
    pub fn new(pitch: f64) -> Result<Self> {
        if !pitch.is_finite() || pitch <= 0.0 {
            return Err(DiagramError::InvalidConfig(format!(
                "grid pitch must be a positive number, got {pitch}"
            )));
        }
        Ok(Self { pitch })
    }

    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    pub fn snap_value(&self, value: f64) -> f64 {
        snap_value(value, self.pitch)
    }

    pub fn snap(&self, position: Point) -> Point {
        snap(position, self.pitch)
    }

    /// Round a length up to the next multiple of the pitch (at least one cell).
    pub fn ceil_value(&self, value: f64) -> f64 {
        ((value / self.pitch).ceil() * self.pitch).max(self.pitch)
    }

    pub fn is_aligned(&self, position: Point) -> bool {
        self.snap(position) == position
    }
}

impl Default for GridSnapper {
    fn default() -> Self {
        Self { pitch: 20.0 }
    }
}

pub fn snap_value(value: f64, pitch: f64) -> f64 {
    (value / pitch).round() * pitch
}

/// Snap both coordinates to the nearest multiple of `pitch`.
pub fn snap(position: Point, pitch: f64) -> Point {
    Point::new(snap_value(position.x, pitch), snap_value(position.y, pitch))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap() {
        let grid = GridSnapper::new(5.0).unwrap();
        assert_eq!(grid.snap_value(12.0), 10.0);
        assert_eq!(grid.snap_value(13.0), 15.0);
        assert_eq!(grid.snap_value(0.0), 0.0);
        assert_eq!(grid.snap(Point::new(-7.0, 22.4)), Point::new(-5.0, 20.0));
    }

    #[test]
    fn test_ceil_value() {
        let grid = GridSnapper::new(20.0).unwrap();
        assert_eq!(grid.ceil_value(41.0), 60.0);
        assert_eq!(grid.ceil_value(40.0), 40.0);
        assert_eq!(grid.ceil_value(0.0), 20.0);
    }

    #[test]
    fn test_invalid_pitch() {
        assert!(GridSnapper::new(0.0).is_err());
        assert!(GridSnapper::new(-1.0).is_err());
        assert!(GridSnapper::new(f64::NAN).is_err());
    }
}
