use crate::foundation::error::{StagemixError, StagemixResult};

pub use kurbo::{Point, Rect, Vec2};

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> StagemixResult<Self> {
        if den == 0 {
            return Err(StagemixError::configuration("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(StagemixError::configuration("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Duration of one output frame in nanoseconds.
    pub fn frame_duration_nanos(self) -> i64 {
        1_000_000_000i64 * i64::from(self.den) / i64::from(self.num)
    }
}

/// Pixel dimensions of the output canvas and of upstream source images.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_zero(self) -> bool {
        self.width == 0.0 && self.height == 0.0
    }
}

/// Absolute stream time in nanoseconds, monotonic, zero at pipeline start.
///
/// The core never reads a clock of its own; all values are supplied by the
/// embedder (compositor clock minus its base time).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn from_millis(ms: i64) -> Self {
        Self(ms * 1_000_000)
    }

    pub fn as_millis(self) -> i64 {
        self.0 / 1_000_000
    }

    /// Advance by `nanos`, saturating on overflow.
    pub fn advanced(self, nanos: i64) -> Self {
        Self(self.0.saturating_add(nanos))
    }
}

/// Horizontal edge of a rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HEdge {
    Left,
    Right,
}

/// Vertical edge of a rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VEdge {
    Top,
    Bottom,
}

/// One corner of a rectangle, the anchor the animation engine steers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Corner {
    pub x: HEdge,
    pub y: VEdge,
}

impl Corner {
    pub const TOP_LEFT: Self = Self {
        x: HEdge::Left,
        y: VEdge::Top,
    };
    pub const TOP_RIGHT: Self = Self {
        x: HEdge::Right,
        y: VEdge::Top,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_rejects_zero() {
        assert!(Fps::new(25, 0).is_err());
        assert!(Fps::new(0, 1).is_err());
    }

    #[test]
    fn frame_duration_at_25fps_is_40ms() {
        let fps = Fps::new(25, 1).unwrap();
        assert_eq!(fps.frame_duration_nanos(), 40_000_000);
    }

    #[test]
    fn timestamp_millis_roundtrip() {
        let t = Timestamp::from_millis(1234);
        assert_eq!(t.as_millis(), 1234);
        assert_eq!(t.advanced(1_000_000).as_millis(), 1235);
    }
}
