use std::fmt;

use kurbo::{Point, Rect, Vec2};

use crate::foundation::core::{Corner, HEdge, Size, VEdge};

/// Integer rectangle in output pixels, edges left/top/right/bottom.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RectI {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl RectI {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(self) -> i32 {
        self.right - self.left
    }

    pub fn height(self) -> i32 {
        self.bottom - self.top
    }

    pub fn is_zero_area(self) -> bool {
        self.right == self.left || self.bottom == self.top
    }
}

/// Per-edge pixel insets into the original upstream image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Edges {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Edges {
    pub const ZERO: Self = Self {
        left: 0,
        top: 0,
        right: 0,
        bottom: 0,
    };

    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn is_zero(self) -> bool {
        self == Self::ZERO
    }
}

/// Placement of one layer at one instant: output rectangle, source crop,
/// opacity and stacking order.
///
/// `key` marks an authored frame as opposed to an interpolated one.
/// `original_size` is the native upstream resolution, stamped when the owning
/// composite is configured; the zoom factors are derived from it.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct Frame {
    pub rect: RectI,
    pub crop: Edges,
    pub alpha: u8,
    pub zorder: Option<i32>,
    pub key: bool,
    pub original_size: Size,
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            rect: RectI::default(),
            crop: Edges::ZERO,
            alpha: 255,
            zorder: None,
            key: false,
            original_size: Size::default(),
        }
    }
}

/// Equality ignores the derived zoom, the key marker and the stacking order:
/// two frames look the same when rect, crop and alpha agree.
impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.rect == other.rect && self.crop == other.crop && self.alpha == other.alpha
    }
}

impl Frame {
    pub fn new(key: bool) -> Self {
        Self {
            key,
            ..Self::default()
        }
    }

    /// The frame a source gets when it takes no part in the current scene.
    pub fn hidden() -> Self {
        Self {
            alpha: 0,
            zorder: Some(-1),
            key: true,
            ..Self::default()
        }
    }

    /// Horizontal scale between the upstream image and the output rectangle.
    ///
    /// Defined only for cropped frames; an uncropped frame has no derived
    /// scale and reports 0.
    pub fn zoom_x(&self) -> f64 {
        if self.crop.is_zero() {
            return 0.0;
        }
        f64::from(self.rect.width()) / self.original_size.width
    }

    /// Vertical counterpart of [`Frame::zoom_x`].
    pub fn zoom_y(&self) -> f64 {
        if self.crop.is_zero() {
            return 0.0;
        }
        f64::from(self.rect.height()) / self.original_size.height
    }

    pub fn zoom(&self) -> Vec2 {
        Vec2::new(self.zoom_x(), self.zoom_y())
    }

    /// The visible rectangle after removing the cropped source margins.
    ///
    /// Every consumer of the on-screen extent (coverage tests, flip-overlap
    /// detection, the scene push) goes through this single computation.
    pub fn cropped(&self) -> Rect {
        Rect::new(
            f64::from(self.rect.left) + f64::from(self.crop.left) * self.zoom_x(),
            f64::from(self.rect.top) + f64::from(self.crop.top) * self.zoom_y(),
            f64::from(self.rect.right) - f64::from(self.crop.right) * self.zoom_x(),
            f64::from(self.rect.bottom) - f64::from(self.crop.bottom) * self.zoom_y(),
        )
    }

    /// The selected corner of the uncropped rectangle.
    pub fn corner(&self, corner: Corner) -> Point {
        let x = match corner.x {
            HEdge::Left => self.rect.left,
            HEdge::Right => self.rect.right,
        };
        let y = match corner.y {
            VEdge::Top => self.rect.top,
            VEdge::Bottom => self.rect.bottom,
        };
        Point::new(f64::from(x), f64::from(y))
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(f64::from(self.rect.width()), f64::from(self.rect.height()))
    }

    pub fn float_alpha(&self) -> f64 {
        f64::from(self.alpha) / 255.0
    }

    /// A frame is invisible when its rectangle has no area or it is fully
    /// transparent.
    pub fn invisible(&self) -> bool {
        self.rect.is_zero_area() || self.alpha == 0
    }

    /// Left-right flip about the upstream image width, for mirror variants.
    pub fn mirrored(&self) -> Self {
        let mut f = *self;
        let w = self.original_size.width;
        f.rect.left = (w - f64::from(self.rect.right)) as i32;
        f.rect.right = (w - f64::from(self.rect.left)) as i32;
        f
    }

    /// Copy with the given stacking order, for committing to a scene.
    pub fn at_zorder(&self, zorder: i32) -> Self {
        let mut f = *self;
        f.zorder = Some(zorder);
        f
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let z = self.zoom();
        write!(
            f,
            "({:4},{:4}  {:4},{:4}  {:4}  {:4},{:4},{:4},{:4}  {:1.2},{:1.2}, {:2})",
            self.rect.left,
            self.rect.top,
            self.rect.right,
            self.rect.bottom,
            self.alpha,
            self.crop.left,
            self.crop.top,
            self.crop.right,
            self.crop.bottom,
            z.x,
            z.y,
            self.zorder.unwrap_or(-1),
        )
    }
}
