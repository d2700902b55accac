use std::fmt;

use kurbo::{Point, Rect};
use tracing::{debug, warn};

use crate::composite::{Composite, CompositeId};
use crate::foundation::core::{Corner, HEdge, VEdge};
use crate::frame::{Edges, Frame, RectI};
use crate::spline::{self, smooth};

/// Anchor corners steered by the interpolation: A leads with its top-right
/// corner, B with its top-left.
pub const A_CORNER: Corner = Corner::TOP_RIGHT;
pub const B_CORNER: Corner = Corner::TOP_LEFT;

/// A precomputed, time-sampled animated path between two composites.
///
/// `composites[0]` is the origin exactly and `composites[last]` the
/// destination exactly; everything between is interpolated. Invariant: a
/// transition always carries at least its authored keyframes, so `begin()` /
/// `end()` may index unconditionally.
#[derive(Clone, Debug)]
pub struct Transition {
    name: String,
    pub composites: Vec<Composite>,
    /// Frame index from which the A/B stacking orders exchange in a
    /// self-inverse transition.
    pub flip: Option<usize>,
}

impl Transition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            composites: Vec::new(),
            flip: None,
        }
    }

    pub fn from_composites(name: impl Into<String>, composites: Vec<Composite>) -> Self {
        Self {
            name: name.into(),
            composites,
            flip: None,
        }
    }

    pub fn push(&mut self, composite: Composite) {
        self.composites.push(composite);
    }

    pub fn frames(&self) -> usize {
        self.composites.len()
    }

    pub fn begin(&self) -> &Composite {
        &self.composites[0]
    }

    pub fn end(&self) -> &Composite {
        &self.composites[self.composites.len() - 1]
    }

    /// True for a self-inverse transition: the destination is the origin with
    /// A and B exchanged.
    pub fn phi(&self) -> bool {
        self.begin().equals(&self.end().swapped(), false, false)
    }

    /// Display name; Φ marks self-inverse transitions.
    pub fn name(&self) -> String {
        if self.phi() {
            format!("Φ({})", self.name)
        } else {
            self.name.clone()
        }
    }

    /// The authored key composites currently in the sequence.
    pub fn keys(&self) -> Vec<Composite> {
        self.composites.iter().filter(|c| c.key()).cloned().collect()
    }

    /// The same path walked backwards.
    pub fn reversed(&self) -> Self {
        let mut t = Self::from_composites(
            format!("{}⁻¹", self.name),
            self.composites.iter().rev().cloned().collect(),
        );
        t.flip = t.calculate_flip();
        t
    }

    /// The same path with A and B exchanged in every step.
    pub fn swapped(&self) -> Self {
        let name = match self.name.strip_prefix('^') {
            Some(base) => base.to_string(),
            None => format!("^{}", self.name),
        };
        let mut t = Self::from_composites(
            name,
            self.composites.iter().map(Composite::swapped).collect(),
        );
        t.flip = t.calculate_flip();
        t
    }

    /// Channel A frame list with stacking orders stamped: `z0` before the
    /// flip index, `z1` from it onward.
    pub fn a_frames(&self, z0: i32, z1: i32) -> Vec<Frame> {
        self.composites
            .iter()
            .enumerate()
            .map(|(i, c)| c.a_at(self.zorder_at(i, z0, z1)))
            .collect()
    }

    /// Channel B counterpart of [`Transition::a_frames`].
    pub fn b_frames(&self, z0: i32, z1: i32) -> Vec<Frame> {
        self.composites
            .iter()
            .enumerate()
            .map(|(i, c)| c.b_at(self.zorder_at(i, z0, z1)))
            .collect()
    }

    fn zorder_at(&self, index: usize, z0: i32, z1: i32) -> i32 {
        match self.flip {
            Some(flip) if index >= flip => z1,
            _ => z0,
        }
    }

    /// For a Φ transition, the first frame at which the cropped A and B
    /// rectangles no longer overlap; the exchange is imperceptible from
    /// there. Falls back to the last frame.
    fn calculate_flip(&self) -> Option<usize> {
        if self.composites.is_empty() || !self.phi() {
            return None;
        }
        fn overlap(a: Rect, b: Rect) -> bool {
            a.x0 < b.x1 && a.x1 > b.x0 && a.y0 < b.y1 && a.y1 > b.y0
        }
        let n = self.composites.len();
        for (i, c) in self.composites.iter().take(n.saturating_sub(2)).enumerate() {
            if !overlap(c.a().cropped(), c.b().cropped()) {
                return Some(i);
            }
        }
        Some(n - 1)
    }

    /// Expand the authored keyframes into `frames` interpolated steps.
    ///
    /// Skipped when the sequence already has the requested length. A sequence
    /// that drifted from its keyframes (definition change) is reset to the
    /// keyframes first.
    pub fn calculate(&mut self, frames: f64) {
        self.calculate_with(frames, A_CORNER, B_CORNER);
    }

    pub fn calculate_with(&mut self, frames: f64, a_corner: Corner, b_corner: Corner) {
        if self.composites.len() as f64 == frames {
            return;
        }
        let keys = self.keys();
        if self.composites.len() != keys.len() {
            warn!(transition = %self.name(), "recalculating transition");
            self.composites = keys;
        }
        debug!(
            transition = %self.name(),
            keys = self.composites.len(),
            frames,
            "calculating transition"
        );

        let mut a: Vec<Frame> = self.composites.iter().map(|c| *c.a()).collect();
        let mut b: Vec<Frame> = self.composites.iter().map(|c| *c.b()).collect();
        // A path that ends where it started carries its movement in the
        // swapped channel; exchange the end frames so the anchors move.
        if a.len() >= 2 && a.last() == a.first() && b.last() == b.first() {
            let last = a.len() - 1;
            std::mem::swap(&mut a[last], &mut b[last]);
        }

        let a_anim = interpolate(&a, frames, a_corner);
        let b_anim = interpolate(&b, frames, b_corner);
        let mut composites = Vec::with_capacity(a_anim.len());
        let mut key_index = 0;
        for (av, bv) in a_anim.iter().zip(&b_anim) {
            let id = if av.key && key_index < self.composites.len() {
                let id = self.composites[key_index].id.clone();
                key_index += 1;
                id
            } else {
                CompositeId::interim()
            };
            composites.push(Composite::from_frames(id, composites.len(), *av, *bv));
        }
        self.composites = composites;
        self.flip = self.calculate_flip();
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} = {} -> {}:",
            self.name(),
            self.begin().id,
            self.end().id
        )?;
        for (i, c) in self.composites.iter().enumerate() {
            let flipped = matches!(self.flip, Some(flip) if i >= flip);
            let (first, second) = if flipped { ("B", "A") } else { ("A", "B") };
            writeln!(
                f,
                "{i:3} {} {first}{}\t{second}{}  {}",
                if c.key() { " * " } else { "   " },
                c.a(),
                c.b(),
                c.id,
            )?;
        }
        Ok(())
    }
}

/// Interpolate `num_frames` placements of `corner` along the spline through
/// the keyframe rectangles.
pub(crate) fn interpolate(key_frames: &[Frame], num_frames: f64, corner: Corner) -> Vec<Frame> {
    let corners: Vec<Point> = key_frames.iter().map(|f| f.corner(corner)).collect();
    let Some(path) = spline::sample_path(&corners) else {
        return Vec::new();
    };
    let corner_indices = spline::nearest_indices(&path, &corners);
    let moves = corner_indices.len() - 1;
    let frames_per_move = (num_frames / moves as f64).round() as usize;
    let lengths = spline::measure(&path);

    let mut animation = Vec::new();
    for i in 1..corner_indices.len() {
        let begin = corner_indices[i - 1];
        let end = corner_indices[i];
        let x0 = (i - 1) as f64 / moves as f64;
        let x1 = i as f64 / moves as f64;
        let points = spline::distribute(
            &path,
            &lengths,
            begin,
            end,
            x0,
            x1,
            frames_per_move.saturating_sub(1),
        );
        animation.push(key_frames[i - 1]);
        let count = points.len();
        for (j, pt) in points.iter().enumerate() {
            animation.push(morph(
                &key_frames[i - 1],
                &key_frames[i],
                *pt,
                corner,
                smooth(j as f64 / count as f64),
            ));
        }
    }
    animation.push(key_frames[key_frames.len() - 1]);
    animation
}

fn fade(begin: f64, end: f64, factor: f64) -> f64 {
    begin + (end - begin) * factor
}

/// Interpolated frame between `begin` and `end` at `factor`, placed so that
/// `corner` of its rectangle lands on `pt`.
fn morph(begin: &Frame, end: &Frame, pt: Point, corner: Corner, factor: f64) -> Frame {
    let size = kurbo::Vec2::new(
        fade(begin.size().x, end.size().x, factor),
        fade(begin.size().y, end.size().y, factor),
    );
    let rect = RectI::new(
        match corner.x {
            HEdge::Left => pt.x.round() as i32,
            HEdge::Right => (pt.x - size.x).round() as i32,
        },
        match corner.y {
            VEdge::Top => pt.y.round() as i32,
            VEdge::Bottom => (pt.y - size.y).round() as i32,
        },
        match corner.x {
            HEdge::Right => pt.x.round() as i32,
            HEdge::Left => (pt.x + size.x).round() as i32,
        },
        match corner.y {
            VEdge::Bottom => pt.y.round() as i32,
            VEdge::Top => (pt.y + size.y).round() as i32,
        },
    );
    let crop = Edges::new(
        fade(f64::from(begin.crop.left), f64::from(end.crop.left), factor).round() as i32,
        fade(f64::from(begin.crop.top), f64::from(end.crop.top), factor).round() as i32,
        fade(f64::from(begin.crop.right), f64::from(end.crop.right), factor).round() as i32,
        fade(
            f64::from(begin.crop.bottom),
            f64::from(end.crop.bottom),
            factor,
        )
        .round() as i32,
    );
    Frame {
        rect,
        crop,
        alpha: fade(f64::from(begin.alpha), f64::from(end.alpha), factor).round() as u8,
        zorder: None,
        key: false,
        original_size: begin.original_size,
    }
}

/// A run of copies of `frame` whose alpha eases toward `alpha`.
pub fn fade_alpha(frame: &Frame, alpha: u8, frames: usize) -> Vec<Frame> {
    (0..frames)
        .map(|i| {
            let mut f = *frame;
            f.alpha = fade(
                f64::from(frame.alpha),
                f64::from(alpha),
                smooth(i as f64 / frames as f64),
            )
            .round() as u8;
            f
        })
        .collect()
}
