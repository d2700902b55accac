use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::foundation::core::Size;
use crate::foundation::error::{StagemixError, StagemixResult};
use crate::frame::{Edges, Frame, RectI};

/// Which of the two channel assignments a composite name refers to.
///
/// Operator strings spell the swapped orientation with a `^` prefix; inside
/// the crate the orientation is carried explicitly and never re-parsed out of
/// a name.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum Orientation {
    Normal,
    Swapped,
}

impl Orientation {
    pub fn toggled(self) -> Self {
        match self {
            Self::Normal => Self::Swapped,
            Self::Swapped => Self::Normal,
        }
    }
}

/// Typed composite identifier: base name plus channel orientation.
#[derive(
    Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct CompositeId {
    pub name: String,
    pub orientation: Orientation,
}

impl CompositeId {
    pub fn normal(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            orientation: Orientation::Normal,
        }
    }

    /// Parse the operator spelling, accepting the legacy `^name` form.
    pub fn parse(s: &str) -> Self {
        match s.strip_prefix('^') {
            Some(base) => Self {
                name: base.to_string(),
                orientation: Orientation::Swapped,
            },
            None => Self::normal(s),
        }
    }

    pub fn swapped(&self) -> Self {
        Self {
            name: self.name.clone(),
            orientation: self.orientation.toggled(),
        }
    }

    pub fn is_swapped(&self) -> bool {
        self.orientation == Orientation::Swapped
    }

    /// Placeholder id carried by interpolated composites inside a transition.
    pub(crate) fn interim() -> Self {
        Self::normal("...")
    }
}

impl fmt::Display for CompositeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.orientation {
            Orientation::Normal => write!(f, "{}", self.name),
            Orientation::Swapped => write!(f, "^{}", self.name),
        }
    }
}

/// One configuration key of a composite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompositeAttribute {
    A,
    B,
    CropA,
    CropB,
    AlphaA,
    AlphaB,
    DefaultA,
    DefaultB,
    Inter,
    NoSwap,
}

impl FromStr for CompositeAttribute {
    type Err = StagemixError;

    fn from_str(s: &str) -> StagemixResult<Self> {
        match s {
            "a" => Ok(Self::A),
            "b" => Ok(Self::B),
            "crop-a" => Ok(Self::CropA),
            "crop-b" => Ok(Self::CropB),
            "alpha-a" => Ok(Self::AlphaA),
            "alpha-b" => Ok(Self::AlphaB),
            "default-a" => Ok(Self::DefaultA),
            "default-b" => Ok(Self::DefaultB),
            "inter" => Ok(Self::Inter),
            "noswap" => Ok(Self::NoSwap),
            other => Err(StagemixError::configuration(format!(
                "unknown composite attribute '{other}'"
            ))),
        }
    }
}

/// A named target layout: a pair of frames for channels A and B plus the
/// metadata steering swapping and transition targeting.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Composite {
    pub id: CompositeId,
    /// Stable sort key, the position in the configuration.
    pub order: usize,
    frames: [Frame; 2],
    pub default_sources: [Option<String>; 2],
    /// Intermediate waypoint of a transition path, not user-selectable.
    pub inter: bool,
    /// Swapping A and B is meaningless for this layout (e.g. fullscreen).
    pub noswap: bool,
}

impl Composite {
    pub fn new(order: usize, id: CompositeId) -> Self {
        Self {
            id,
            order,
            frames: [Frame::new(true), Frame::new(true)],
            default_sources: [None, None],
            inter: false,
            noswap: false,
        }
    }

    /// Assemble a composite from two channel frames, as the interpolation
    /// engine does for every animation step.
    pub fn from_frames(id: CompositeId, order: usize, a: Frame, b: Frame) -> Self {
        Self {
            id,
            order,
            frames: [a, b],
            default_sources: [None, None],
            inter: false,
            noswap: false,
        }
    }

    pub fn a(&self) -> &Frame {
        &self.frames[0]
    }

    pub fn b(&self) -> &Frame {
        &self.frames[1]
    }

    /// Channel A frame stamped with a stacking order, ready to commit.
    pub fn a_at(&self, zorder: i32) -> Frame {
        self.frames[0].at_zorder(zorder)
    }

    /// Channel B frame stamped with a stacking order, ready to commit.
    pub fn b_at(&self, zorder: i32) -> Frame {
        self.frames[1].at_zorder(zorder)
    }

    /// True when either channel carries an authored frame.
    pub fn key(&self) -> bool {
        self.frames.iter().any(|f| f.key)
    }

    /// Compare two composites for looking the same.
    ///
    /// A zero-area rectangle looks the same as one with alpha 0, so channel B
    /// only needs both-invisible equivalence. With `covered_as_invisible`,
    /// channel A additionally matches when both composites fully hide their B
    /// channel. `flip_other` compares against the other composite with its
    /// channels exchanged.
    pub fn equals(&self, other: &Self, covered_as_invisible: bool, flip_other: bool) -> bool {
        let (other_a, other_b) = if flip_other {
            (other.b(), other.a())
        } else {
            (other.a(), other.b())
        };
        if !(self.a() == other_a
            || (covered_as_invisible && self.covered() && other.covered()))
        {
            return false;
        }
        self.b() == other_b || (self.b().invisible() && other_b.invisible())
    }

    /// True when channel B is not actually visible: invisible outright, or
    /// behind an A frame that is (semi-)transparent or wholly contains B's
    /// cropped rectangle. Licenses silent source substitution on B.
    pub fn covered(&self) -> bool {
        let above = self.a();
        let below = self.b();
        if below.invisible() {
            return true;
        }
        if above.invisible() {
            return false;
        }
        let bc = below.cropped();
        let ac = above.cropped();
        above.alpha < 255
            || (bc.x0 >= ac.x0 && bc.y0 >= ac.y0 && bc.x1 <= ac.x1 && bc.y1 <= ac.y1)
    }

    /// Exchange the A and B channels in place; identity under `noswap`.
    pub fn swap(&mut self) {
        if self.noswap {
            return;
        }
        self.frames.swap(0, 1);
        self.default_sources.swap(0, 1);
        self.id = self.id.swapped();
    }

    /// Copy with A and B exchanged; identity under `noswap`.
    pub fn swapped(&self) -> Self {
        let mut s = self.clone();
        s.swap();
        s
    }

    /// Apply one configuration key. `size` is the output resolution that
    /// proportional coordinates refer to; it also becomes the frames'
    /// original (upstream) size.
    pub fn apply(
        &mut self,
        attr: CompositeAttribute,
        value: &str,
        size: Size,
    ) -> StagemixResult<()> {
        match attr {
            CompositeAttribute::A => self.frames[0].rect = parse_rect(value, size)?,
            CompositeAttribute::B => self.frames[1].rect = parse_rect(value, size)?,
            CompositeAttribute::CropA => self.frames[0].crop = parse_crop(value, size)?,
            CompositeAttribute::CropB => self.frames[1].crop = parse_crop(value, size)?,
            CompositeAttribute::AlphaA => self.frames[0].alpha = parse_alpha(value)?,
            CompositeAttribute::AlphaB => self.frames[1].alpha = parse_alpha(value)?,
            CompositeAttribute::DefaultA => {
                self.default_sources[0] = Some(value.to_string());
            }
            CompositeAttribute::DefaultB => {
                self.default_sources[1] = Some(value.to_string());
            }
            CompositeAttribute::Inter => self.inter = parse_bool(value)?,
            CompositeAttribute::NoSwap => self.noswap = parse_bool(value)?,
        }
        self.frames[0].original_size = size;
        self.frames[1].original_size = size;
        Ok(())
    }
}

impl fmt::Display for Composite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} A{}\tB{}  {}",
            if self.key() { " * " } else { "   " },
            self.a(),
            self.b(),
            self.id,
        )
    }
}

/// All configured composites, including the auto-derived swapped twins.
#[derive(Clone, Debug, Default)]
pub struct CompositeTable {
    composites: BTreeMap<CompositeId, Composite>,
}

impl CompositeTable {
    /// Build the table from `<name>.<attribute> = <value>` configuration
    /// items. `size` is the output resolution all proportional coordinates
    /// refer to. After all attributes are applied, a swapped twin is added
    /// for every non-intermediate composite that has no equivalent yet, so
    /// both orientations of every target are reachable.
    pub fn configure(items: &[(String, String)], size: Size) -> StagemixResult<Self> {
        let mut table = Self::default();
        for (key, value) in items {
            let key = key.to_lowercase();
            let Some((name, attr)) = key.rsplit_once('.') else {
                return Err(StagemixError::configuration(format!(
                    "syntax error in composite config '{key}' (must be: 'name.attribute')"
                )));
            };
            let id = CompositeId::parse(name);
            let order = table.composites.len();
            let composite = table
                .composites
                .entry(id.clone())
                .or_insert_with(|| Composite::new(order, id.clone()));
            let attr = CompositeAttribute::from_str(attr)
                .map_err(|err| wrap_config_error(name, &err))?;
            composite
                .apply(attr, value, size)
                .map_err(|err| wrap_config_error(name, &err))?;
        }
        table.add_swapped_targets();
        Ok(table)
    }

    /// Synthesize swapped twins for non-intermediate composites lacking an
    /// equivalent under the coverage-aware comparison.
    fn add_swapped_targets(&mut self) {
        let mut twins = Vec::new();
        for c in self.composites.values() {
            if c.inter {
                continue;
            }
            let swapped = c.swapped();
            let exists = self
                .composites
                .values()
                .any(|v| !v.inter && v.equals(&swapped, true, false));
            if !exists {
                debug!(composite = %c.id, twin = %swapped.id, "adding auto-swapped target");
                twins.push(swapped);
            }
        }
        let base = self.composites.len();
        for (i, mut twin) in twins.into_iter().enumerate() {
            twin.order = base + i;
            self.composites.insert(twin.id.clone(), twin);
        }
    }

    /// Non-intermediate composites in configuration order.
    pub fn targets(&self) -> Vec<&Composite> {
        let mut result: Vec<&Composite> =
            self.composites.values().filter(|c| !c.inter).collect();
        result.sort_by_key(|c| c.order);
        result
    }

    /// Intermediate composites in configuration order.
    pub fn intermediates(&self) -> Vec<&Composite> {
        let mut result: Vec<&Composite> =
            self.composites.values().filter(|c| c.inter).collect();
        result.sort_by_key(|c| c.order);
        result
    }

    /// Resolve an id to a composite value: a direct table hit, or the swapped
    /// derivative of the base entry.
    pub fn resolve(&self, id: &CompositeId) -> Option<Composite> {
        if let Some(c) = self.composites.get(id) {
            return Some(c.clone());
        }
        if id.is_swapped() {
            return self
                .composites
                .get(&CompositeId::normal(id.name.clone()))
                .map(Composite::swapped);
        }
        None
    }

    /// Resolve an operator-spelled name (accepting the `^` form).
    pub fn get(&self, name: &str) -> Option<Composite> {
        self.resolve(&CompositeId::parse(&name.to_lowercase()))
    }

    pub fn len(&self) -> usize {
        self.composites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.composites.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Composite> {
        self.composites.values()
    }
}

fn wrap_config_error(name: &str, err: &StagemixError) -> StagemixError {
    StagemixError::configuration(format!(
        "syntax error in composite config value at '{name}': {err}"
    ))
}

/// Resolve one coordinate token: `*` is the maximum, fractional values are
/// proportions of the maximum, anything else is an absolute pixel value.
fn absolute(s: &str, max: f64) -> StagemixResult<i32> {
    if s == "*" {
        return Ok(max as i32);
    }
    if s.contains('.') {
        let f: f64 = s
            .parse()
            .map_err(|_| StagemixError::configuration(format!("bad proportional value '{s}'")))?;
        return Ok((f * max) as i32);
    }
    s.parse()
        .map_err(|_| StagemixError::configuration(format!("bad pixel value '{s}'")))
}

static RE_POS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([-.\d]+)\s*/\s*([-.\d]+)\s*$").unwrap());
static RE_DIM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([.\d]+)\s*x\s*([.\d]+)\s*$").unwrap());
static RE_POS_DIM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([-.\d]+)\s*/\s*([-.\d]+)\s+([.\d]+)\s*x\s*([.\d]+)\s*$").unwrap()
});
static RE_PROP_DIM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(-?\d+\.\d+)\s+([.\d]+)\s*x\s*([.\d]+)\s*$").unwrap());
static RE_POS_PROP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([-.\d]+)\s*/\s*([-.\d]+)\s+(\d+\.\d+)\s*$").unwrap());
static RE_PROP_PROP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(-?\d+\.\d+)\s+(\d+\.\d+)\s*$").unwrap());

/// Read a rectangle from `*`, `X/Y WxH`, `X/Y`, `WxH`, `X/Y WH` or `XY WH`.
pub fn parse_rect(s: &str, size: Size) -> StagemixResult<RectI> {
    if s == "*" {
        return Ok(RectI::new(0, 0, size.width as i32, size.height as i32));
    }
    // 'X/Y': position with the overall size.
    if let Some(c) = RE_POS.captures(s) {
        return Ok(RectI::new(
            absolute(&c[1], size.width)?,
            absolute(&c[2], size.height)?,
            size.width as i32,
            size.height as i32,
        ));
    }
    // 'WxH': dimensions at the origin.
    if let Some(c) = RE_DIM.captures(s) {
        return Ok(RectI::new(
            0,
            0,
            absolute(&c[1], size.width)?,
            absolute(&c[2], size.height)?,
        ));
    }
    // 'X/Y WxH'
    if let Some(c) = RE_POS_DIM.captures(s) {
        let x = absolute(&c[1], size.width)?;
        let y = absolute(&c[2], size.height)?;
        return Ok(RectI::new(
            x,
            y,
            x + absolute(&c[3], size.width)?,
            y + absolute(&c[4], size.height)?,
        ));
    }
    // 'XY WxH': one proportion for both position axes.
    if let Some(c) = RE_PROP_DIM.captures(s) {
        let x = absolute(&c[1], size.width)?;
        let y = absolute(&c[1], size.height)?;
        return Ok(RectI::new(
            x,
            y,
            x + absolute(&c[2], size.width)?,
            y + absolute(&c[3], size.height)?,
        ));
    }
    // 'X/Y WH': one proportion for both dimension axes.
    if let Some(c) = RE_POS_PROP.captures(s) {
        let x = absolute(&c[1], size.width)?;
        let y = absolute(&c[2], size.height)?;
        return Ok(RectI::new(
            x,
            y,
            x + absolute(&c[3], size.width)?,
            y + absolute(&c[3], size.height)?,
        ));
    }
    // 'XY WH': proportions everywhere.
    if let Some(c) = RE_PROP_PROP.captures(s) {
        let x = absolute(&c[1], size.width)?;
        let y = absolute(&c[1], size.height)?;
        return Ok(RectI::new(
            x,
            y,
            x + absolute(&c[2], size.width)?,
            y + absolute(&c[2], size.height)?,
        ));
    }
    Err(StagemixError::configuration(format!(
        "syntax error in rectangle value '{s}' (must be either '*', 'X/Y WxH', 'X/Y', 'WxH', \
         'X/Y WH' or 'XY WH' where X, Y, W, H may be int or float and XY, WH must be float)"
    )))
}

static RE_CROP4: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([.\d]+)\s*/\s*([.\d]+)\s*/\s*([.\d]+)\s*/\s*([.\d]+)\s*$").unwrap()
});
static RE_CROP2: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([.\d]+)\s*/\s*([.\d]+)\s*$").unwrap());
static RE_CROP1: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*([.\d]+)\s*$").unwrap());

/// Read crop insets from `*`, `L/T/R/B`, `LR/TB` or `LTRB`.
pub fn parse_crop(s: &str, size: Size) -> StagemixResult<Edges> {
    if s == "*" {
        return Ok(Edges::ZERO);
    }
    if let Some(c) = RE_CROP4.captures(s) {
        return Ok(Edges::new(
            absolute(&c[1], size.width)?,
            absolute(&c[2], size.height)?,
            absolute(&c[3], size.width)?,
            absolute(&c[4], size.height)?,
        ));
    }
    if let Some(c) = RE_CROP2.captures(s) {
        return Ok(Edges::new(
            absolute(&c[1], size.width)?,
            absolute(&c[2], size.height)?,
            absolute(&c[1], size.width)?,
            absolute(&c[2], size.height)?,
        ));
    }
    if let Some(c) = RE_CROP1.captures(s) {
        return Ok(Edges::new(
            absolute(&c[1], size.width)?,
            absolute(&c[1], size.height)?,
            absolute(&c[1], size.width)?,
            absolute(&c[1], size.height)?,
        ));
    }
    Err(StagemixError::configuration(format!(
        "syntax error in crop value '{s}' (must be either '*', 'L/T/R/B', 'LR/TB' or 'LTRB' \
         where L, T, R, B, LR/TB and LTRB must be int or float)"
    )))
}

/// Read an alpha value: int 0..=255 or a float proportion of 255.
pub fn parse_alpha(s: &str) -> StagemixResult<u8> {
    let trimmed = s.trim();
    if RE_CROP1.is_match(trimmed) {
        let v = absolute(trimmed, 255.0)?;
        if (0..=255).contains(&v) {
            return Ok(v as u8);
        }
    }
    Err(StagemixError::configuration(format!(
        "syntax error in alpha value '{s}' (must be float or int)"
    )))
}

fn parse_bool(s: &str) -> StagemixResult<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => Err(StagemixError::configuration(format!(
            "syntax error in boolean value '{other}'"
        ))),
    }
}
