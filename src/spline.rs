//! Path interpolation for the transition engine.
//!
//! Keyframe anchor corners are threaded onto an interpolating quadratic
//! B-spline (straight line for two points), sampled at a fixed parameter
//! resolution. The sampled path is then measured for arc length so frames can
//! be distributed along it with a cosine ease.

use kurbo::Point;

/// Parameter step for sampling the fitted curve.
pub const RESOLUTION: f64 = 0.001;

/// Cosine ease: decelerates into and accelerates out of the endpoints.
pub fn smooth(x: f64) -> f64 {
    (1.0 - (std::f64::consts::PI * x).cos()) / 2.0
}

/// An interpolating quadratic B-spline through a set of 2D points.
///
/// Chord-length parameterization, clamped knot vector with interior knots at
/// parameter midpoints (Schoenberg-Whitney), control points solved from the
/// interpolation conditions.
#[derive(Clone, Debug)]
pub struct QuadSpline {
    knots: Vec<f64>,
    ctrl: Vec<Point>,
}

impl QuadSpline {
    /// Fit through `points` (at least 3). Returns `None` when the system is
    /// not solvable (degenerate input).
    pub fn fit(points: &[Point]) -> Option<Self> {
        if points.len() < 3 {
            return None;
        }
        let params = chord_params(points);
        let n = points.len();

        // Clamped quadratic knots: triple ends plus interior midpoints.
        let mut knots = vec![0.0; 3];
        for j in 1..n - 2 {
            knots.push((params[j] + params[j + 1]) / 2.0);
        }
        knots.extend([1.0, 1.0, 1.0]);

        // Interpolation conditions form an n x n banded system per axis.
        let mut matrix = vec![vec![0.0f64; n]; n];
        for (row, &t) in params.iter().enumerate() {
            for col in 0..n {
                matrix[row][col] = basis(&knots, col, 2, t);
            }
        }
        let xs = solve(&matrix, &points.iter().map(|p| p.x).collect::<Vec<_>>())?;
        let ys = solve(&matrix, &points.iter().map(|p| p.y).collect::<Vec<_>>())?;
        let ctrl = xs
            .into_iter()
            .zip(ys)
            .map(|(x, y)| Point::new(x, y))
            .collect();
        Some(Self { knots, ctrl })
    }

    /// Evaluate at parameter `u` in `[0, 1]` by de Boor's algorithm.
    pub fn eval(&self, u: f64) -> Point {
        let u = u.clamp(0.0, 1.0);
        let n = self.ctrl.len();
        // Knot span index: last i with knots[i] <= u, limited to valid spans.
        let mut span = n - 1;
        for i in 2..n {
            if u < self.knots[i + 1] {
                span = i;
                break;
            }
        }
        let mut d = [
            self.ctrl[span - 2],
            self.ctrl[span - 1],
            self.ctrl[span],
        ];
        for r in 1..=2usize {
            for j in (r..=2).rev() {
                let i = span - 2 + j;
                let denom = self.knots[i + 3 - r] - self.knots[i];
                let alpha = if denom == 0.0 {
                    0.0
                } else {
                    (u - self.knots[i]) / denom
                };
                d[j] = Point::new(
                    (1.0 - alpha) * d[j - 1].x + alpha * d[j].x,
                    (1.0 - alpha) * d[j - 1].y + alpha * d[j].y,
                );
            }
        }
        d[2]
    }
}

/// Normalized chord-length parameters, kept strictly increasing even for
/// coincident points so the interpolation system stays solvable.
fn chord_params(points: &[Point]) -> Vec<f64> {
    let mut acc = Vec::with_capacity(points.len());
    let mut total = 0.0;
    acc.push(total);
    for w in points.windows(2) {
        total += w[0].distance(w[1]).max(1e-9);
        acc.push(total);
    }
    acc.iter().map(|v| v / total).collect()
}

/// Cox-de Boor basis function N_{i,p} on `knots` at `t`.
fn basis(knots: &[f64], i: usize, p: usize, t: f64) -> f64 {
    if p == 0 {
        // Half-open spans, except the last span which includes t == 1.
        let last = t >= 1.0 && knots[i] < knots[i + 1] && knots[i + 1] >= 1.0;
        return if (knots[i] <= t && t < knots[i + 1]) || last {
            1.0
        } else {
            0.0
        };
    }
    let mut value = 0.0;
    let left_denom = knots[i + p] - knots[i];
    if left_denom > 0.0 {
        value += (t - knots[i]) / left_denom * basis(knots, i, p - 1, t);
    }
    let right_denom = knots[i + p + 1] - knots[i + 1];
    if right_denom > 0.0 {
        value += (knots[i + p + 1] - t) / right_denom * basis(knots, i + 1, p - 1, t);
    }
    value
}

/// Dense Gaussian elimination with partial pivoting. Keyframe counts are
/// single digits, so O(n^3) is irrelevant here.
fn solve(matrix: &[Vec<f64>], rhs: &[f64]) -> Option<Vec<f64>> {
    let n = rhs.len();
    let mut a: Vec<Vec<f64>> = matrix.to_vec();
    let mut b = rhs.to_vec();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..n {
            let f = a[row][col] / a[col][col];
            if f == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= f * a[col][k];
            }
            b[row] -= f * b[col];
        }
    }
    let mut x = vec![0.0f64; n];
    for row in (0..n).rev() {
        let mut sum = b[row];
        for col in row + 1..n {
            sum -= a[row][col] * x[col];
        }
        x[row] = sum / a[row][row];
    }
    Some(x)
}

/// Sample the interpolated path through `points` at [`RESOLUTION`].
///
/// Two points degrade to a straight line; fewer yield `None`.
pub fn sample_path(points: &[Point]) -> Option<Vec<Point>> {
    let steps = (1.0 / RESOLUTION).round() as usize;
    match points.len() {
        0 | 1 => None,
        2 => {
            let (a, b) = (points[0], points[1]);
            Some(
                (0..=steps)
                    .map(|i| {
                        let t = i as f64 * RESOLUTION;
                        Point::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t)
                    })
                    .collect(),
            )
        }
        _ => {
            let spline = QuadSpline::fit(points)?;
            Some(
                (0..=steps)
                    .map(|i| spline.eval(i as f64 * RESOLUTION))
                    .collect(),
            )
        }
    }
}

/// Cumulative arc length at every path point.
pub fn measure(points: &[Point]) -> Vec<f64> {
    let mut lengths = Vec::with_capacity(points.len());
    let mut total = 0.0;
    lengths.push(total);
    for w in points.windows(2) {
        total += w[0].distance(w[1]);
        lengths.push(total);
    }
    lengths
}

/// For every anchor, the index of the nearest path point.
pub fn nearest_indices(path: &[Point], anchors: &[Point]) -> Vec<usize> {
    anchors
        .iter()
        .map(|p| {
            let mut best = 0;
            let mut best_d = f64::INFINITY;
            for (i, q) in path.iter().enumerate() {
                let d = (q.x - p.x).powi(2) + (q.y - p.y).powi(2);
                if d < best_d {
                    best_d = d;
                    best = i;
                }
            }
            best
        })
        .collect()
}

/// Select `n` points from `path[begin..=end]` whose arc-length spacing
/// follows the cosine ease over the global progress window `[x0, x1]`.
/// `lengths` is the cumulative arc length of the whole path.
pub fn distribute(
    path: &[Point],
    lengths: &[f64],
    begin: usize,
    end: usize,
    x0: f64,
    x1: f64,
    n: usize,
) -> Vec<Point> {
    let mut result = Vec::with_capacity(n);
    let length = lengths[end.saturating_sub(1)] - lengths[begin];
    if length == 0.0 {
        result.resize(n, path[begin]);
        return result;
    }
    let pos0 = smooth(x0);
    let pos1 = smooth(x1);
    for i in 0..n {
        let x = smooth(x0 + ((x1 - x0) / n as f64) * i as f64);
        let pos = (x - pos0) / (pos1 - pos0) * length + lengths[begin];
        // First path point at or beyond the eased arc-length position.
        let offset = lengths[begin..end].partition_point(|&v| v < pos);
        if begin + offset < end {
            result.push(path[begin + offset]);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smooth_endpoints_and_midpoint() {
        assert!(smooth(0.0).abs() < 1e-12);
        assert!((smooth(1.0) - 1.0).abs() < 1e-12);
        assert!((smooth(0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn two_point_path_is_exact_line() {
        let path = sample_path(&[Point::new(0.0, 0.0), Point::new(100.0, 50.0)]).unwrap();
        assert_eq!(path.len(), 1001);
        assert_eq!(path[0], Point::new(0.0, 0.0));
        assert_eq!(*path.last().unwrap(), Point::new(100.0, 50.0));
        // midpoint on the segment
        let mid = path[500];
        assert!((mid.x - 50.0).abs() < 0.2);
        assert!((mid.y - 25.0).abs() < 0.1);
    }

    #[test]
    fn line_arc_length_matches_euclidean() {
        let path = sample_path(&[Point::new(0.0, 0.0), Point::new(300.0, 400.0)]).unwrap();
        let lengths = measure(&path);
        assert!((lengths.last().unwrap() - 500.0).abs() < 1e-6);
    }

    #[test]
    fn spline_passes_through_its_anchor_points() {
        let anchors = [
            Point::new(0.0, 0.0),
            Point::new(400.0, 300.0),
            Point::new(900.0, 100.0),
            Point::new(1500.0, 700.0),
        ];
        let spline = QuadSpline::fit(&anchors).unwrap();
        let params = [0.0, 1.0];
        // clamped ends are exact
        assert!(spline.eval(params[0]).distance(anchors[0]) < 1e-9);
        assert!(spline.eval(params[1]).distance(anchors[3]) < 1e-9);
        // interior anchors lie on the sampled path
        let path = sample_path(&anchors).unwrap();
        for a in &anchors {
            let idx = nearest_indices(&path, &[*a])[0];
            assert!(path[idx].distance(*a) < 2.0, "anchor {a:?} off-curve");
        }
    }

    #[test]
    fn collinear_spline_stays_on_the_line() {
        let anchors = [
            Point::new(0.0, 0.0),
            Point::new(500.0, 0.0),
            Point::new(1000.0, 0.0),
        ];
        let path = sample_path(&anchors).unwrap();
        for p in &path {
            assert!(p.y.abs() < 1e-6);
        }
    }

    #[test]
    fn coincident_anchors_do_not_break_the_fit() {
        let anchors = [
            Point::new(100.0, 100.0),
            Point::new(100.0, 100.0),
            Point::new(600.0, 400.0),
        ];
        let path = sample_path(&anchors).unwrap();
        assert_eq!(path.len(), 1001);
        assert!(path[0].distance(anchors[0]) < 1e-6);
        assert!(path.last().unwrap().distance(anchors[2]) < 1e-6);
    }

    #[test]
    fn measure_is_monotonic() {
        let path = sample_path(&[
            Point::new(0.0, 0.0),
            Point::new(100.0, 200.0),
            Point::new(400.0, 50.0),
        ])
        .unwrap();
        let lengths = measure(&path);
        assert!(lengths.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn distribute_eases_density_toward_endpoints() {
        let path = sample_path(&[Point::new(0.0, 0.0), Point::new(1000.0, 0.0)]).unwrap();
        let lengths = measure(&path);
        let pts = distribute(&path, &lengths, 0, path.len(), 0.0, 1.0, 20);
        assert!(!pts.is_empty());
        // eased distribution: the first step is smaller than a middle step
        let first_step = pts[1].x - pts[0].x;
        let mid_step = pts[10].x - pts[9].x;
        assert!(first_step < mid_step);
    }

    #[test]
    fn distribute_handles_zero_length_segment() {
        let path = vec![Point::new(5.0, 5.0); 10];
        let lengths = measure(&path);
        let pts = distribute(&path, &lengths, 0, 10, 0.0, 1.0, 4);
        assert_eq!(pts.len(), 4);
        assert!(pts.iter().all(|p| *p == Point::new(5.0, 5.0)));
    }
}
