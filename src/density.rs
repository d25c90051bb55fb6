//! Goals-allowed heatmap: Gaussian kernel density over goal placements,
//! cut into iso-density bands with marching squares.
//!
//! The estimate is sampled on a fixed grid that extends `3 * BANDWIDTH`
//! past the goal mouth on every side. The outermost ring of samples is held
//! at zero so that every contour closes inside the grid.

use serde::Serialize;
use std::collections::HashMap;
use std::f64::consts::PI;
use std::fmt::Write;

use crate::geometry::{GoalPoint, NORM_MAX, NORM_MIN};
use crate::shot::ShotEvent;

pub const BANDWIDTH: f64 = 8.0;
pub const BAND_COUNT: usize = 10;
pub const CELL_SIZE: f64 = 4.0;
pub const MAX_OPACITY: f64 = 0.6;

/// One iso-density level. Rings use even-odd fill, so a ring nested in
/// another is a hole.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensityBand {
    pub threshold: f64,
    /// 0 is the lowest density.
    pub rank: usize,
    pub opacity: f64,
    pub rings: Vec<Vec<GoalPoint>>,
}

impl DensityBand {
    pub fn svg_path(&self) -> String {
        let mut d = String::new();
        for ring in &self.rings {
            for (k, p) in ring.iter().enumerate() {
                let cmd = if k == 0 { 'M' } else { 'L' };
                let _ = write!(d, "{cmd}{:.2},{:.2}", p.0.x, p.0.y);
            }
            d.push('Z');
        }
        d
    }
}

/// Heatmap for the goals in `events` that have a placement.
pub fn goal_density(events: &[ShotEvent]) -> Vec<DensityBand> {
    let points: Vec<GoalPoint> = events
        .iter()
        .filter(|e| e.is_goal())
        .filter_map(|e| e.placement)
        .collect();
    estimate(&points)
}

/// Bands sorted ascending by threshold. Empty input, or input with no
/// mass near the goal, yields no bands.
pub fn estimate(points: &[GoalPoint]) -> Vec<DensityBand> {
    if points.is_empty() {
        return Vec::new();
    }
    let grid = Grid::sample(points);
    let max = grid.values.iter().copied().fold(0.0_f64, f64::max);
    if max <= 0.0 {
        return Vec::new();
    }

    (0..BAND_COUNT)
        .map(|rank| {
            let threshold = max * (rank + 1) as f64 / (BAND_COUNT + 1) as f64;
            DensityBand {
                threshold,
                rank,
                opacity: (rank + 1) as f64 / BAND_COUNT as f64 * MAX_OPACITY,
                rings: grid.contour(threshold),
            }
        })
        .collect()
}

struct Grid {
    /// samples per axis
    nx: usize,
    ny: usize,
    x0: f64,
    y0: f64,
    values: Vec<f64>,
}

/// Grid edge: horizontal `(i,j)-(i+1,j)` or vertical `(i,j)-(i,j+1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Edge {
    H(usize, usize),
    V(usize, usize),
}

impl Grid {
    fn sample(points: &[GoalPoint]) -> Self {
        let pad = 3.0 * BANDWIDTH;
        let x0 = NORM_MIN - pad;
        let y0 = NORM_MIN - pad;
        let cells = ((NORM_MAX - NORM_MIN + 2.0 * pad) / CELL_SIZE).ceil() as usize;
        let (nx, ny) = (cells + 1, cells + 1);

        let two_var = 2.0 * BANDWIDTH * BANDWIDTH;
        let norm = 1.0 / (PI * two_var * points.len() as f64);

        let mut values = vec![0.0; nx * ny];
        for j in 1..ny - 1 {
            for i in 1..nx - 1 {
                let x = x0 + i as f64 * CELL_SIZE;
                let y = y0 + j as f64 * CELL_SIZE;
                let sum: f64 = points
                    .iter()
                    .map(|p| {
                        let dx = x - p.0.x;
                        let dy = y - p.0.y;
                        (-(dx * dx + dy * dy) / two_var).exp()
                    })
                    .sum();
                values[j * nx + i] = sum * norm;
            }
        }
        Self {
            nx,
            ny,
            x0,
            y0,
            values,
        }
    }

    fn at(&self, i: usize, j: usize) -> f64 {
        self.values[j * self.nx + i]
    }

    fn pos(&self, i: usize, j: usize) -> (f64, f64) {
        (
            self.x0 + i as f64 * CELL_SIZE,
            self.y0 + j as f64 * CELL_SIZE,
        )
    }

    /// Where the iso-line crosses `edge`, by linear interpolation.
    fn crossing(&self, edge: Edge, threshold: f64) -> GoalPoint {
        let (a, b) = match edge {
            Edge::H(i, j) => ((i, j), (i + 1, j)),
            Edge::V(i, j) => ((i, j), (i, j + 1)),
        };
        let (va, vb) = (self.at(a.0, a.1), self.at(b.0, b.1));
        let (pa, pb) = (self.pos(a.0, a.1), self.pos(b.0, b.1));
        let t = if vb == va { 0.5 } else { (threshold - va) / (vb - va) };
        GoalPoint::new(pa.0 + t * (pb.0 - pa.0), pa.1 + t * (pb.1 - pa.1))
    }

    fn segments(&self, threshold: f64) -> Vec<(Edge, Edge)> {
        let inside = |i: usize, j: usize| self.at(i, j) >= threshold;
        let mut segs = Vec::new();

        for j in 0..self.ny - 1 {
            for i in 0..self.nx - 1 {
                let (a, b, c, d) = (
                    inside(i, j),
                    inside(i + 1, j),
                    inside(i + 1, j + 1),
                    inside(i, j + 1),
                );
                let top = Edge::H(i, j);
                let right = Edge::V(i + 1, j);
                let bottom = Edge::H(i, j + 1);
                let left = Edge::V(i, j);

                let crossed: Vec<Edge> = [(top, a != b), (right, b != c), (bottom, c != d), (left, d != a)]
                    .into_iter()
                    .filter_map(|(e, x)| x.then_some(e))
                    .collect();

                match crossed.as_slice() {
                    [e0, e1] => segs.push((*e0, *e1)),
                    [_, _, _, _] => {
                        // saddle: a == c, b == d
                        let center = (self.at(i, j)
                            + self.at(i + 1, j)
                            + self.at(i + 1, j + 1)
                            + self.at(i, j + 1))
                            / 4.0
                            >= threshold;
                        if center == a {
                            segs.push((top, right));
                            segs.push((bottom, left));
                        } else {
                            segs.push((left, top));
                            segs.push((right, bottom));
                        }
                    }
                    _ => {}
                }
            }
        }
        segs
    }

    /// Closed rings at `threshold`, stitched through shared edges. Every
    /// crossed edge is interior, so it belongs to exactly two segments.
    fn contour(&self, threshold: f64) -> Vec<Vec<GoalPoint>> {
        let segs = self.segments(threshold);
        let mut by_edge: HashMap<Edge, Vec<usize>> = HashMap::new();
        for (k, (e0, e1)) in segs.iter().enumerate() {
            by_edge.entry(*e0).or_default().push(k);
            by_edge.entry(*e1).or_default().push(k);
        }

        let mut visited = vec![false; segs.len()];
        let mut rings = Vec::new();
        for start in 0..segs.len() {
            if visited[start] {
                continue;
            }
            let start_edge = segs[start].0;
            let (mut seg, mut edge) = (start, start_edge);
            let mut ring = Vec::new();
            loop {
                visited[seg] = true;
                ring.push(self.crossing(edge, threshold));
                let (e0, e1) = segs[seg];
                let next_edge = if e0 == edge { e1 } else { e0 };
                if next_edge == start_edge {
                    break;
                }
                let next_seg = by_edge
                    .get(&next_edge)
                    .and_then(|v| v.iter().copied().find(|&s| s != seg && !visited[s]));
                match next_seg {
                    Some(s) => {
                        seg = s;
                        edge = next_edge;
                    }
                    None => {
                        ring.push(self.crossing(next_edge, threshold));
                        break;
                    }
                }
            }
            rings.push(ring);
        }
        rings
    }
}
