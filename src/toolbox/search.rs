/*
Copyright 2021 Jakub Lewandowski

This file is part of MOM6 Tools (m6tools).

MOM6 Tools (m6tools) is a free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation; either version 3 of the License, or
(at your option) any later version.

MOM6 Tools (m6tools) is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with MOM6 Tools (m6tools). If not, see https://www.gnu.org/licenses/.
*/

//! Module containing methods for locating points
//! on curvilinear model meshes.

use crate::Float;
use ndarray::{s, ArrayView2};

/// Finds `(j, i)` of the cell with centre nearest to `xy0`.
///
/// Distance is measured in the coordinate space of `x` and `y`,
/// (usually degrees) without any wrapping. If several cells are
/// equally close, the first one in row-major order is returned.
pub fn nearest_ji(x: ArrayView2<Float>, y: ArrayView2<Float>, xy0: (Float, Float)) -> (usize, usize) {
    let (x0, y0) = xy0;
    let mut best = (0, 0);
    let mut best_dist = Float::INFINITY;

    for ((idx, &xv), &yv) in x.indexed_iter().zip(y.iter()) {
        let dist = (xv - x0).powi(2) + (yv - y0).powi(2);

        if dist < best_dist {
            best_dist = dist;
            best = idx;
        }
    }

    best
}

fn sign(x: Float) -> Float {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

fn cross_sign(u0: Float, v0: Float, u1: Float, v1: Float) -> Float {
    sign(u0 * v1 - u1 * v0)
}

/// Checks if point lies inside the convex polygon with vertices
/// given in order (either clockwise or counter-clockwise).
///
/// Points on the edges are counted as inside.
pub fn is_point_in_convex_polygon(px: &[Float], py: &[Float], p: (Float, Float)) -> bool {
    let n = px.len();

    if n < 3 || py.len() != n {
        return false;
    }

    let first_sign = cross_sign(
        px[0] - px[n - 1],
        py[0] - py[n - 1],
        px[n - 1] - p.0,
        py[n - 1] - p.1,
    );

    for k in 0..n - 1 {
        let edge_sign = cross_sign(
            px[k + 1] - px[k],
            py[k + 1] - py[k],
            px[k] - p.0,
            py[k] - p.1,
        );

        if edge_sign * first_sign < 0.0 {
            return false;
        }
    }

    true
}

/// Finds the cell of a logically rectangular mesh containing the point.
///
/// `mesh_x` and `mesh_y` hold cell corners, so a mesh of shape `(n0, n1)`
/// has `(n0 - 1) * (n1 - 1)` cells. The returned `(a, b)` indexes the
/// corner `[a, b]` with lowest indices of the containing cell,
/// which is also the index of that cell in cell-centred arrays.
///
/// The search recursively bisects the index space into quadrants
/// and discards every quadrant whose bounding box (computed from its
/// edges) does not contain the point. The last remaining cell is
/// confirmed with a convex polygon test.
pub fn find_point_in_mesh<'a>(
    mesh_x: ArrayView2<'a, Float>,
    mesh_y: ArrayView2<'a, Float>,
    point_x: Float,
    point_y: Float,
) -> Option<(usize, usize)> {
    let (n0, n1) = mesh_x.dim();

    if n0 < 2 || n1 < 2 || mesh_y.dim() != (n0, n1) {
        return None;
    }

    let mesh = Mesh {
        x: mesh_x,
        y: mesh_y,
        p: (point_x, point_y),
    };

    mesh.recur((0, 0), (n0 - 1, n1 - 1))
}

struct Mesh<'a> {
    x: ArrayView2<'a, Float>,
    y: ArrayView2<'a, Float>,
    p: (Float, Float),
}

impl<'a> Mesh<'a> {
    fn edges_range(field: &ArrayView2<Float>, ij00: (usize, usize), ij22: (usize, usize)) -> (Float, Float) {
        let (i0, j0) = ij00;
        let (i2, j2) = ij22;

        let edges = [
            field.slice(s![i0, j0..=j2]),
            field.slice(s![i2, j0..=j2]),
            field.slice(s![i0..=i2, j0]),
            field.slice(s![i0..=i2, j2]),
        ];

        edges
            .iter()
            .flat_map(|edge| edge.iter())
            .fold((Float::INFINITY, Float::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }

    fn outside_bounding_box(&self, ij00: (usize, usize), ij22: (usize, usize)) -> bool {
        let (xmin, xmax) = Self::edges_range(&self.x, ij00, ij22);
        let (ymin, ymax) = Self::edges_range(&self.y, ij00, ij22);

        self.p.0 < xmin || self.p.0 > xmax || self.p.1 < ymin || self.p.1 > ymax
    }

    fn recur(&self, ij00: (usize, usize), ij22: (usize, usize)) -> Option<(usize, usize)> {
        let (i0, j0) = ij00;
        let (i2, j2) = ij22;

        if self.outside_bounding_box(ij00, ij22) {
            return None;
        }

        let i1 = (i0 + i2) / 2;
        let j1 = (j0 + j2) / 2;

        match (i2 > i0 + 1, j2 > j0 + 1) {
            (true, true) => self
                .recur((i0, j0), (i1, j1))
                .or_else(|| self.recur((i1, j1), (i2, j2)))
                .or_else(|| self.recur((i0, j1), (i1, j2)))
                .or_else(|| self.recur((i1, j0), (i2, j1))),
            (true, false) => self
                .recur((i0, j0), (i1, j2))
                .or_else(|| self.recur((i1, j0), (i2, j2))),
            (false, true) => self
                .recur((i0, j0), (i2, j1))
                .or_else(|| self.recur((i0, j1), (i2, j2))),
            (false, false) => {
                let px = [
                    self.x[[i0, j0]],
                    self.x[[i0 + 1, j0]],
                    self.x[[i0 + 1, j0 + 1]],
                    self.x[[i0, j0 + 1]],
                ];
                let py = [
                    self.y[[i0, j0]],
                    self.y[[i0 + 1, j0]],
                    self.y[[i0 + 1, j0 + 1]],
                    self.y[[i0, j0 + 1]],
                ];

                if is_point_in_convex_polygon(&px, &py, self.p) {
                    Some((i0, j0))
                } else {
                    None
                }
            }
        }
    }
}
