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

//! Module with the "ice 9" flood fill used to find
//! connected ocean regions.

use super::search::nearest_ji;
use crate::Float;
use ndarray::{Array2, ArrayView2, Zip};
use rustc_hash::FxHashSet;

/// Iterative (stack based) implementation of "ice 9".
///
/// The flood starts at `[j, i]` and treats any positive value
/// of `source` as passable. Zero and negative values block flooding.
///
/// With `xcyclic` the first and last columns are neighbours.
/// With `tripolar` stepping north from the top row folds back
/// onto the same row at `ni - 1 - i`.
///
/// Returns an array of zeros and ones.
pub fn ice9(
    i: usize,
    j: usize,
    source: ArrayView2<Float>,
    xcyclic: bool,
    tripolar: bool,
) -> Array2<Float> {
    let (nj, ni) = source.dim();
    let mut wet_mask = Array2::<Float>::zeros((nj, ni));

    if j >= nj || i >= ni {
        return wet_mask;
    }

    let mut stack = vec![(j, i)];
    let mut queued = FxHashSet::default();
    queued.insert((j, i));

    while let Some((j, i)) = stack.pop() {
        queued.remove(&(j, i));

        if wet_mask[[j, i]] > 0.0 || source[[j, i]] <= 0.0 {
            continue;
        }

        wet_mask[[j, i]] = 1.0;

        let mut neighbours = Vec::with_capacity(4);

        if i > 0 {
            neighbours.push((j, i - 1));
        } else if xcyclic {
            neighbours.push((j, ni - 1));
        }

        if i < ni - 1 {
            neighbours.push((j, i + 1));
        } else if xcyclic {
            neighbours.push((j, 0));
        }

        if j > 0 {
            neighbours.push((j - 1, i));
        }

        if j < nj - 1 {
            neighbours.push((j + 1, i));
        } else if tripolar {
            neighbours.push((j, ni - 1 - i));
        }

        for cell in neighbours {
            if wet_mask[cell] == 0.0 && queued.insert(cell) {
                stack.push(cell);
            }
        }
    }

    wet_mask
}

/// Flood fill seeded at the cell with centre nearest to `xy0`
/// on a global (cyclic and tripolar) grid.
pub fn ice9_from_coord(
    x: ArrayView2<Float>,
    y: ArrayView2<Float>,
    source: ArrayView2<Float>,
    xy0: (Float, Float),
) -> Array2<Float> {
    let (j, i) = nearest_ji(x, y, xy0);
    ice9(i, j, source, true, true)
}

/// Flood fill through cells below sea level (negative height)
/// used when editing topography stored as heights.
pub fn ice9_below_sea_level(i: usize, j: usize, height: ArrayView2<Float>) -> Array2<Float> {
    let passable = height.mapv(|h| if h < 0.0 { 1.0 } else { 0.0 });
    ice9(i, j, passable.view(), true, false)
}

/// Generates a "wet mask" for a z-coordinate model based on relative
/// location of the ocean bottom to the upper interface of the cell.
///
/// `depth` is positive downward and `z_cell_top` is the (negative)
/// position of the upper interface of the cell.
pub fn mask_from_depth(depth: ArrayView2<Float>, z_cell_top: Float) -> Array2<Float> {
    let mut wet = Array2::<Float>::zeros(depth.dim());

    Zip::from(&mut wet).and(&depth).for_each(|w, &d| {
        if d > -z_cell_top {
            *w = 1.0;
        }
    });

    wet
}

#[cfg(test)]
mod tests {
    use super::{ice9, ice9_below_sea_level, mask_from_depth};
    use ndarray::array;

    #[test]
    fn flood_stops_at_land() {
        let source = array![
            [1.0, 1.0, 0.0, 1.0],
            [1.0, 0.0, 0.0, 1.0],
            [1.0, 1.0, 0.0, 1.0]
        ];

        let wet = ice9(0, 0, source.view(), false, false);

        assert_eq!(
            wet,
            array![
                [1.0, 1.0, 0.0, 0.0],
                [1.0, 0.0, 0.0, 0.0],
                [1.0, 1.0, 0.0, 0.0]
            ]
        );
    }

    #[test]
    fn flood_wraps_when_cyclic() {
        let source = array![[1.0, 0.0, 1.0], [0.0, 0.0, 0.0]];

        let closed = ice9(0, 0, source.view(), false, false);
        let cyclic = ice9(0, 0, source.view(), true, false);

        assert_eq!(closed.sum(), 1.0);
        assert_eq!(cyclic, array![[1.0, 0.0, 1.0], [0.0, 0.0, 0.0]]);
    }

    #[test]
    fn flood_folds_across_tripolar_edge() {
        // top row cells at i=0 and i=3 are joined only by the fold
        let source = array![
            [0.0, 0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0, 1.0]
        ];

        let flat = ice9(0, 1, source.view(), false, false);
        let folded = ice9(0, 1, source.view(), false, true);

        assert_eq!(flat.sum(), 1.0);
        assert_eq!(folded.sum(), 2.0);
        assert_eq!(folded[[1, 3]], 1.0);
    }

    #[test]
    fn seed_on_land_gives_empty_mask() {
        let source = array![[0.0, 1.0], [1.0, 1.0]];
        let wet = ice9(0, 0, source.view(), true, true);

        assert_eq!(wet.sum(), 0.0);
    }

    #[test]
    fn seed_outside_grid_gives_empty_mask() {
        let source = array![[1.0, 1.0]];
        let wet = ice9(5, 0, source.view(), true, true);

        assert_eq!(wet.sum(), 0.0);
    }

    #[test]
    fn below_sea_level_is_passable() {
        let height = array![[-10.0, 5.0, -3.0], [-1.0, 0.0, -2.0]];
        let wet = ice9_below_sea_level(0, 0, height.view());

        // connected through the cyclic boundary
        assert_eq!(wet, array![[1.0, 0.0, 1.0], [1.0, 0.0, 1.0]]);
    }

    #[test]
    fn depth_mask_uses_cell_top() {
        let depth = array![[0.0, 10.0, 50.0]];
        let wet = mask_from_depth(depth.view(), -10.0);

        assert_eq!(wet, array![[0.0, 0.0, 1.0]]);
    }
}
