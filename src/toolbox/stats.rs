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

//! Weighted statistics of model fields.
//!
//! Missing points are represented by `NaN` and get zero weight.

use crate::errors::ToolboxError;
use crate::Float;
use ndarray::{Array2, ArrayView, ArrayView1, ArrayView2, ArrayView3, Dimension, Zip};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldStats {
    pub min: Float,
    pub max: Float,
    pub mean: Option<Float>,
    pub std: Option<Float>,
    pub rms: Option<Float>,
}

impl fmt::Display for FieldStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "min={:.5} max={:.5}", self.min, self.max)?;

        if let (Some(mean), Some(std), Some(rms)) = (self.mean, self.std, self.rms) {
            write!(f, " mean={:.5} sd={:.5} rms={:.5}", mean, std, rms)?;
        }

        Ok(())
    }
}

/// Min, max and, when weights are given, weighted mean,
/// standard deviation and root-mean-square of `s`.
pub fn area_weighted_stats<D: Dimension>(
    s: ArrayView<Float, D>,
    area: Option<ArrayView<Float, D>>,
) -> FieldStats {
    let (min, max) = s
        .iter()
        .filter(|v| !v.is_nan())
        .fold((Float::NAN, Float::NAN), |(lo, hi), &v| (lo.min(v), hi.max(v)));

    let mut stats = FieldStats {
        min,
        max,
        mean: None,
        std: None,
        rms: None,
    };

    let area = match area {
        Some(area) => area,
        None => return stats,
    };

    let weight = |w: Float, v: Float| if v.is_nan() { 0.0 } else { w };

    let (sum_area, sum_s, sum_s2) = Zip::from(&s).and(&area).fold(
        (0.0, 0.0, 0.0),
        |(sa, ss, ss2), &v, &w| {
            let w = weight(w, v);
            if w == 0.0 {
                (sa, ss, ss2)
            } else {
                (sa + w, ss + w * v, ss2 + w * v * v)
            }
        },
    );

    let mean = sum_s / sum_area;

    let variance = Zip::from(&s).and(&area).fold(0.0, |acc, &v, &w| {
        let w = weight(w, v);
        if w == 0.0 {
            acc
        } else {
            acc + w * (v - mean).powi(2)
        }
    }) / sum_area;

    stats.mean = Some(mean);
    stats.std = Some(variance.sqrt());
    stats.rms = Some((sum_s2 / sum_area).sqrt());

    stats
}

/// Weights for statistics of a vertical section: column width
/// times layer thickness, from column edges `y` of length `nj + 1`
/// and interface elevations `z` of shape `(nk + 1, nj)`.
pub fn section_weight(y: ArrayView1<Float>, z: ArrayView2<Float>) -> Array2<Float> {
    let (nk1, nj) = z.dim();
    let nk = nk1.saturating_sub(1);

    Array2::from_shape_fn((nk, nj), |(k, j)| {
        (y[j + 1] - y[j]) * (z[[k, j]] - z[[k + 1, j]])
    })
}

/// Volume weighted zonal average of `field` `(nk, nj, ni)` between
/// interfaces `eta` `(nk + 1, nj, ni)` within the `mask`.
///
/// Returns the average `(nk, nj)` and the interfaces `(nk + 1, nj)`,
/// the deepest masked interface along each row. Rows without any
/// volume have `NaN` average.
pub fn zonal_average(
    field: ArrayView3<Float>,
    eta: ArrayView3<Float>,
    area: ArrayView2<Float>,
    mask: ArrayView2<Float>,
) -> Result<(Array2<Float>, Array2<Float>), ToolboxError> {
    let (nk, nj, ni) = field.dim();

    if eta.dim() != (nk + 1, nj, ni) || area.dim() != (nj, ni) || mask.dim() != (nj, ni) {
        return Err(ToolboxError::Shape(format!(
            "field {:?} needs interfaces {:?} and area and mask {:?}, got {:?}, {:?} and {:?}",
            field.dim(),
            (nk + 1, nj, ni),
            (nj, ni),
            eta.dim(),
            area.dim(),
            mask.dim()
        )));
    }

    let average = Array2::from_shape_fn((nk, nj), |(k, j)| {
        let (sum, volume) = (0..ni).fold((0.0, 0.0), |(sum, volume), i| {
            let dv = mask[[j, i]] * area[[j, i]] * (eta[[k, j, i]] - eta[[k + 1, j, i]]);
            let q = field[[k, j, i]];

            if dv.is_nan() || q.is_nan() || dv == 0.0 {
                (sum, volume)
            } else {
                (sum + dv * q, volume + dv)
            }
        });

        if volume > 0.0 {
            sum / volume
        } else {
            Float::NAN
        }
    });

    let interfaces = Array2::from_shape_fn((nk + 1, nj), |(k, j)| {
        (0..ni)
            .map(|i| mask[[j, i]] * eta[[k, j, i]])
            .filter(|z| !z.is_nan())
            .fold(Float::NAN, Float::min)
    });

    Ok((average, interfaces))
}

#[cfg(test)]
mod tests {
    use super::{area_weighted_stats, section_weight, zonal_average};
    use float_cmp::approx_eq;
    use ndarray::array;

    #[test]
    fn unweighted_gives_extremes_only() {
        let s = array![[1.0, -2.0], [f64::NAN, 4.0]];
        let stats = area_weighted_stats(s.view(), None);

        assert_eq!(stats.min, -2.0);
        assert_eq!(stats.max, 4.0);
        assert!(stats.mean.is_none());
        assert!(stats.rms.is_none());
    }

    #[test]
    fn weighted_moments() {
        let s = array![[1.0, 3.0], [f64::NAN, 100.0]];
        let area = array![[1.0, 1.0], [5.0, 0.0]];

        let stats = area_weighted_stats(s.view(), Some(area.view()));

        assert!(approx_eq!(f64, stats.mean.unwrap(), 2.0, ulps = 2));
        assert!(approx_eq!(f64, stats.std.unwrap(), 1.0, ulps = 2));
        assert!(approx_eq!(f64, stats.rms.unwrap(), 5.0_f64.sqrt(), ulps = 2));
        assert_eq!(stats.max, 100.0);
    }

    #[test]
    fn section_weights_are_cell_areas() {
        let y = array![0.0, 1.0, 3.0];
        let z = array![[0.0, 0.0], [-10.0, -5.0]];

        assert_eq!(section_weight(y.view(), z.view()), array![[10.0, 10.0]]);
    }

    #[test]
    fn zonal_average_by_volume() {
        // one layer, first row with a thick and a thin column
        let field = array![[[1.0, 4.0], [2.0, f64::NAN]]];
        let eta = array![[[0.0, 0.0], [0.0, 0.0]], [[-30.0, -10.0], [-50.0, -50.0]]];
        let area = array![[1.0, 2.0], [1.0, 1.0]];
        let mask = array![[1.0, 1.0], [1.0, 0.0]];

        let (average, z) = zonal_average(field.view(), eta.view(), area.view(), mask.view()).unwrap();

        assert!(approx_eq!(f64, average[[0, 0]], 2.2, epsilon = 1.0e-12));
        assert_eq!(average[[0, 1]], 2.0);
        assert_eq!(z, array![[0.0, 0.0], [-30.0, -50.0]]);

        let empty = array![[0.0, 0.0], [0.0, 0.0]];
        let (average, _) = zonal_average(field.view(), eta.view(), area.view(), empty.view()).unwrap();
        assert!(average.iter().all(|v| v.is_nan()));

        assert!(zonal_average(field.view(), field.view(), area.view(), mask.view()).is_err());
    }
}
