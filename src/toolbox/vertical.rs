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

//! Module with vertical structure helpers: positions of model
//! interfaces, the seawater equation of state and vertical
//! transport diagnosed from horizontal convergence.

use crate::errors::{InputError, ToolboxError};
use crate::io::{self, Dataset};
use crate::Float;
use log::debug;
use ndarray::{Array1, Array3, Array4, ArrayView1, ArrayView2, ArrayView4, Axis, Ix1};

/// Returns 3D interface positions `(nk + 1, nj, ni)` for variable `var_name`.
///
/// Native interface heights `e` are used when present in the dataset.
/// Otherwise the vertical dimension of the variable is looked up and
/// the interface coordinate is taken from its `edges` attribute (or `zw`),
/// clipped to the ocean depth.
pub fn get_z(
    source: &Dataset,
    depth: ArrayView2<Float>,
    var_name: &str,
) -> Result<Array3<Float>, ToolboxError> {
    if source.has_variable("e") {
        match source.ndim("e")? {
            3 => {
                debug!("Using native interface heights");
                return Ok(io::into_3d(source.read("e")?)?);
            }
            4 => {
                debug!("Using first record of native interface heights");
                let e = source.read("e")?.index_axis_move(Axis(0), 0);
                return Ok(io::into_3d(e)?);
            }
            _ => (),
        }
    }

    if !source.has_variable(var_name) {
        return Err(InputError::MissingVariable(var_name.to_string()).into());
    }

    let dims = source.dimension_names(var_name)?;

    if dims.len() < 3 {
        return Err(ToolboxError::Shape(format!(
            "Variable \"{}\" must have 3 or more dimensions",
            var_name
        )));
    }

    let vdim = &dims[dims.len() - 3];

    if !source.has_variable(vdim) {
        return Err(ToolboxError::VerticalCoordinate(format!(
            "Variable \"{}\" should be a [CF] dimension variable but is missing",
            vdim
        )));
    }

    let zvar = match source.string_attribute(vdim, "edges") {
        Some(edges) => edges,
        None if source.has_variable("zw") => "zw".to_string(),
        None => {
            return Err(ToolboxError::VerticalCoordinate(format!(
                "Cannot figure out vertical coordinate from variable \"{}\"",
                var_name
            )))
        }
    };

    debug!("Building interfaces from {} clipped by depth", zvar);

    let zw = source
        .read(&zvar)?
        .into_dimensionality::<Ix1>()
        .map_err(|_| ToolboxError::Shape(format!("Variable \"{}\" was expected to be 1d", zvar)))?;

    Ok(interfaces_from_depth(zw.view(), depth))
}

/// `Z[k] = -min(depth, |zw[k]|)`
pub fn interfaces_from_depth(zw: ArrayView1<Float>, depth: ArrayView2<Float>) -> Array3<Float> {
    let (nj, ni) = depth.dim();

    Array3::from_shape_fn((zw.len(), nj, ni), |(k, j, i)| {
        -depth[[j, i]].min(zw[k].abs())
    })
}

/// Density of seawater \[kg m^-3\] from the equation of state of Wright (1997).
///
/// Salinity in PSU, potential temperature in degrees Celsius
/// and pressure in Pascals.
pub fn rho_wright97(salinity: Float, temperature: Float, pressure: Float) -> Float {
    let (s, t, p) = (salinity, temperature, pressure);

    let (a0, a1, a2) = (7.057924e-4, 3.480336e-7, -1.112733e-7);
    let (b0, b1, b2) = (5.790749e8, 3.516535e6, -4.002714e4);
    let (b3, b4, b5) = (2.084372e2, 5.944068e5, -9.643486e3);
    let (c0, c1, c2) = (1.704853e5, 7.904722e2, -7.984422);
    let (c3, c4, c5) = (5.140652e-2, -2.302158e2, -3.079464);

    let al0 = a0 + a1 * t + a2 * s;
    let p0 = b0 + b4 * s + t * (b1 + t * (b2 + b3 * t) + b5 * s);
    let lambda = c0 + c4 * s + t * (c1 + t * (c2 + c3 * t) + c5 * s);

    (p + p0) / (lambda + al0 * (p + p0))
}

/// Layer centres from interface positions along one column.
pub fn layer_centres(interfaces: ArrayView1<Float>) -> Array1<Float> {
    let n = interfaces.len().saturating_sub(1);
    Array1::from_shape_fn(n, |k| 0.5 * (interfaces[k] + interfaces[k + 1]))
}

/// Vertical transport at interfaces `(nt, nk + 1, nj, ni)` from the
/// convergence of horizontal transports `u` and `v` `(nt, nk, nj, ni)`,
/// integrated upwards from zero at the bottom.
///
/// `u` is on eastern and `v` on northern faces of cells. Without
/// `wrap_x` (`wrap_y`) nothing enters through the western (southern)
/// edge. Cells next to a missing transport are `NaN`, the bottom
/// interface takes the mask of the deepest layer.
pub fn w_from_convergence(
    u: ArrayView4<Float>,
    v: ArrayView4<Float>,
    wrap_x: bool,
    wrap_y: bool,
) -> Result<Array4<Float>, ToolboxError> {
    if u.dim() != v.dim() {
        return Err(ToolboxError::Shape(format!(
            "u of shape {:?} and v of shape {:?} must match",
            u.dim(),
            v.dim()
        )));
    }

    let (nt, nk, nj, ni) = u.dim();
    let mut w = Array4::zeros((nt, nk + 1, nj, ni));
    let filled = |x: Float| if x.is_nan() { 0.0 } else { x };

    for t in 0..nt {
        for j in 0..nj {
            let south = if j > 0 {
                Some(j - 1)
            } else if wrap_y {
                Some(nj - 1)
            } else {
                None
            };
            let rolled_j = (j + nj - 1) % nj;

            for i in 0..ni {
                let west = if i > 0 {
                    Some(i - 1)
                } else if wrap_x {
                    Some(ni - 1)
                } else {
                    None
                };
                let rolled_i = (i + ni - 1) % ni;

                let masked = |k: usize| {
                    u[[t, k, j, i]].is_nan()
                        || u[[t, k, j, rolled_i]].is_nan()
                        || v[[t, k, j, i]].is_nan()
                        || v[[t, k, rolled_j, i]].is_nan()
                };

                let mut total = 0.0;

                for k in (0..nk).rev() {
                    let inflow_x = west.map_or(0.0, |iw| filled(u[[t, k, j, iw]]));
                    let inflow_y = south.map_or(0.0, |js| filled(v[[t, k, js, i]]));
                    total += inflow_x - filled(u[[t, k, j, i]]) + inflow_y - filled(v[[t, k, j, i]]);

                    w[[t, k, j, i]] = if masked(k) { Float::NAN } else { total };
                }

                if nk > 0 && masked(nk - 1) {
                    w[[t, nk, j, i]] = Float::NAN;
                }
            }
        }
    }

    Ok(w)
}

#[cfg(test)]
mod tests {
    use super::{interfaces_from_depth, layer_centres, rho_wright97, w_from_convergence};
    use float_cmp::approx_eq;
    use ndarray::{array, s, Array4};

    #[test]
    fn interfaces_clipped_by_depth() {
        let zw = array![0.0, 10.0, 50.0, 200.0];
        let depth = array![[0.0, 30.0, 500.0]];

        let z = interfaces_from_depth(zw.view(), depth.view());

        assert_eq!(z.dim(), (4, 1, 3));
        assert_eq!(z.slice(s![.., 0, 2]).to_vec(), vec![-0.0, -10.0, -50.0, -200.0]);
        assert_eq!(z[[3, 0, 1]], -30.0);
        assert_eq!(z[[2, 0, 0]], -0.0);
    }

    #[test]
    fn wright_density_reference_values() {
        // fresh-ish water at surface is close to 1000
        let rho_fresh = rho_wright97(0.0, 4.0, 0.0);
        assert!((rho_fresh - 1000.0).abs() < 1.0);

        let rho_sea = rho_wright97(35.0, 10.0, 0.0);
        assert!(rho_sea > 1025.0 && rho_sea < 1029.0);

        // compression increases density
        assert!(rho_wright97(35.0, 10.0, 2.0e7) > rho_sea);
    }

    #[test]
    fn centres_between_interfaces() {
        let c = layer_centres(array![0.0, -10.0, -30.0].view());
        assert!(approx_eq!(f64, c[0], -5.0, ulps = 2));
        assert!(approx_eq!(f64, c[1], -20.0, ulps = 2));
    }

    #[test]
    fn w_integrated_from_the_bottom() {
        let mut u = Array4::zeros((1, 2, 1, 3));
        u.slice_mut(s![0, 0, 0, ..]).assign(&array![1.0, 2.0, 4.0]);
        u.slice_mut(s![0, 1, 0, ..]).fill(1.0);
        let v = Array4::zeros((1, 2, 1, 3));

        let w = w_from_convergence(u.view(), v.view(), true, false).unwrap();
        assert_eq!(w.slice(s![0, 0, 0, ..]).to_vec(), vec![3.0, -1.0, -2.0]);
        assert_eq!(w.slice(s![0, 1, 0, ..]).to_vec(), vec![0.0, 0.0, 0.0]);
        assert_eq!(w.slice(s![0, 2, 0, ..]).to_vec(), vec![0.0, 0.0, 0.0]);

        // closed western edge
        let w = w_from_convergence(u.view(), v.view(), false, false).unwrap();
        assert_eq!(w[[0, 1, 0, 0]], -1.0);
        assert_eq!(w[[0, 0, 0, 0]], -2.0);

        assert!(w_from_convergence(u.view(), Array4::zeros((1, 1, 1, 3)).view(), true, false).is_err());
    }

    #[test]
    fn w_masked_next_to_missing_transport() {
        let mut u = Array4::zeros((1, 2, 1, 3));
        u.slice_mut(s![0, 0, 0, ..]).assign(&array![1.0, 2.0, 4.0]);
        u.slice_mut(s![0, 1, 0, ..]).fill(1.0);
        u[[0, 1, 0, 1]] = f64::NAN;
        let v = Array4::zeros((1, 2, 1, 3));

        let w = w_from_convergence(u.view(), v.view(), true, false).unwrap();

        assert_eq!(w.slice(s![0, 0, 0, ..]).to_vec(), vec![3.0, 0.0, -3.0]);
        assert_eq!(w[[0, 1, 0, 0]], 0.0);
        assert!(w[[0, 1, 0, 1]].is_nan() && w[[0, 1, 0, 2]].is_nan());
        assert_eq!(w[[0, 2, 0, 0]], 0.0);
        assert!(w[[0, 2, 0, 2]].is_nan());
    }

    #[test]
    fn w_from_meridional_inflow() {
        // one layer, two rows, flow into the first row from the south
        let u = Array4::zeros((1, 1, 2, 1));
        let v = Array4::from_shape_vec((1, 1, 2, 1), vec![0.0, 5.0]).unwrap();

        let closed = w_from_convergence(u.view(), v.view(), true, false).unwrap();
        assert_eq!(closed[[0, 0, 0, 0]], 0.0);
        assert_eq!(closed[[0, 0, 1, 0]], -5.0);

        let periodic = w_from_convergence(u.view(), v.view(), true, true).unwrap();
        assert_eq!(periodic[[0, 0, 0, 0]], 5.0);
    }
}
