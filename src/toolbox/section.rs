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

//! Module with reconstruction of vertical sections
//! into quadrilateral meshes ready for plotting.

use crate::constants::PERIODIC_TOLERANCE;
use crate::errors::ToolboxError;
use crate::Float;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use std::str::FromStr;

/// How the interfaces between layers are drawn.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Representation {
    /// Step-wise, appropriate for z-coordinate models.
    Pcm,
    /// Piecewise-linear, representative of general-coordinate models.
    Plm,
    /// Linear interpolation, not conservative.
    Linear,
}

impl FromStr for Representation {
    type Err = ToolboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pcm" => Ok(Representation::Pcm),
            "plm" => Ok(Representation::Plm),
            "linear" => Ok(Representation::Linear),
            _ => Err(ToolboxError::UnknownRepresentation(s.to_string())),
        }
    }
}

/// Coordinates and values of a quadrilateral mesh.
#[derive(Clone, Debug)]
pub struct QuadMesh {
    pub x: Array1<Float>,
    pub z: Array2<Float>,
    pub q: Array2<Float>,
}

/// Creates quadmesh coordinates for a scalar `q` of shape `(nk, ni)`
/// at horizontal positions `x` of length `ni + 1` and between
/// interfaces `z` of shape `(nk + 1, ni)`.
///
/// Missing (`NaN`) interfaces are placed at 0 and missing values
/// of `q` take the minimum of `q`, so that cells next to land
/// keep a value in the mesh.
pub fn section2quadmesh(
    x: ArrayView1<Float>,
    z: ArrayView2<Float>,
    q: ArrayView2<Float>,
    representation: Representation,
) -> Result<QuadMesh, ToolboxError> {
    let (qnk, qni) = q.dim();
    let (znk, zni) = z.dim();
    let xni = x.len();

    if zni != qni {
        return Err(ToolboxError::Shape(
            "The last dimension of z and q must be equal in length".to_string(),
        ));
    }

    if znk != qnk + 1 {
        return Err(ToolboxError::Shape(format!(
            "The first dimension of z must be 1 longer than that of q. q has {} levels",
            qnk
        )));
    }

    if xni != qni + 1 {
        return Err(ToolboxError::Shape(
            "The length of x must 1 longer than the last dimension of q".to_string(),
        ));
    }

    if qni == 0 {
        return Err(ToolboxError::Shape("Section has no columns".to_string()));
    }

    let z = z.mapv(|v| if v.is_nan() { 0.0 } else { v });
    let qmin = q.iter().copied().filter(|v| !v.is_nan()).fold(Float::NAN, Float::min);
    let q = q.mapv(|v| if v.is_nan() { qmin } else { v });

    let periodic = ((x[xni - 1] - x[0]) - 360.0).abs() < PERIODIC_TOLERANCE;

    let mesh = match representation {
        Representation::Pcm => QuadMesh {
            x: stepwise_x(x, qni),
            z: Array2::from_shape_fn((znk, 2 * qni), |(k, n)| z[[k, n / 2]]),
            q: stepwise_q(q.view()),
        },
        Representation::Linear => {
            let xs = Array1::from_shape_fn(2 * qni + 1, |n| {
                if n % 2 == 0 {
                    x[n / 2]
                } else {
                    0.5 * (x[n / 2] + x[n / 2 + 1])
                }
            });

            let zs = Array2::from_shape_fn((znk, 2 * qni + 1), |(k, n)| {
                if n == 0 {
                    z[[k, 0]]
                } else if n == 2 * qni {
                    z[[k, qni - 1]]
                } else if n % 2 == 1 {
                    z[[k, n / 2]]
                } else {
                    0.5 * (z[[k, n / 2 - 1]] + z[[k, n / 2]])
                }
            });

            let qs = Array2::from_shape_fn((qnk, 2 * qni), |(k, n)| q[[k, n / 2]]);

            QuadMesh { x: xs, z: zs, q: qs }
        }
        Representation::Plm => {
            let slope = plm_slope(z.view(), periodic);

            let zs = Array2::from_shape_fn((znk, 2 * qni), |(k, n)| {
                let half = 0.5 * slope[[k, n / 2]];
                if n % 2 == 0 {
                    z[[k, n / 2]] - half
                } else {
                    z[[k, n / 2]] + half
                }
            });

            QuadMesh {
                x: stepwise_x(x, qni),
                z: zs,
                q: stepwise_q(q.view()),
            }
        }
    };

    Ok(mesh)
}

fn stepwise_x(x: ArrayView1<Float>, ni: usize) -> Array1<Float> {
    Array1::from_shape_fn(2 * ni, |n| if n % 2 == 0 { x[n / 2] } else { x[n / 2 + 1] })
}

fn stepwise_q(q: ArrayView2<Float>) -> Array2<Float> {
    let (nk, ni) = q.dim();

    Array2::from_shape_fn((nk, 2 * ni - 1), |(k, n)| {
        if n % 2 == 0 {
            q[[k, n / 2]]
        } else {
            0.5 * (q[[k, n / 2]] + q[[k, n / 2 + 1]])
        }
    })
}

/// Limited slope of the piecewise-linear reconstruction of interfaces.
///
/// Differences are cyclic in the horizontal, but for a non-periodic
/// section the difference across the last column is zeroed.
fn plm_slope(z: ArrayView2<Float>, periodic: bool) -> Array2<Float> {
    let (nk, ni) = z.dim();

    // right-sided difference
    let mut dz = Array2::from_shape_fn((nk, ni), |(k, i)| z[[k, (i + 1) % ni]] - z[[k, i]]);

    if !periodic {
        dz.column_mut(ni - 1).fill(0.0);
    }

    Array2::from_shape_fn((nk, ni), |(k, i)| {
        let right = dz[[k, i]];
        let left = dz[[k, (i + ni - 1) % ni]];

        // flatten extrema
        if right * left <= 0.0 {
            return 0.0;
        }

        let centred = 0.5 * (right + left);
        centred.signum() * centred.abs().min(right.abs().min(left.abs()))
    })
}
