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

//! Meridional overturning streamfunction.
//!
//! The streamfunction is the zonal sum of meridional transport
//! integrated upwards from the ocean floor, so it is zero at the
//! bottom interface and has one more level than the transport.

use crate::constants::{KG_S_TO_SV, M3_S_TO_SV};
use crate::errors::{InputError, ToolError};
use crate::grid::GridSpec;
use crate::io::{self, write, Dataset};
use crate::toolbox::basins::{atlantic_arctic_mask, staggered_v_mask};
use crate::toolbox::vertical::get_z;
use crate::Float;
use log::{debug, info, warn};
use ndarray::{Array2, Array3, ArrayView1, ArrayView2, ArrayView3, ArrayView4};
use rayon::ThreadPool;
use std::fmt;
use std::path::{Path, PathBuf};

pub const GLOBAL_FILE: &str = "MOC_global.nc";
pub const ATLANTIC_FILE: &str = "MOC_Atlantic.nc";

/// Overturning streamfunction `(nk + 1, nj)` of transport `vh` `(nk, nj, ni)`
/// with optional v-point mask `(nj, ni)`.
pub fn moc_psi(vh: ArrayView3<Float>, vmask: Option<ArrayView2<Float>>) -> Array2<Float> {
    let (nk, nj, ni) = vh.dim();
    let mut psi = Array2::zeros((nk + 1, nj));

    for k in (1..=nk).rev() {
        for j in 0..nj {
            let flux: Float = (0..ni)
                .map(|i| {
                    let m = vmask.as_ref().map_or(1.0, |m| m[[j, i]]);
                    m * vh[[k - 1, j, i]]
                })
                .sum();

            psi[[k - 1, j]] = psi[[k, j]] - flux;
        }
    }

    psi
}

/// Overturning streamfunction `(nt, nk + 1, nj)` of transport `vmo` `(nt, nk, nj, ni)`
/// with missing points stored as `NaN`.
///
/// Only points where `mask` equals 1 contribute. Where a whole row of
/// a level has no valid point the result is `NaN`, the bottom interface
/// follows the validity of the deepest level.
pub fn moc_masked(vmo: ArrayView4<Float>, mask: Option<ArrayView2<Float>>) -> Array3<Float> {
    let (nt, nk, nj, ni) = vmo.dim();
    let mut psi = Array3::from_elem((nt, nk + 1, nj), Float::NAN);

    let inside = |j: usize, i: usize| mask.as_ref().map_or(true, |m| m[[j, i]] == 1.0);

    for t in 0..nt {
        for j in 0..nj {
            let mut running = 0.0;

            for k in (0..nk).rev() {
                let valid: Vec<Float> = (0..ni)
                    .filter(|&i| inside(j, i))
                    .map(|i| vmo[[t, k, j, i]])
                    .filter(|v| v.is_finite())
                    .collect();

                if k == nk - 1 && !valid.is_empty() {
                    psi[[t, nk, j]] = 0.0;
                }

                if valid.is_empty() {
                    continue;
                }

                running -= valid.iter().sum::<Float>();
                psi[[t, k, j]] = running;
            }
        }
    }

    psi
}

/// Latitude and depth limits of extremum search.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ExtremumWindow {
    pub min_lat: Float,
    pub max_lat: Float,
    /// Only points deeper than this (positive, in meters) are searched.
    pub min_depth: Float,
}

impl Default for ExtremumWindow {
    fn default() -> Self {
        ExtremumWindow {
            min_lat: -90.0,
            max_lat: 90.0,
            min_depth: 0.0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Extremum {
    pub y: Float,
    pub z: Float,
    pub value: Float,
}

impl fmt::Display for Extremum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} Sv at {:.2}N, {:.0} m", self.value, self.y, self.z)
    }
}

/// Finds the maximum (`mult = 1`) or minimum (`mult = -1`) of `psi`
/// inside the window. Row latitudes `y` have length `nj`,
/// `z` and `psi` have shape `(nk + 1, nj)`.
///
/// The reported point is the first one with value closest
/// to the extremum, searched over the whole field.
pub fn find_extremum(
    y: ArrayView1<Float>,
    z: ArrayView2<Float>,
    psi: ArrayView2<Float>,
    window: ExtremumWindow,
    mult: Float,
) -> Option<Extremum> {
    let mut extreme: Option<Float> = None;

    for ((k, j), &p) in psi.indexed_iter() {
        let inside = y[j] >= window.min_lat && y[j] <= window.max_lat && z[[k, j]] < -window.min_depth;

        if !inside || p.is_nan() {
            continue;
        }

        if extreme.map_or(true, |e| mult * p > e) {
            extreme = Some(mult * p);
        }
    }

    let target = mult * extreme?;

    let mut closest: Option<((usize, usize), Float)> = None;

    for ((k, j), &p) in psi.indexed_iter() {
        let distance = (p - target).abs();

        if !distance.is_nan() && closest.map_or(true, |(_, d)| distance < d) {
            closest = Some(((k, j), distance));
        }
    }

    let ((k, j), _) = closest?;

    Some(Extremum {
        y: y[j],
        z: z[[k, j]],
        value: psi[[k, j]],
    })
}

/// Shallowest bottom of each interface along rows, `min_i(mask * z)`.
fn zonal_min(z: ArrayView3<Float>, mask: Option<ArrayView2<Float>>) -> Array2<Float> {
    let (nk1, nj, ni) = z.dim();

    Array2::from_shape_fn((nk1, nj), |(k, j)| {
        (0..ni)
            .map(|i| mask.as_ref().map_or(1.0, |m| m[[j, i]]) * z[[k, j, i]])
            .fold(Float::INFINITY, Float::min)
    })
}

/// Streamfunction of one basin ready to be written.
#[derive(Clone, Debug)]
pub struct Overturning {
    pub name: &'static str,
    pub yq: Vec<Float>,
    pub z: Array2<Float>,
    pub psi: Array2<Float>,
}

impl Overturning {
    /// Searches extrema in each window, with `mult` as in [`find_extremum`].
    pub fn extrema(&self, windows: &[(&'static str, ExtremumWindow, Float)]) -> Vec<(&'static str, Option<Extremum>)> {
        let yq = ArrayView1::from(&self.yq);

        windows
            .iter()
            .map(|(label, window, mult)| {
                (
                    *label,
                    find_extremum(yq, self.z.view(), self.psi.view(), *window, *mult),
                )
            })
            .collect()
    }

    pub fn write(&self, path: &Path, title: &str) -> Result<(), InputError> {
        let (nk1, nj) = self.psi.dim();

        let mut file = write::create(path)?;
        file.add_attribute("title", format!("{} {} MOC", title, self.name).trim())?;
        file.add_attribute("history", write::history_entry("computed overturning").as_str())?;
        file.add_dimension("zi", nk1)?;
        file.add_dimension("yq", nj)?;

        write::put_float(
            &mut file,
            "yq",
            &["yq"],
            ArrayView1::from(&self.yq),
            &[("long_name", "Latitude of northern cell face"), ("units", "degrees_north")],
        )?;
        write::put_float(
            &mut file,
            "z",
            &["zi", "yq"],
            self.z.view(),
            &[("long_name", "Elevation"), ("units", "m")],
        )?;
        write::put_float(
            &mut file,
            "psi",
            &["zi", "yq"],
            self.psi.view(),
            &[
                ("long_name", "Meridional overturning streamfunction"),
                ("units", "Sv"),
                ("coordinates", "z yq"),
            ],
        )?;

        Ok(())
    }
}

const GLOBAL_EXTREMA: [(&str, ExtremumWindow, Float); 3] = [
    (
        "Southern Ocean maximum",
        ExtremumWindow {
            min_lat: -90.0,
            max_lat: -30.0,
            min_depth: 0.0,
        },
        1.0,
    ),
    (
        "Northern Hemisphere maximum",
        ExtremumWindow {
            min_lat: 25.0,
            max_lat: 90.0,
            min_depth: 0.0,
        },
        1.0,
    ),
    (
        "Abyssal minimum",
        ExtremumWindow {
            min_lat: -90.0,
            max_lat: 90.0,
            min_depth: 2000.0,
        },
        -1.0,
    ),
];

const ATLANTIC_EXTREMA: [(&str, ExtremumWindow, Float); 4] = [
    (
        "RAPID (26.5N)",
        ExtremumWindow {
            min_lat: 26.5,
            max_lat: 27.0,
            min_depth: 0.0,
        },
        1.0,
    ),
    (
        "South of 33S",
        ExtremumWindow {
            min_lat: -90.0,
            max_lat: -33.0,
            min_depth: 0.0,
        },
        1.0,
    ),
    (
        "Overall maximum",
        ExtremumWindow {
            min_lat: -90.0,
            max_lat: 90.0,
            min_depth: 0.0,
        },
        1.0,
    ),
    (
        "North of 5N",
        ExtremumWindow {
            min_lat: 5.0,
            max_lat: 90.0,
            min_depth: 0.0,
        },
        1.0,
    ),
];

/// Computes global and Atlantic overturning from annual mean `vh` or `vmo`
/// and writes them into `out_dir`.
pub fn run_moc(
    files: &[PathBuf],
    grid: &GridSpec,
    out_dir: &Path,
    pool: &ThreadPool,
) -> Result<(Overturning, Overturning), ToolError> {
    let source = Dataset::open_all(files)?;

    let var_name = ["vh", "vmo"]
        .into_iter()
        .find(|v| source.has_variable(v))
        .ok_or_else(|| {
            InputError::MissingVariable(format!(
                "vh or vmo in {}",
                source.first_path().display()
            ))
        })?;

    // without zw the transport is assumed to be in m3/s
    let factor = if source.has_variable("zw") {
        KG_S_TO_SV
    } else {
        M3_S_TO_SV
    };

    debug!("Using {} with conversion factor {:e}", var_name, factor);

    let mut vh = source.read_filled(var_name, 0.0)?;
    if vh.ndim() == 4 {
        debug!("Averaging {} over {} records", var_name, vh.shape()[0]);
        vh = io::time_mean(&vh)?;
    }
    let vh = io::into_3d(vh)?;

    let zmod = get_z(&source, grid.depth.view(), var_name)?;
    let yq = grid.northern_face_latitude();

    if vh.dim().1 != yq.len() {
        return Err(InputError::Mismatch(format!(
            "{} has {} rows but the grid has {}",
            var_name,
            vh.dim().1,
            yq.len()
        ))
        .into());
    }

    let atlantic = atlantic_arctic_mask(grid.basin.view());
    let atlantic_v = staggered_v_mask(atlantic.view());

    let (global, atlantic) = pool.join(
        || Overturning {
            name: "Global",
            yq: yq.clone(),
            z: zonal_min(zmod.view(), None),
            psi: moc_psi(vh.view(), None) * factor,
        },
        || Overturning {
            name: "Atlantic",
            yq: yq.clone(),
            z: zonal_min(zmod.view(), Some(atlantic.view())),
            psi: moc_psi(vh.view(), Some(atlantic_v.view())) * factor,
        },
    );

    let title = source.title();

    for (moc, windows, file_name) in [
        (&global, &GLOBAL_EXTREMA[..], GLOBAL_FILE),
        (&atlantic, &ATLANTIC_EXTREMA[..], ATLANTIC_FILE),
    ] {
        for (label, extremum) in moc.extrema(windows) {
            match extremum {
                Some(e) => info!("{} MOC {}: {}", moc.name, label, e),
                None => warn!("{} MOC {}: no ocean points in the window", moc.name, label),
            }
        }

        moc.write(&out_dir.join(file_name), &title)?;
    }

    Ok((global, atlantic))
}
