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

//! Annual mean surface eddy kinetic energy from daily
//! surface velocities.

use super::{add_stats_attributes, with_missing};
use crate::constants::MISSING_VALUE;
use crate::errors::{InputError, ToolError};
use crate::io::{self, write, Dataset};
use crate::toolbox::stats::{area_weighted_stats, FieldStats};
use crate::Float;
use log::info;
use ndarray::{Array2, ArrayView2, ArrayView3, Axis};
use std::path::{Path, PathBuf};

pub const OUTPUT_FILE: &str = "EKE_mean.nc";

/// Conversion of m2 s-2 to cm2 s-2
const M2_TO_CM2: Float = 1.0e4;

/// Lower bound of the energy before taking its logarithm (cm2 s-2)
const EKE_FLOOR: Float = 1.0e-8;

/// Time mean of `0.5 (u - mean(u))^2` for `(time, j, i)` velocity.
pub fn eddy_energy(velocity: ArrayView3<Float>) -> Result<Array2<Float>, InputError> {
    let empty = || InputError::Mismatch("velocity has no records".to_string());
    let mean = velocity.mean_axis(Axis(0)).ok_or_else(empty)?;

    let anomaly = &velocity - &mean;
    anomaly.mapv(|v| 0.5 * v * v).mean_axis(Axis(0)).ok_or_else(empty)
}

/// Average of neighbours along `axis`, the first one taking the last,
/// moving u-points (`axis` 1) or v-points (`axis` 0) to cell centres.
fn to_centres(field: ArrayView2<Float>, axis: usize) -> Array2<Float> {
    let n = field.len_of(Axis(axis));

    Array2::from_shape_fn(field.dim(), |(j, i)| {
        let previous = match axis {
            0 => field[[(j + n - 1) % n, i]],
            _ => field[[j, (i + n - 1) % n]],
        };
        0.5 * (field[[j, i]] + previous)
    })
}

/// Natural logarithm of the eddy kinetic energy in (cm/s)^2
/// at cell centres.
pub fn log_eke(ssu: ArrayView3<Float>, ssv: ArrayView3<Float>) -> Result<Array2<Float>, InputError> {
    if ssu.dim() != ssv.dim() {
        return Err(InputError::Mismatch(format!(
            "ssu of shape {:?} and ssv of shape {:?}",
            ssu.dim(),
            ssv.dim()
        )));
    }

    let eke_u = to_centres(eddy_energy(ssu)?.view(), 1);
    let eke_v = to_centres(eddy_energy(ssv)?.view(), 0);

    Ok((eke_u + eke_v).mapv(|e| (M2_TO_CM2 * e).max(EKE_FLOOR).ln()))
}

/// Cell centres, mask and area of the ocean static file.
#[derive(Clone, Debug)]
pub struct StaticGrid {
    pub geolon: Array2<Float>,
    pub geolat: Array2<Float>,
    /// Ocean cell area, zero on land.
    pub area: Array2<Float>,
}

impl StaticGrid {
    pub fn read(path: &Path) -> Result<Self, InputError> {
        let file = io::open(path)?;
        let wet = io::read_filled(&file, "wet", 0.0).and_then(io::into_2d)?;
        let area = io::read_filled(&file, "area_t", 0.0).and_then(io::into_2d)?;

        if wet.dim() != area.dim() {
            return Err(InputError::Mismatch(format!(
                "wet {:?} and area_t {:?}",
                wet.dim(),
                area.dim()
            )));
        }

        Ok(StaticGrid {
            geolon: io::read_2d(&file, "geolon")?,
            geolat: io::read_2d(&file, "geolat")?,
            area: wet * area,
        })
    }
}

#[derive(Clone, Debug)]
pub struct EddyEnergy {
    pub log_eke: Array2<Float>,
    pub stats: FieldStats,
}

/// Computes the log of annual mean EKE from daily `ssu` and `ssv`
/// and writes it into `out_dir`.
pub fn run_eke(files: &[PathBuf], static_file: &Path, out_dir: &Path) -> Result<EddyEnergy, ToolError> {
    let source = Dataset::open_all(files)?;
    let grid = StaticGrid::read(static_file)?;

    let ssu = io::into_3d(source.read_filled("ssu", Float::NAN)?)?;
    let ssv = io::into_3d(source.read_filled("ssv", Float::NAN)?)?;

    let log_eke = log_eke(ssu.view(), ssv.view())?;

    if log_eke.dim() != grid.area.dim() {
        return Err(InputError::Mismatch(format!(
            "EKE of shape {:?} does not match static grid {:?}",
            log_eke.dim(),
            grid.area.dim()
        ))
        .into());
    }

    let stats = area_weighted_stats(log_eke.view(), Some(grid.area.view()));
    info!("Log of EKE: {}", stats);

    let result = EddyEnergy { log_eke, stats };
    result.write(&out_dir.join(OUTPUT_FILE), &grid, &source.title())?;

    Ok(result)
}

impl EddyEnergy {
    pub fn write(&self, path: &Path, grid: &StaticGrid, title: &str) -> Result<(), InputError> {
        let (nj, ni) = self.log_eke.dim();

        let mut file = write::create(path)?;
        file.add_attribute("title", title)?;
        file.add_attribute("history", write::history_entry("computed eddy kinetic energy").as_str())?;
        add_stats_attributes(&mut file, "log_eke", &self.stats)?;

        file.add_dimension("yh", nj)?;
        file.add_dimension("xh", ni)?;
        let dims = ["yh", "xh"];

        write::put_float(
            &mut file,
            "geolon",
            &dims,
            grid.geolon.view(),
            &[("long_name", "Longitude of cell centre"), ("units", "degrees_east")],
        )?;
        write::put_float(
            &mut file,
            "geolat",
            &dims,
            grid.geolat.view(),
            &[("long_name", "Latitude of cell centre"), ("units", "degrees_north")],
        )?;
        write::put_float32_with_fill(
            &mut file,
            "log_eke",
            &dims,
            with_missing(&self.log_eke).view(),
            MISSING_VALUE,
            &[
                ("long_name", "Log of eddy kinetic energy annual mean"),
                ("units", "ln((cm/s)^2)"),
                ("coordinates", "geolon geolat"),
            ],
        )?;

        Ok(())
    }
}
