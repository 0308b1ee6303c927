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

//! Model validation diagnostics computed from MOM6 output.
//!
//! Every diagnostic writes the fields or series it computes
//! into the output directory as NetCDF or CSV files.

pub mod bias;
pub mod drift;
pub mod eke;
pub mod heat_transport;
pub mod mld;
pub mod overturning;
pub mod refine;
pub mod transports;
pub mod variance;
pub mod vertical_section;
pub mod vertical_velocity;
pub mod zonal_bias;

use crate::constants::MISSING_VALUE;
use crate::errors::InputError;
use crate::io::{self, Dataset};
use crate::toolbox::stats::FieldStats;
use crate::Float;
use ndarray::{Array, Array3, ArrayBase, Data, Dimension};
use netcdf::FileMut;

/// First of `names` that is a variable of the source.
pub(crate) fn first_present<'n>(source: &Dataset, names: &[&'n str]) -> Result<&'n str, InputError> {
    names
        .iter()
        .copied()
        .find(|name| source.has_variable(name))
        .ok_or_else(|| {
            InputError::MissingVariable(format!(
                "{} in {}",
                names.join(" or "),
                source.first_path().display()
            ))
        })
}

/// Reads a `(k, j, i)` field, averaging over time
/// when it has a record dimension.
pub(crate) fn read_climatology(source: &Dataset, name: &str) -> Result<Array3<Float>, InputError> {
    let data = source.read_filled(name, Float::NAN)?;

    match data.ndim() {
        3 => io::into_3d(data),
        4 => io::into_3d(io::time_mean(&data)?),
        n => Err(InputError::Mismatch(format!(
            "{} has {} dimensions, (level, y, x) or (time, level, y, x) expected",
            name, n
        ))),
    }
}

/// Replaces `NaN` with [`MISSING_VALUE`] before writing.
pub(crate) fn with_missing<S, D>(data: &ArrayBase<S, D>) -> Array<Float, D>
where
    S: Data<Elem = Float>,
    D: Dimension,
{
    data.mapv(|v| if v.is_nan() { MISSING_VALUE } else { v })
}

/// Stores the statistics as global attributes `<prefix>_min` etc.
pub(crate) fn add_stats_attributes(
    file: &mut FileMut,
    prefix: &str,
    stats: &FieldStats,
) -> Result<(), netcdf::Error> {
    file.add_attribute(&format!("{}_min", prefix), stats.min)?;
    file.add_attribute(&format!("{}_max", prefix), stats.max)?;

    let weighted = [("mean", stats.mean), ("sd", stats.std), ("rms", stats.rms)];
    for (name, value) in weighted {
        if let Some(value) = value {
            file.add_attribute(&format!("{}_{}", prefix, name), value)?;
        }
    }

    Ok(())
}
