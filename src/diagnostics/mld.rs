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

//! Annual minimum and maximum of the mixed layer depth
//! (density criterion 0.03 kg m-3) from monthly output.

use super::{add_stats_attributes, with_missing};
use crate::constants::MISSING_VALUE;
use crate::errors::{InputError, ToolError};
use crate::grid::GridSpec;
use crate::io::{self, write, Dataset};
use crate::toolbox::stats::{area_weighted_stats, FieldStats};
use crate::Float;
use log::{debug, info};
use ndarray::{Array2, Array3, ArrayView3, Axis};
use std::path::{Path, PathBuf};

pub const OUTPUT_FILE: &str = "MLD_003.nc";

const MONTHS: usize = 12;
const MODEL_NAME: &str = "MLD_003";

/// Mean seasonal cycle `(12, j, i)` of consecutive years of
/// monthly records.
pub fn monthly_climatology(mld: ArrayView3<Float>) -> Result<Array3<Float>, InputError> {
    let (nt, nj, ni) = mld.dim();

    if nt == 0 || nt % MONTHS != 0 {
        return Err(InputError::Mismatch(format!(
            "{} monthly records do not make whole years",
            nt
        )));
    }

    let years = nt / MONTHS;
    debug!("Monthly climatology of {} years", years);

    let mut climatology = Array3::zeros((MONTHS, nj, ni));
    for year in mld.axis_chunks_iter(Axis(0), MONTHS) {
        climatology += &year;
    }

    Ok(climatology / years as Float)
}

/// Smallest and largest month of the climatology at every point,
/// `NaN` where all months are missing.
pub fn annual_extremes(climatology: ArrayView3<Float>) -> (Array2<Float>, Array2<Float>) {
    let fold = |f: fn(Float, Float) -> Float| {
        climatology.map_axis(Axis(0), |months| {
            months.iter().copied().filter(|v| !v.is_nan()).fold(Float::NAN, f)
        })
    };

    (fold(Float::min), fold(Float::max))
}

/// Observed climatology (Hosoda et al., 2010) on its own grid.
#[derive(Clone, Debug)]
pub struct ObservedMld {
    pub lon: Vec<Float>,
    pub lat: Vec<Float>,
    pub min: Array2<Float>,
    pub max: Array2<Float>,
}

impl ObservedMld {
    pub fn read(path: &Path) -> Result<Self, InputError> {
        let file = io::open(path)?;
        let mld = io::into_3d(io::read_filled(&file, "MLD", Float::NAN)?)?;
        let (min, max) = annual_extremes(mld.view());

        Ok(ObservedMld {
            lon: io::read_array(&file, "LONGITUDE")?.iter().copied().collect(),
            lat: io::read_array(&file, "LATITUDE")?.iter().copied().collect(),
            min,
            max,
        })
    }
}

#[derive(Clone, Debug)]
pub struct MixedLayer {
    pub min: Array2<Float>,
    pub max: Array2<Float>,
    pub min_stats: FieldStats,
    pub max_stats: FieldStats,
    pub observed: Option<ObservedMld>,
}

/// Computes annual extremes of the monthly climatology and
/// writes them into `out_dir`, with observations when given.
pub fn run_mld(
    files: &[PathBuf],
    grid: &GridSpec,
    obs_file: Option<&Path>,
    out_dir: &Path,
) -> Result<MixedLayer, ToolError> {
    let source = Dataset::open_all(files)?;
    let mld = io::into_3d(source.read_filled(MODEL_NAME, Float::NAN)?)?;

    if (mld.dim().1, mld.dim().2) != grid.dim() {
        return Err(InputError::Mismatch(format!(
            "{} of shape {:?} does not match the grid {:?}",
            MODEL_NAME,
            mld.dim(),
            grid.dim()
        ))
        .into());
    }

    let climatology = monthly_climatology(mld.view())?;
    let (min, max) = annual_extremes(climatology.view());

    let min_stats = area_weighted_stats(min.view(), Some(grid.area.view()));
    let max_stats = area_weighted_stats(max.view(), Some(grid.area.view()));
    info!("Annual-minimum MLD: {}", min_stats);
    info!("Annual-maximum MLD: {}", max_stats);

    let observed = obs_file.map(ObservedMld::read).transpose()?;

    let result = MixedLayer {
        min,
        max,
        min_stats,
        max_stats,
        observed,
    };

    result.write(&out_dir.join(OUTPUT_FILE), grid, &source.title())?;

    Ok(result)
}

impl MixedLayer {
    pub fn write(&self, path: &Path, grid: &GridSpec, title: &str) -> Result<(), InputError> {
        let (nj, ni) = self.min.dim();

        let mut file = write::create(path)?;
        file.add_attribute("title", title)?;
        file.add_attribute("history", write::history_entry("computed annual MLD extremes").as_str())?;
        add_stats_attributes(&mut file, "mld_min", &self.min_stats)?;
        add_stats_attributes(&mut file, "mld_max", &self.max_stats)?;

        file.add_dimension("yh", nj)?;
        file.add_dimension("xh", ni)?;
        let dims = ["yh", "xh"];

        write::put_float(
            &mut file,
            "geolon",
            &dims,
            grid.xcenter.view(),
            &[("long_name", "Longitude of cell centre"), ("units", "degrees_east")],
        )?;
        write::put_float(
            &mut file,
            "geolat",
            &dims,
            grid.ycenter.view(),
            &[("long_name", "Latitude of cell centre"), ("units", "degrees_north")],
        )?;

        let fields = [
            (&self.min, "mld_min", "Annual-minimum MLD_0.03"),
            (&self.max, "mld_max", "Annual-maximum MLD_0.03"),
        ];

        for (data, name, long_name) in fields {
            write::put_float32_with_fill(
                &mut file,
                name,
                &dims,
                with_missing(data).view(),
                MISSING_VALUE,
                &[("long_name", long_name), ("units", "m"), ("coordinates", "geolon geolat")],
            )?;
        }

        if let Some(obs) = &self.observed {
            file.add_dimension("obs_lat", obs.lat.len())?;
            file.add_dimension("obs_lon", obs.lon.len())?;

            write::put_float(
                &mut file,
                "obs_lon",
                &["obs_lon"],
                ndarray::aview1(&obs.lon),
                &[("units", "degrees_east")],
            )?;
            write::put_float(
                &mut file,
                "obs_lat",
                &["obs_lat"],
                ndarray::aview1(&obs.lat),
                &[("units", "degrees_north")],
            )?;

            let fields = [
                (&obs.min, "obs_mld_min", "Hosoda et al., 2010, annual-minimum MLD_0.03"),
                (&obs.max, "obs_mld_max", "Hosoda et al., 2010, annual-maximum MLD_0.03"),
            ];

            for (data, name, long_name) in fields {
                write::put_float32_with_fill(
                    &mut file,
                    name,
                    &["obs_lat", "obs_lon"],
                    with_missing(data).view(),
                    MISSING_VALUE,
                    &[("long_name", long_name), ("units", "m")],
                )?;
            }
        }

        Ok(())
    }
}
