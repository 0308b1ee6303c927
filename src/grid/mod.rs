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

//! Module responsible for the model horizontal grid.
//!
//! [`GridSpec`] gathers the static description of an existing
//! model grid from a gridspec (mosaic) directory, while
//! [`supergrid`] generates new supergrids with their metrics.

pub mod supergrid;

use crate::errors::{InputError, ToolError};
use crate::io::{self, write};
use crate::toolbox::basins::{gen_basin_masks, BasinCode};
use crate::Float;
use log::{debug, info};
use ndarray::{s, Array2, ArrayView2};
use std::fs;
use std::path::{Path, PathBuf};

pub const HGRID_FILE: &str = "ocean_hgrid.nc";
pub const MASK_FILE: &str = "ocean_mask.nc";
pub const TOPOG_FILE: &str = "ocean_topog.nc";
pub const BASIN_FILE: &str = "basin_codes.nc";

/// Static description of the model grid.
///
/// All fields except corners have shape `(nj, ni)`,
/// corners have shape `(nj + 1, ni + 1)`.
#[derive(Clone, Debug)]
pub struct GridSpec {
    pub x: Array2<Float>,
    pub y: Array2<Float>,
    pub xcenter: Array2<Float>,
    pub ycenter: Array2<Float>,
    pub mask: Array2<Float>,
    pub area: Array2<Float>,
    pub depth: Array2<Float>,
    pub basin: Array2<i32>,
}

impl GridSpec {
    /// Reads the grid from gridspec directory.
    ///
    /// When the directory has no basin codes file
    /// the codes are generated from the topography.
    pub fn load(dir: &Path) -> Result<Self, InputError> {
        if !dir.is_dir() {
            return Err(InputError::BadPath(format!(
                "gridspec directory {} does not exist",
                dir.display()
            )));
        }

        debug!("Reading gridspec from {}", dir.display());

        let hgrid = io::open(&dir.join(HGRID_FILE))?;
        let super_x = io::read_2d(&hgrid, "x")?;
        let super_y = io::read_2d(&hgrid, "y")?;
        let super_area = io::read_2d(&hgrid, "area")?;

        let mask = io::read_filled(&io::open(&dir.join(MASK_FILE))?, "mask", 0.0)
            .and_then(io::into_2d)?;
        let depth = io::read_filled(&io::open(&dir.join(TOPOG_FILE))?, "depth", 0.0)
            .and_then(io::into_2d)?;

        let (nj, ni) = mask.dim();

        if super_x.dim() != (2 * nj + 1, 2 * ni + 1) || super_y.dim() != super_x.dim() {
            return Err(InputError::Mismatch(format!(
                "supergrid of shape {:?} does not match mask of shape {:?}",
                super_x.dim(),
                mask.dim()
            )));
        }

        if depth.dim() != (nj, ni) {
            return Err(InputError::Mismatch(format!(
                "topography of shape {:?} does not match mask of shape {:?}",
                depth.dim(),
                mask.dim()
            )));
        }

        let area = cell_area(super_area.view(), mask.view())?;

        let x = super_x.slice(s![..;2, ..;2]).to_owned();
        let y = super_y.slice(s![..;2, ..;2]).to_owned();
        let xcenter = super_x.slice(s![1..;2, 1..;2]).to_owned();
        let ycenter = super_y.slice(s![1..;2, 1..;2]).to_owned();

        let basin_path = dir.join(BASIN_FILE);
        let basin = if basin_path.is_file() {
            let codes = io::read_filled(&io::open(&basin_path)?, "basin", 0.0).and_then(io::into_2d)?;
            codes.mapv(|c| c.round() as i32)
        } else {
            info!("No basin codes file in gridspec, generating basin codes");
            gen_basin_masks(xcenter.view(), ycenter.view(), depth.view())
        };

        if basin.dim() != (nj, ni) {
            return Err(InputError::Mismatch(format!(
                "basin codes of shape {:?} do not match mask of shape {:?}",
                basin.dim(),
                mask.dim()
            )));
        }

        Ok(GridSpec {
            x,
            y,
            xcenter,
            ycenter,
            mask,
            area,
            depth,
            basin,
        })
    }

    pub fn dim(&self) -> (usize, usize) {
        self.mask.dim()
    }

    /// Latitude of the northern face of each row of cells,
    /// the largest corner latitude along the row.
    pub fn northern_face_latitude(&self) -> Vec<Float> {
        self.y
            .slice(s![1.., ..])
            .rows()
            .into_iter()
            .map(|row| row.fold(Float::NEG_INFINITY, |acc, &v| acc.max(v)))
            .collect()
    }
}

/// Sums 2x2 blocks of supergrid area into model cell area
/// and applies the ocean mask.
pub fn cell_area(super_area: ArrayView2<Float>, mask: ArrayView2<Float>) -> Result<Array2<Float>, InputError> {
    let (nj, ni) = mask.dim();

    if super_area.dim() != (2 * nj, 2 * ni) {
        return Err(InputError::Mismatch(format!(
            "supergrid area of shape {:?} does not match mask of shape {:?}",
            super_area.dim(),
            mask.dim()
        )));
    }

    Ok(Array2::from_shape_fn((nj, ni), |(j, i)| {
        let block = super_area.slice(s![2 * j..2 * j + 2, 2 * i..2 * i + 2]);
        mask[[j, i]] * block.sum()
    }))
}

/// Writes basin codes into the file, using `dims` as horizontal dimensions.
pub fn write_basin_codes(
    file: &mut netcdf::FileMut,
    dims: &[&str],
    codes: ArrayView2<i32>,
) -> Result<(), InputError> {
    let flag_values = BasinCode::flag_values();
    let flag_meanings = BasinCode::flag_meanings();

    write::put_int(
        file,
        "basin",
        dims,
        codes,
        &[
            ("long_name", "Region Selection Index"),
            ("standard_name", "region"),
            ("units", "1.0"),
            ("interp_method", "none"),
            ("flag_values", flag_values.as_str()),
            ("flag_meanings", flag_meanings.as_str()),
        ],
    )
}

/// Default output of [`append_basin_mask`]: input name with `basins`
/// inserted before the extension, in the working directory.
pub fn basin_output_name(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut parts: Vec<&str> = name.split('.').collect();
    let at = parts.len().saturating_sub(1);
    parts.insert(at, "basins");

    PathBuf::from(parts.join("."))
}

/// Generates basin codes from `geolon`, `geolat` and `deptho`
/// of a static file and writes a copy of it with the `basin` variable.
pub fn append_basin_mask(input: &Path, output: Option<&Path>, force: bool) -> Result<PathBuf, ToolError> {
    let output = output.map_or_else(|| basin_output_name(input), Path::to_path_buf);

    let (codes, dims) = {
        let file = io::open(input)?;

        if file.variable("basin").is_some() {
            return Err(ToolError::FaultyOutput(
                "The basin field already appears to be in the static file",
            ));
        }

        let geolon = io::read_2d(&file, "geolon")?;
        let geolat = io::read_2d(&file, "geolat")?;
        let depth = io::read_filled(&file, "deptho", 0.0).and_then(io::into_2d)?;

        if geolon.dim() != depth.dim() || geolat.dim() != depth.dim() {
            return Err(InputError::Mismatch(format!(
                "coordinates {:?} and depth {:?} differ in shape",
                geolon.dim(),
                depth.dim()
            ))
            .into());
        }

        info!("Generating basin codes for {} cells", depth.len());

        (
            gen_basin_masks(geolon.view(), geolat.view(), depth.view()),
            io::dimension_names(&file, "deptho")?,
        )
    };

    if output.exists() {
        if !force {
            return Err(ToolError::FaultyOutput(
                "Output file already exists, use --force to overwrite it",
            ));
        }
        debug!("Overwriting {}", output.display());
    }

    fs::copy(input, &output)?;

    let mut file = netcdf::append(&output)?;
    let dims: Vec<&str> = dims.iter().map(String::as_str).collect();
    write_basin_codes(&mut file, &dims, codes.view())?;

    Ok(output)
}
