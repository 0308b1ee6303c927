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

//! Annual mean sea surface temperature bias against
//! World Ocean Atlas 2005 (or other gridded observations).
//!
//! The monthly variant compares the mean of monthly model SST
//! with the mean of the same calendar months of observations.

use super::{add_stats_attributes, first_present, with_missing};
use crate::constants::MISSING_VALUE;
use crate::errors::{InputError, ToolError};
use crate::grid::GridSpec;
use crate::io::{self, write, Dataset};
use crate::toolbox::calendar::{noleap_month, reference_date, MONTH_ABBREVIATIONS};
use crate::toolbox::stats::{area_weighted_stats, FieldStats};
use crate::Float;
use log::{debug, info};
use ndarray::{Array2, ArrayD, Axis, Ix2};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

pub const OUTPUT_FILE: &str = "SST_bias_WOA05.nc";
pub const MONTHLY_OUTPUT_FILE: &str = "SST_monthly_bias_WOA05.nc";

const MONTHLY_MODEL_NAMES: [&str; 2] = ["sst", "tos"];

const OBSERVED_NAMES: [&str; 2] = ["temp", "ptemp"];
const MODEL_NAMES: [&str; 3] = ["temp", "ptemp", "thetao"];

#[derive(Clone, Debug)]
pub struct SstBias {
    pub model: Array2<Float>,
    pub observed: Array2<Float>,
    /// Model minus observations, `NaN` where either is missing.
    pub bias: Array2<Float>,
    pub model_stats: FieldStats,
    pub observed_stats: FieldStats,
    pub bias_stats: FieldStats,
    /// Months compared, like `Jan, Feb`, for the monthly bias.
    pub months: Option<String>,
}

fn into_surface(data: ArrayD<Float>) -> Result<Array2<Float>, InputError> {
    Ok(data.into_dimensionality::<Ix2>()?)
}

/// Observed SST: first level of `(k, j, i)` data,
/// or time mean of the first level of `(t, k, j, i)` data.
pub fn observed_sst(source: &Dataset) -> Result<Array2<Float>, InputError> {
    let name = first_present(source, &OBSERVED_NAMES)?;
    let data = source.read_filled(name, Float::NAN)?;

    match data.ndim() {
        3 => into_surface(data.index_axis_move(Axis(0), 0)),
        4 => into_surface(io::time_mean(&data.index_axis_move(Axis(1), 0))?),
        n => Err(InputError::Mismatch(format!("observed {} has {} dimensions", name, n))),
    }
}

/// Model SST: first level of the only record, or time mean
/// of the first level when there are more records.
pub fn model_sst(source: &Dataset) -> Result<Array2<Float>, InputError> {
    let name = first_present(source, &MODEL_NAMES)?;
    let data = source.read_filled(name, Float::NAN)?;

    if data.ndim() != 4 {
        return Err(InputError::Mismatch(format!(
            "model {} has {} dimensions, (time, level, y, x) expected",
            name,
            data.ndim()
        )));
    }

    let records = data.len_of(Axis(0));
    debug!("Model SST from {} of {} records", name, records);

    let surface = data.index_axis_move(Axis(1), 0);

    if records > 1 {
        into_surface(io::time_mean(&surface)?)
    } else {
        into_surface(surface.index_axis_move(Axis(0), 0))
    }
}

/// Computes the SST bias with area-weighted statistics and
/// writes it into `out_dir`.
pub fn run_sst_bias(
    model_files: &[PathBuf],
    obs_file: &Path,
    grid: &GridSpec,
    out_dir: &Path,
) -> Result<SstBias, ToolError> {
    let model_source = Dataset::open_all(model_files)?;
    let obs_source = Dataset::open_all(&[obs_file.to_path_buf()])?;

    let model = model_sst(&model_source)?;
    let observed = observed_sst(&obs_source)?;

    let sst_bias = SstBias::new(model, observed, grid, None)?;
    sst_bias.write(&out_dir.join(OUTPUT_FILE), grid, &model_source.title())?;

    Ok(sst_bias)
}

/// Calendar months (zero-based, ascending) of the time records
/// and the label of as many first records, like `Jan, Feb, Mar`.
pub fn months_present(source: &Dataset) -> Result<(Vec<usize>, String), InputError> {
    let reference = source
        .string_attribute("time", "units")
        .and_then(|units| reference_date(&units));
    let records: Vec<usize> = source
        .read("time")?
        .iter()
        .map(|t| noleap_month(*t, reference))
        .collect();

    let months: Vec<usize> = records.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
    let label = records
        .iter()
        .take(months.len())
        .map(|m| MONTH_ABBREVIATIONS[*m])
        .collect::<Vec<_>>()
        .join(", ");

    Ok((months, label))
}

/// Model SST of `(t, j, i)` monthly records: the only record
/// or the mean of all of them.
pub fn monthly_model_sst(source: &Dataset) -> Result<Array2<Float>, InputError> {
    let name = first_present(source, &MONTHLY_MODEL_NAMES)?;
    let data = source.read_filled(name, Float::NAN)?;

    if data.ndim() != 3 {
        return Err(InputError::Mismatch(format!(
            "model {} has {} dimensions, (time, y, x) expected",
            name,
            data.ndim()
        )));
    }

    if data.len_of(Axis(0)) > 1 {
        into_surface(io::time_mean(&data)?)
    } else {
        into_surface(data.index_axis_move(Axis(0), 0))
    }
}

/// Observed SST of the given months: first level of `(k, j, i)`
/// data, or mean over the months of the first level of monthly
/// `(12, k, j, i)` climatology.
pub fn monthly_observed_sst(source: &Dataset, months: &[usize]) -> Result<Array2<Float>, InputError> {
    let name = first_present(source, &OBSERVED_NAMES)?;
    let data = source.read_filled(name, Float::NAN)?;

    match data.ndim() {
        3 => into_surface(data.index_axis_move(Axis(0), 0)),
        4 => {
            if let Some(month) = months.iter().find(|m| **m >= data.len_of(Axis(0))) {
                return Err(InputError::Mismatch(format!(
                    "observed {} has no record for month {}",
                    name,
                    month + 1
                )));
            }

            let surface = data.index_axis_move(Axis(1), 0).select(Axis(0), months);
            into_surface(io::time_mean(&surface)?)
        }
        n => Err(InputError::Mismatch(format!("observed {} has {} dimensions", name, n))),
    }
}

/// Computes the SST bias of the months present in monthly model
/// output and writes it into `out_dir`. Time is decoded in the
/// `noleap` calendar.
pub fn run_monthly_sst_bias(
    model_files: &[PathBuf],
    obs_file: &Path,
    grid: &GridSpec,
    out_dir: &Path,
) -> Result<SstBias, ToolError> {
    let model_source = Dataset::open_all(model_files)?;
    let obs_source = Dataset::open_all(&[obs_file.to_path_buf()])?;

    let (months, label) = months_present(&model_source)?;
    info!("Comparing months {}", label);

    let model = monthly_model_sst(&model_source)?;
    let observed = monthly_observed_sst(&obs_source, &months)?;

    let sst_bias = SstBias::new(model, observed, grid, Some(label))?;
    sst_bias.write(&out_dir.join(MONTHLY_OUTPUT_FILE), grid, &model_source.title())?;

    Ok(sst_bias)
}

impl SstBias {
    /// Bias with area-weighted statistics of model and observed SST.
    pub fn new(
        model: Array2<Float>,
        observed: Array2<Float>,
        grid: &GridSpec,
        months: Option<String>,
    ) -> Result<Self, InputError> {
        if model.dim() != grid.dim() || observed.dim() != grid.dim() {
            return Err(InputError::Mismatch(format!(
                "model SST {:?} and observed SST {:?} must match the grid {:?}",
                model.dim(),
                observed.dim(),
                grid.dim()
            )));
        }

        let bias = &model - &observed;

        let model_stats = area_weighted_stats(model.view(), Some(grid.area.view()));
        let observed_stats = area_weighted_stats(observed.view(), Some(grid.area.view()));
        let bias_stats = area_weighted_stats(bias.view(), Some(grid.area.view()));

        info!("SST: {}", model_stats);
        info!("WOA'05 SST: {}", observed_stats);
        info!("SST bias (w.r.t. WOA'05): {}", bias_stats);

        Ok(SstBias {
            model,
            observed,
            bias,
            model_stats,
            observed_stats,
            bias_stats,
            months,
        })
    }

    pub fn write(&self, path: &Path, grid: &GridSpec, title: &str) -> Result<(), InputError> {
        let (nj, ni) = self.bias.dim();

        let mut file = write::create(path)?;
        file.add_attribute("title", title)?;
        file.add_attribute("history", write::history_entry("computed SST bias").as_str())?;
        add_stats_attributes(&mut file, "sst", &self.model_stats)?;
        add_stats_attributes(&mut file, "sst_obs", &self.observed_stats)?;
        add_stats_attributes(&mut file, "sst_bias", &self.bias_stats)?;
        if let Some(months) = &self.months {
            file.add_attribute("months", months.as_str())?;
        }
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
            (&self.model, "sst", "Sea surface temperature"),
            (&self.observed, "sst_obs", "WOA'05 sea surface temperature"),
            (&self.bias, "sst_bias", "SST bias (w.r.t. WOA'05)"),
        ];

        for (data, name, long_name) in fields {
            write::put_float32_with_fill(
                &mut file,
                name,
                &dims,
                with_missing(data).view(),
                MISSING_VALUE,
                &[
                    ("long_name", long_name),
                    ("units", "degC"),
                    ("coordinates", "geolon geolat"),
                ],
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{run_monthly_sst_bias, run_sst_bias, MONTHLY_OUTPUT_FILE, OUTPUT_FILE};
    use crate::grid::GridSpec;
    use crate::io::{self, write};
    use float_cmp::approx_eq;
    use ndarray::{array, s, Array2, Array3, Array4};
    use netcdf::AttributeValue;
    use tempfile::TempDir;

    fn grid() -> GridSpec {
        GridSpec {
            x: Array2::from_shape_fn((3, 3), |(_, i)| i as f64),
            y: Array2::from_shape_fn((3, 3), |(j, _)| j as f64),
            xcenter: Array2::from_shape_fn((2, 2), |(_, i)| 0.5 + i as f64),
            ycenter: Array2::from_shape_fn((2, 2), |(j, _)| 0.5 + j as f64),
            mask: Array2::ones((2, 2)),
            area: array![[1.0, 1.0], [2.0, 0.0]],
            depth: Array2::from_elem((2, 2), 100.0),
            basin: Array2::from_elem((2, 2), 2),
        }
    }

    #[test]
    fn bias_of_time_mean_surface() {
        let dir = TempDir::new().unwrap();
        let model_path = dir.path().join("annual.nc");
        let obs_path = dir.path().join("woa.nc");

        {
            let mut file = write::create(&model_path).unwrap();
            for (name, len) in [("time", 2), ("zl", 2), ("yh", 2), ("xh", 2)] {
                file.add_dimension(name, len).unwrap();
            }
            file.add_attribute("title", "Test run").unwrap();

            // surface is 10 in the first and 12 in the second record
            let mut temp = Array4::from_elem((2, 2, 2, 2), 5.0);
            temp.slice_mut(s![0, 0, .., ..]).fill(10.0);
            temp.slice_mut(s![1, 0, .., ..]).fill(12.0);
            write::put_float(&mut file, "thetao", &["time", "zl", "yh", "xh"], temp.view(), &[])
                .unwrap();
        }

        {
            let mut file = write::create(&obs_path).unwrap();
            for (name, len) in [("depth", 2), ("lat", 2), ("lon", 2)] {
                file.add_dimension(name, len).unwrap();
            }

            let mut temp = Array3::from_elem((2, 2, 2), 9.0);
            temp[[0, 0, 1]] = 13.0;
            temp[[0, 1, 1]] = 1.0e20;
            write::put_float(&mut file, "temp", &["depth", "lat", "lon"], temp.view(), &[]).unwrap();
        }

        let result = run_sst_bias(&[model_path], &obs_path, &grid(), dir.path()).unwrap();

        assert_eq!(result.model, Array2::from_elem((2, 2), 11.0));
        assert_eq!(result.bias[[0, 0]], 2.0);
        assert_eq!(result.bias[[0, 1]], -2.0);
        assert!(result.bias[[1, 1]].is_nan());

        // weights 1, 1, 2 for biases 2, -2, 2
        assert_eq!(result.bias_stats.min, -2.0);
        assert!(approx_eq!(f64, result.bias_stats.mean.unwrap(), 1.0, epsilon = 1.0e-12));

        let output = io::open(&dir.path().join(OUTPUT_FILE)).unwrap();
        let bias = io::read_filled(&output, "sst_bias", f64::NAN).unwrap();
        assert!(approx_eq!(f64, bias[[1, 0]], 2.0, epsilon = 1.0e-6));
        assert!(bias[[1, 1]].is_nan());

        let attr = output.attribute("sst_bias_max").unwrap().value().unwrap();
        assert!(matches!(attr, AttributeValue::Double(v) if v == 2.0));
    }

    #[test]
    fn missing_temperature_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.nc");
        {
            let mut file = write::create(&path).unwrap();
            file.add_dimension("x", 1).unwrap();
            write::put_float(&mut file, "salt", &["x"], array![35.0].view(), &[]).unwrap();
        }

        assert!(run_sst_bias(&[path.clone()], &path, &grid(), dir.path()).is_err());
    }

    fn write_monthly(path: &std::path::Path, days: &[f64]) {
        let mut file = write::create(path).unwrap();
        for (name, len) in [("time", days.len()), ("yh", 2), ("xh", 2)] {
            file.add_dimension(name, len).unwrap();
        }
        file.add_attribute("title", "Test run").unwrap();

        write::put_float(
            &mut file,
            "time",
            &["time"],
            ndarray::aview1(days),
            &[("units", "days since 1900-01-01 00:00:00"), ("calendar", "noleap")],
        )
        .unwrap();

        let sst = Array3::from_shape_fn((days.len(), 2, 2), |(t, _, _)| 10.0 + t as f64);
        write::put_float(&mut file, "tos", &["time", "yh", "xh"], sst.view(), &[]).unwrap();
    }

    fn write_climatology(path: &std::path::Path) {
        let mut file = write::create(path).unwrap();
        for (name, len) in [("time", 12), ("depth", 2), ("lat", 2), ("lon", 2)] {
            file.add_dimension(name, len).unwrap();
        }

        let temp = Array4::from_shape_fn((12, 2, 2, 2), |(m, k, _, _)| if k == 0 { m as f64 } else { -1.0 });
        write::put_float(&mut file, "temp", &["time", "depth", "lat", "lon"], temp.view(), &[]).unwrap();
    }

    #[test]
    fn monthly_bias_of_months_present() {
        let dir = TempDir::new().unwrap();
        let model_path = dir.path().join("month.nc");
        let obs_path = dir.path().join("woa_monthly.nc");
        write_monthly(&model_path, &[15.5, 45.0, 74.5]);
        write_climatology(&obs_path);

        let result = run_monthly_sst_bias(&[model_path], &obs_path, &grid(), dir.path()).unwrap();

        // model mean 11, observed mean of Jan to Mar is 1
        assert_eq!(result.months.as_deref(), Some("Jan, Feb, Mar"));
        assert_eq!(result.model, Array2::from_elem((2, 2), 11.0));
        assert_eq!(result.observed, Array2::from_elem((2, 2), 1.0));
        assert_eq!(result.bias_stats.max, 10.0);

        let output = io::open(&dir.path().join(MONTHLY_OUTPUT_FILE)).unwrap();
        assert_eq!(
            io::global_string_attribute(&output, "months").as_deref(),
            Some("Jan, Feb, Mar")
        );
    }

    #[test]
    fn repeated_month_counted_once() {
        let dir = TempDir::new().unwrap();
        let model_path = dir.path().join("month.nc");
        let obs_path = dir.path().join("woa_monthly.nc");
        // July of two consecutive years
        write_monthly(&model_path, &[196.5, 561.5]);
        write_climatology(&obs_path);

        let result = run_monthly_sst_bias(&[model_path], &obs_path, &grid(), dir.path()).unwrap();

        assert_eq!(result.months.as_deref(), Some("Jul"));
        assert_eq!(result.observed[[0, 0]], 6.0);
        assert_eq!(result.bias[[1, 1]], 4.5);
    }
}
