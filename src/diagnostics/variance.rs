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

//! Monthly mean, mean square and variance of a field
//! from one year of daily records.

use super::with_missing;
use crate::constants::MISSING_VALUE;
use crate::errors::{InputError, ToolError};
use crate::io::{self, write};
use crate::toolbox::calendar::{DAYS_IN_LEAP_MONTH, DAYS_IN_MONTH};
use crate::Float;
use log::{debug, info, warn};
use ndarray::{ArrayD, Axis, IxDyn};
use netcdf::{AttributeValue, File};
use std::path::Path;

/// Time averaging variables of the record `(T1, T2, DT)`.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeBounds {
    pub start: Vec<Float>,
    pub end: Vec<Float>,
    pub length: Vec<Float>,
}

/// Monthly statistics with a leading month axis.
#[derive(Clone, Debug)]
pub struct MonthlyMoments {
    pub time: Vec<Float>,
    pub mean: ArrayD<Float>,
    pub squared: ArrayD<Float>,
    pub variance: ArrayD<Float>,
    pub bounds: Option<TimeBounds>,
}

fn month_lengths(records: usize) -> Result<&'static [usize; 12], InputError> {
    match records {
        365 => Ok(&DAYS_IN_MONTH),
        366 => Ok(&DAYS_IN_LEAP_MONTH),
        n => Err(InputError::Mismatch(format!(
            "{} daily records do not make a single year",
            n
        ))),
    }
}

/// Groups daily records `(365 or 366, ...)` into calendar months.
///
/// Sums are divided by the total length of averaging periods when
/// `bounds` are given, otherwise by the number of days. The bounds
/// of a month run from the end of the previous month (or the start
/// of the first record) to the end of its last day.
pub fn monthly_moments(
    daily: &ArrayD<Float>,
    time: &[Float],
    bounds: Option<&TimeBounds>,
) -> Result<MonthlyMoments, InputError> {
    if daily.ndim() < 3 {
        return Err(InputError::Mismatch(format!(
            "expected a 2D or 3D field with time, got {} dimensions",
            daily.ndim()
        )));
    }

    let records = daily.len_of(Axis(0));
    let lengths = month_lengths(records)?;

    if time.len() != records {
        return Err(InputError::Mismatch(format!(
            "{} time values for {} records",
            time.len(),
            records
        )));
    }

    if let Some(b) = bounds {
        if b.start.len() != records || b.end.len() != records || b.length.len() != records {
            return Err(InputError::Mismatch("time bounds do not cover all records".to_string()));
        }
    }

    let mut shape = daily.shape().to_vec();
    shape[0] = lengths.len();

    let mut mean = ArrayD::zeros(IxDyn(&shape));
    let mut squared = ArrayD::zeros(IxDyn(&shape));
    let mut times = Vec::with_capacity(lengths.len());
    let mut monthly_bounds = bounds.map(|_| TimeBounds {
        start: Vec::new(),
        end: Vec::new(),
        length: Vec::new(),
    });

    let mut record = 0;
    let mut previous_end = bounds.and_then(|b| b.start.first().copied()).unwrap_or(0.0);

    for (month, days) in lengths.iter().enumerate() {
        let range = record..record + days;

        let count: Float = match bounds {
            Some(b) => b.length[range.clone()].iter().sum(),
            None => *days as Float,
        };

        let mut mean_month = mean.index_axis_mut(Axis(0), month);
        let mut squared_month = squared.index_axis_mut(Axis(0), month);

        for day in range.clone() {
            let values = daily.index_axis(Axis(0), day);
            mean_month += &values;
            squared_month.zip_mut_with(&values, |s, v| *s += v * v);
        }

        mean_month /= count;
        squared_month /= count;
        times.push(time[range.clone()].iter().sum::<Float>() / count);

        if let (Some(monthly), Some(b)) = (monthly_bounds.as_mut(), bounds) {
            let end = b.end[range.end - 1];
            monthly.start.push(previous_end);
            monthly.end.push(end);
            monthly.length.push(count);
            previous_end = end;
        }

        record = range.end;
    }

    let variance = &squared - &mean.mapv(|m| m * m);

    Ok(MonthlyMoments {
        time: times,
        mean,
        squared,
        variance,
        bounds: monthly_bounds,
    })
}

/// Text attributes of the source variable, with `long_name`
/// and `units` rewritten for derived quantities.
fn derived_attributes(var: &netcdf::Variable, label: Option<&str>) -> Vec<(String, String)> {
    var.attributes()
        .filter_map(|attr| match attr.value() {
            Ok(AttributeValue::Str(value)) => Some((attr.name().to_string(), value)),
            _ => None,
        })
        .map(|(name, value)| match (name.as_str(), label) {
            ("long_name", Some(label)) => (name, format!("{} of {}", label, value)),
            ("units", Some(_)) => (name, format!("({})^2", value)),
            _ => (name, value),
        })
        .collect()
}

fn read_bounds(source: &File, var: &netcdf::Variable) -> Result<Option<(Vec<String>, TimeBounds)>, InputError> {
    let info = match io::string_attribute(var, "time_avg_info") {
        Some(info) => info,
        None => return Ok(None),
    };

    let names: Vec<String> = info.split(',').map(|n| n.trim().to_string()).collect();

    if names.len() != 3 || names.iter().any(|n| source.variable(n).is_none()) {
        warn!("Time averaging variables {} not usable, counting days", info);
        return Ok(None);
    }

    let read = |name: &str| -> Result<Vec<Float>, InputError> {
        Ok(io::read_array(source, name)?.iter().copied().collect())
    };

    let bounds = TimeBounds {
        start: read(&names[0])?,
        end: read(&names[1])?,
        length: read(&names[2])?,
    };

    Ok(Some((names, bounds)))
}

fn put_series(out: &mut netcdf::FileMut, source: &File, name: &str, dim: &str, values: &[Float]) -> Result<(), InputError> {
    let mut var = out.add_variable::<Float>(name, &[dim])?;
    write::copy_attributes(source, name, &mut var)?;
    var.put_values(values, ..)?;

    Ok(())
}

/// Writes monthly mean, mean square (`<name>_squared`) and variance
/// (`<name>_var`) of `name` from the daily file into `output`.
pub fn run_monthly_variance(name: &str, daily_file: &Path, output: &Path) -> Result<MonthlyMoments, ToolError> {
    info!("Reading {} from {}", name, daily_file.display());

    let source = io::open(daily_file)?;
    let var = io::variable(&source, name)?;
    let dims = io::dimension_names(&source, name)?;

    let daily = io::read_filled(&source, name, Float::NAN)?;
    let time_dim = dims
        .first()
        .ok_or_else(|| InputError::MissingDimension(format!("record dimension of {}", name)))?;
    let time: Vec<Float> = io::read_array(&source, time_dim)?.iter().copied().collect();

    let bounds = read_bounds(&source, &var)?;
    let moments = monthly_moments(&daily, &time, bounds.as_ref().map(|(_, b)| b))?;

    info!("Creating {}", output.display());
    let mut out = write::create(output)?;
    write::copy_global_attributes(&source, &mut out, &[])?;

    out.add_dimension(time_dim, moments.time.len())?;
    for (dim, len) in dims.iter().zip(daily.shape()).skip(1) {
        if source.variable(dim).is_some() {
            write::copy_coordinate(&source, &mut out, dim, false)?;
        } else {
            out.add_dimension(dim, *len)?;
        }
    }

    put_series(&mut out, &source, time_dim, time_dim, &moments.time)?;

    if let (Some((names, _)), Some(monthly)) = (&bounds, &moments.bounds) {
        for (bound, values) in names.iter().zip([&monthly.start, &monthly.end, &monthly.length]) {
            put_series(&mut out, &source, bound, time_dim, values)?;
        }
    }

    let dims: Vec<&str> = dims.iter().map(String::as_str).collect();
    let outputs = [
        (name.to_string(), &moments.mean, None),
        (format!("{}_squared", name), &moments.squared, Some("Square")),
        (format!("{}_var", name), &moments.variance, Some("Variance")),
    ];

    for (out_name, data, label) in &outputs {
        debug!("Writing {}", out_name);
        let attrs = derived_attributes(&var, *label);
        let attrs: Vec<(&str, &str)> = attrs
            .iter()
            .filter(|(k, _)| k != "_FillValue" && k != "missing_value")
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        write::put_float32_with_fill(
            &mut out,
            out_name,
            &dims,
            with_missing(*data).view(),
            MISSING_VALUE,
            &attrs,
        )?;
    }

    Ok(moments)
}

#[cfg(test)]
mod tests {
    use super::{monthly_moments, run_monthly_variance, TimeBounds};
    use crate::io::{self, write};
    use float_cmp::approx_eq;
    use ndarray::{Array1, Array3, ArrayD, IxDyn};
    use tempfile::TempDir;

    fn daily_field(records: usize) -> ArrayD<f64> {
        // alternating 1 and 3 in the first column, constant 2 in the second
        Array3::from_shape_fn((records, 1, 2), |(d, _, i)| {
            if i == 1 {
                2.0
            } else if d % 2 == 0 {
                1.0
            } else {
                3.0
            }
        })
        .into_dyn()
    }

    #[test]
    fn moments_of_calendar_months() {
        let daily = daily_field(365);
        let time: Vec<f64> = (0..365).map(|d| d as f64 + 0.5).collect();

        let moments = monthly_moments(&daily, &time, None).unwrap();

        assert_eq!(moments.mean.shape(), &[12, 1, 2]);
        // January has 16 ones and 15 threes
        assert!(approx_eq!(f64, moments.mean[[0, 0, 0]], 61.0 / 31.0, epsilon = 1.0e-12));
        // February starts with a three: 14 of each
        assert!(approx_eq!(f64, moments.mean[[1, 0, 0]], 2.0, epsilon = 1.0e-12));
        assert!(approx_eq!(f64, moments.variance[[1, 0, 0]], 1.0, epsilon = 1.0e-12));
        assert!(approx_eq!(f64, moments.variance[[5, 0, 1]], 0.0, epsilon = 1.0e-12));
        assert!(approx_eq!(f64, moments.squared[[1, 0, 1]], 4.0, epsilon = 1.0e-12));

        assert!(approx_eq!(f64, moments.time[0], 15.5, epsilon = 1.0e-12));
        assert!(approx_eq!(f64, moments.time[11], 349.5, epsilon = 1.0e-12));
        assert!(moments.bounds.is_none());

        assert!(monthly_moments(&daily_field(360), &time, None).is_err());
        assert!(monthly_moments(&ArrayD::zeros(IxDyn(&[365, 2])), &time, None).is_err());
    }

    #[test]
    fn leap_year_with_bounds() {
        let daily = daily_field(366);
        let time: Vec<f64> = (0..366).map(|d| d as f64 + 0.5).collect();
        let bounds = TimeBounds {
            start: (0..366).map(|d| d as f64).collect(),
            end: (0..366).map(|d| d as f64 + 1.0).collect(),
            length: vec![1.0; 366],
        };

        let moments = monthly_moments(&daily, &time, Some(&bounds)).unwrap();
        let monthly = moments.bounds.unwrap();

        assert_eq!(monthly.start[..3].to_vec(), vec![0.0, 31.0, 60.0]);
        assert_eq!(monthly.end[1], 60.0);
        assert_eq!(monthly.length[1], 29.0);
        assert_eq!(monthly.end[11], 366.0);
    }

    #[test]
    fn variance_file_written() {
        let dir = TempDir::new().unwrap();
        let daily_path = dir.path().join("ocean_daily.nc");
        let output = dir.path().join("ocean_month_var.nc");

        {
            let mut file = write::create(&daily_path).unwrap();
            file.add_attribute("title", "Test run").unwrap();
            for (name, len) in [("time", 365), ("yh", 1), ("xh", 2)] {
                file.add_dimension(name, len).unwrap();
            }

            let time: Array1<f64> = (0..365).map(|d| d as f64 + 0.5).collect();
            write::put_float(&mut file, "time", &["time"], time.view(), &[("units", "days since 0001-01-01")])
                .unwrap();
            write::put_float(&mut file, "xh", &["xh"], Array1::from(vec![0.5, 1.5]).view(), &[]).unwrap();

            write::put_float(
                &mut file,
                "tos",
                &["time", "yh", "xh"],
                daily_field(365).view(),
                &[("long_name", "Sea Surface Temperature"), ("units", "degC")],
            )
            .unwrap();
        }

        let moments = run_monthly_variance("tos", &daily_path, &output).unwrap();
        assert_eq!(moments.time.len(), 12);

        let file = io::open(&output).unwrap();
        assert_eq!(io::read_array(&file, "time").unwrap().len(), 12);
        assert_eq!(io::read_array(&file, "xh").unwrap().len(), 2);
        assert_eq!(io::read_filled(&file, "tos_var", f64::NAN).unwrap().shape(), &[12, 1, 2]);

        let squared = io::variable(&file, "tos_squared").unwrap();
        assert_eq!(io::string_attribute(&squared, "units").as_deref(), Some("(degC)^2"));
        assert_eq!(
            io::string_attribute(&squared, "long_name").as_deref(),
            Some("Square of Sea Surface Temperature")
        );
        assert_eq!(io::global_string_attribute(&file, "title").as_deref(), Some("Test run"));
    }
}
