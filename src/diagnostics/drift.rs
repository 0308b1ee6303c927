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

//! Drift of horizontally averaged temperature and salinity
//! from annual time series (`<prefix>.thetao_xyave.nc` and
//! `<prefix>.so_xyave.nc`).

use crate::errors::{InputError, ToolError};
use crate::io::{self, write, Dataset};
use crate::toolbox::bisection::inclusive_window;
use crate::toolbox::calendar::{noleap_year, reference_date};
use crate::Float;
use log::{debug, info};
use ndarray::{s, Array1, Array2, Axis, Ix1};
use std::path::{Path, PathBuf};

/// Horizontally averaged tracer series.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DriftTracer {
    Temperature,
    Salinity,
}

impl DriftTracer {
    pub const ALL: [DriftTracer; 2] = [DriftTracer::Temperature, DriftTracer::Salinity];

    fn variable(self) -> &'static str {
        match self {
            DriftTracer::Temperature => "thetao_xyave",
            DriftTracer::Salinity => "so_xyave",
        }
    }

    fn long_name(self) -> &'static str {
        match self {
            DriftTracer::Temperature => "Potential temperature drift",
            DriftTracer::Salinity => "Salinity drift",
        }
    }

    fn units(self) -> &'static str {
        match self {
            DriftTracer::Temperature => "degC",
            DriftTracer::Salinity => "psu",
        }
    }

    /// Output file name, `T_drift.nc` or `S_drift.nc`.
    pub fn output_name(self) -> &'static str {
        match self {
            DriftTracer::Temperature => "T_drift.nc",
            DriftTracer::Salinity => "S_drift.nc",
        }
    }

    fn files(self, prefixes: &[PathBuf]) -> Vec<PathBuf> {
        prefixes
            .iter()
            .map(|p| PathBuf::from(format!("{}.{}.nc", p.display(), self.variable())))
            .collect()
    }
}

/// Tracer change from the first record, `(time, z)`.
#[derive(Clone, Debug)]
pub struct Drift {
    pub tracer: DriftTracer,
    pub years: Array1<Float>,
    /// Level elevations, negative downwards.
    pub z: Array1<Float>,
    pub drift: Array2<Float>,
}

/// Difference of every record from the first one.
pub fn drift_from_start(series: &Array2<Float>) -> Array2<Float> {
    if series.nrows() == 0 {
        return series.clone();
    }

    let first = series.row(0).to_owned();
    series - &first
}

fn read_drift(
    tracer: DriftTracer,
    prefixes: &[PathBuf],
    trange: Option<(Float, Float)>,
) -> Result<Drift, ToolError> {
    let source = Dataset::open_all(&tracer.files(prefixes))?;

    let level = ["zt", "z_l"]
        .iter()
        .copied()
        .find(|name| source.has_variable(name))
        .ok_or_else(|| {
            InputError::MissingVariable(format!("zt or z_l in {}", source.first_path().display()))
        })?;
    let z = source
        .read(level)?
        .into_dimensionality::<Ix1>()
        .map_err(InputError::from)?
        .mapv(|d| -d);

    let reference = source
        .string_attribute("time", "units")
        .and_then(|units| reference_date(&units));
    let years: Vec<Float> = source
        .read("time")?
        .iter()
        .map(|t| Float::from(noleap_year(*t, reference)))
        .collect();

    let series = io::into_2d(source.read_filled(tracer.variable(), Float::NAN)?)?;

    if series.dim() != (years.len(), z.len()) {
        return Err(InputError::Mismatch(format!(
            "{} of shape {:?} does not match {} records and {} levels",
            tracer.variable(),
            series.dim(),
            years.len(),
            z.len()
        ))
        .into());
    }

    let drift = drift_from_start(&series);

    let (first, last) = match trange {
        Some((start, end)) => match inclusive_window(&years, start, end)? {
            Some((first, last)) => (first, last + 1),
            None => (0, 0),
        },
        None => (0, years.len()),
    };
    debug!("{} records {}..{} of {}", tracer.variable(), first, last, years.len());

    Ok(Drift {
        tracer,
        years: Array1::from(years[first..last].to_vec()),
        z,
        drift: drift.slice(s![first..last, ..]).to_owned(),
    })
}

impl Drift {
    pub fn write(&self, path: &Path) -> Result<(), InputError> {
        let mut file = write::create(path)?;
        file.add_attribute("history", write::history_entry("computed drift").as_str())?;

        file.add_dimension("time", self.years.len())?;
        file.add_dimension("z", self.z.len())?;

        write::put_float(&mut file, "time", &["time"], self.years.view(), &[("units", "years")])?;
        write::put_float(
            &mut file,
            "z",
            &["z"],
            self.z.view(),
            &[("long_name", "Level elevation"), ("units", "m"), ("positive", "up")],
        )?;
        write::put_float(
            &mut file,
            "drift",
            &["time", "z"],
            self.drift.view(),
            &[("long_name", self.tracer.long_name()), ("units", self.tracer.units())],
        )?;

        Ok(())
    }

    /// Largest absolute drift of the last record.
    pub fn final_extent(&self) -> Float {
        self.drift
            .index_axis(Axis(0), self.drift.nrows().saturating_sub(1))
            .iter()
            .filter(|v| !v.is_nan())
            .fold(0.0, |acc: Float, v| acc.max(v.abs()))
    }
}

/// Computes temperature and salinity drift of the series
/// with `prefixes` and writes them into `out_dir`.
/// Years outside `trange` are dropped after the drift is computed.
pub fn run_ts_drift(
    prefixes: &[PathBuf],
    trange: Option<(Float, Float)>,
    out_dir: &Path,
) -> Result<Vec<Drift>, ToolError> {
    let mut drifts = Vec::with_capacity(DriftTracer::ALL.len());

    for tracer in DriftTracer::ALL {
        let drift = read_drift(tracer, prefixes, trange)?;

        if drift.years.is_empty() {
            info!("{}: no records in range", tracer.variable());
        } else {
            info!("{}: largest final drift {:.5}", tracer.variable(), drift.final_extent());
        }

        drift.write(&out_dir.join(tracer.output_name()))?;
        drifts.push(drift);
    }

    Ok(drifts)
}

#[cfg(test)]
mod tests {
    use super::{drift_from_start, run_ts_drift, DriftTracer};
    use crate::io::{self, write};
    use ndarray::{array, Array2};
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    fn drift_relative_to_first_record() {
        let series = array![[10.0, 4.0], [10.5, 3.0], [11.0, f64::NAN]];
        let drift = drift_from_start(&series);

        assert_eq!(drift.row(2)[0], 1.0);
        assert_eq!(drift.row(1)[1], -1.0);
        assert!(drift[[2, 1]].is_nan());
    }

    fn write_series(prefix: &Path, variable: &str, level: &str, start: f64) {
        let path = format!("{}.{}.nc", prefix.display(), variable);
        let mut file = write::create(Path::new(&path)).unwrap();
        file.add_unlimited_dimension("time").unwrap();
        file.add_dimension(level, 2).unwrap();

        write::put_float(&mut file, level, &[level], array![5.0, 100.0].view(), &[]).unwrap();

        let mut time = file.add_variable::<f64>("time", &["time"]).unwrap();
        time.put_attribute("units", "days since 0001-01-01 00:00:00").unwrap();
        for t in 0..3 {
            time.put_value(start + 365.0 * t as f64 + 182.5, [t]).unwrap();
        }

        let series = Array2::from_shape_fn((3, 2), |(t, k)| 10.0 - k as f64 + 0.5 * t as f64);
        let mut var = file.add_variable::<f64>(variable, &["time", level]).unwrap();
        for (t, row) in series.outer_iter().enumerate() {
            var.put_values(&row.to_vec(), (t, ..)).unwrap();
        }
    }

    #[test]
    fn both_tracers_written() {
        let dir = TempDir::new().unwrap();
        let prefix = dir.path().join("ocean_annual_z.0001-0003");
        write_series(&prefix, "thetao_xyave", "z_l", 0.0);
        write_series(&prefix, "so_xyave", "zt", 0.0);

        let drifts = run_ts_drift(&[prefix], Some((2.0, 3.0)), dir.path()).unwrap();

        let temperature = &drifts[0];
        assert_eq!(temperature.tracer, DriftTracer::Temperature);
        assert_eq!(temperature.years, array![2.0, 3.0]);
        assert_eq!(temperature.z, array![-5.0, -100.0]);
        assert_eq!(temperature.drift, array![[0.5, 0.5], [1.0, 1.0]]);
        assert_eq!(temperature.final_extent(), 1.0);

        let output = io::open(&dir.path().join("S_drift.nc")).unwrap();
        assert_eq!(io::read_2d(&output, "drift").unwrap().dim(), (2, 2));
        assert_eq!(io::read_array(&output, "time").unwrap().len(), 2);
    }

    #[test]
    fn missing_series_reported() {
        let dir = TempDir::new().unwrap();
        let prefix = dir.path().join("ocean_annual_z.0001-0003");
        write_series(&prefix, "thetao_xyave", "z_l", 0.0);

        assert!(run_ts_drift(&[prefix], None, dir.path()).is_err());
    }
}
