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

//! Zonally averaged temperature or salinity bias against WOA'05
//! for the global ocean and the three major basins.

use super::{add_stats_attributes, first_present, read_climatology, with_missing};
use crate::constants::MISSING_VALUE;
use crate::errors::{InputError, ToolError};
use crate::grid::GridSpec;
use crate::io::{self, write, Dataset};
use crate::toolbox::basins::BasinCode;
use crate::toolbox::section::{section2quadmesh, QuadMesh, Representation};
use crate::toolbox::stats::{area_weighted_stats, section_weight, zonal_average, FieldStats};
use crate::Float;
use log::{debug, info};
use ndarray::{Array1, Array2, Array3, Axis, Zip};
use std::path::{Path, PathBuf};

/// Zonally averaged tracer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Tracer {
    Temperature,
    Salinity,
}

impl Tracer {
    fn prefix(self) -> &'static str {
        match self {
            Tracer::Temperature => "T",
            Tracer::Salinity => "S",
        }
    }

    fn units(self) -> &'static str {
        match self {
            Tracer::Temperature => "degC",
            Tracer::Salinity => "psu",
        }
    }

    fn long_name(self) -> &'static str {
        match self {
            Tracer::Temperature => "Potential temperature",
            Tracer::Salinity => "Salinity",
        }
    }

    fn model_variables(self) -> &'static [&'static str] {
        match self {
            Tracer::Temperature => &["temp", "ptemp", "thetao"],
            Tracer::Salinity => &["salt", "so"],
        }
    }

    fn observed_variables(self) -> &'static [&'static str] {
        match self {
            Tracer::Temperature => &["temp", "ptemp"],
            Tracer::Salinity => &["salt"],
        }
    }
}

/// Region of the zonal average, all ocean when `codes` is empty.
#[derive(Copy, Clone, Debug)]
pub struct ZonalBasin {
    pub name: &'static str,
    codes: &'static [BasinCode],
}

pub const ZONAL_BASINS: [ZonalBasin; 4] = [
    ZonalBasin {
        name: "global",
        codes: &[],
    },
    ZonalBasin {
        name: "Atlantic",
        codes: &[BasinCode::AtlanticOcean, BasinCode::ArcticOcean],
    },
    ZonalBasin {
        name: "Pacific",
        codes: &[BasinCode::PacificOcean],
    },
    ZonalBasin {
        name: "Indian",
        codes: &[BasinCode::IndianOcean],
    },
];

impl ZonalBasin {
    fn mask(&self, grid: &GridSpec) -> Array2<Float> {
        if self.codes.is_empty() {
            return grid.mask.clone();
        }

        Zip::from(&grid.mask).and(&grid.basin).map_collect(|m, c| {
            if self.codes.iter().any(|b| b.code() == *c) {
                *m
            } else {
                0.0
            }
        })
    }
}

/// Output file name, like `T_Atlantic_xave_bias_WOA05.nc`.
pub fn output_name(tracer: Tracer, basin: &str) -> String {
    format!("{}_{}_xave_bias_WOA05.nc", tracer.prefix(), basin)
}

/// Zonal average bias in one basin.
#[derive(Clone, Debug)]
pub struct ZonalBias {
    pub basin: &'static str,
    /// Row latitudes, midway between `lat_edges`.
    pub lat: Array1<Float>,
    pub lat_edges: Array1<Float>,
    /// Zonal minimum of model interfaces `(nk + 1, nj)`.
    pub interfaces: Array2<Float>,
    pub model: Array2<Float>,
    pub observed: Array2<Float>,
    pub bias: Array2<Float>,
    pub stats: FieldStats,
    pub mesh: QuadMesh,
}

impl ZonalBias {
    pub fn write(&self, path: &Path, tracer: Tracer, title: &str) -> Result<(), InputError> {
        let (nk, nj) = self.bias.dim();

        let mut file = write::create(path)?;
        file.add_attribute("title", format!("{} {}", title, self.basin).trim())?;
        file.add_attribute("history", write::history_entry("computed zonal average bias").as_str())?;
        add_stats_attributes(&mut file, "bias", &self.stats)?;

        file.add_dimension("lat", nj)?;
        file.add_dimension("lat_edge", nj + 1)?;
        file.add_dimension("zl", nk)?;
        file.add_dimension("zi", nk + 1)?;
        file.add_dimension("mesh_x", self.mesh.x.len())?;
        file.add_dimension("mesh_q", self.mesh.q.dim().1)?;

        let latitude = [("long_name", "Latitude"), ("units", "degrees_north")];
        write::put_float(&mut file, "lat", &["lat"], self.lat.view(), &latitude)?;
        write::put_float(&mut file, "lat_edge", &["lat_edge"], self.lat_edges.view(), &latitude)?;
        write::put_float(
            &mut file,
            "e",
            &["zi", "lat"],
            self.interfaces.view(),
            &[("long_name", "Zonal minimum of interface height"), ("units", "m")],
        )?;

        let observed_name = format!("WOA'05 {}", tracer.long_name().to_lowercase());
        let bias_name = format!("{} bias (w.r.t. WOA'05)", tracer.long_name());
        let fields = [
            (&self.model, "model", tracer.long_name()),
            (&self.observed, "observed", observed_name.as_str()),
            (&self.bias, "bias", bias_name.as_str()),
        ];

        for (data, name, long_name) in fields {
            write::put_float32_with_fill(
                &mut file,
                name,
                &["zl", "lat"],
                with_missing(data).view(),
                MISSING_VALUE,
                &[("long_name", long_name), ("units", tracer.units())],
            )?;
        }

        write::put_float(&mut file, "mesh_x", &["mesh_x"], self.mesh.x.view(), &[("units", "degrees_north")])?;
        write::put_float(&mut file, "mesh_z", &["zi", "mesh_x"], self.mesh.z.view(), &[("units", "m")])?;
        write::put_float32_with_fill(
            &mut file,
            "mesh_q",
            &["zl", "mesh_q"],
            with_missing(&self.mesh.q).view(),
            MISSING_VALUE,
            &[("long_name", bias_name.as_str()), ("units", tracer.units())],
        )?;

        Ok(())
    }
}

/// Model interfaces `e` of the first record, when the model has them.
fn model_interfaces(source: &Dataset) -> Result<Option<Array3<Float>>, InputError> {
    if !source.has_variable("e") {
        return Ok(None);
    }

    let e = source.read_filled("e", Float::NAN)?;
    let e = match e.ndim() {
        4 => e.index_axis_move(Axis(0), 0),
        _ => e,
    };

    Ok(Some(io::into_3d(e)?))
}

/// Computes zonal average bias of `tracer` for all basins and writes
/// each into `out_dir`. Interfaces come from the model (`e`) when
/// present, otherwise from the observations (`eta`).
pub fn run_zonal_bias(
    model_files: &[PathBuf],
    obs_file: &Path,
    grid: &GridSpec,
    tracer: Tracer,
    representation: Representation,
    out_dir: &Path,
) -> Result<Vec<ZonalBias>, ToolError> {
    let model_source = Dataset::open_all(model_files)?;
    let obs_source = Dataset::open_all(&[obs_file.to_path_buf()])?;

    let model = read_climatology(&model_source, first_present(&model_source, tracer.model_variables())?)?;
    let observed = read_climatology(&obs_source, first_present(&obs_source, tracer.observed_variables())?)?;
    let obs_eta = io::into_3d(obs_source.read_filled("eta", Float::NAN)?)?;

    let model_eta = match model_interfaces(&model_source)? {
        Some(e) => e,
        None => {
            debug!("No model interfaces, using interfaces of observations");
            obs_eta.clone()
        }
    };

    let (nk, nj, ni) = model.dim();

    if (nj, ni) != grid.dim()
        || observed.dim() != model.dim()
        || obs_eta.dim() != (nk + 1, nj, ni)
        || model_eta.dim() != obs_eta.dim()
    {
        return Err(InputError::Mismatch(format!(
            "model {:?}, observations {:?}, interfaces {:?} and {:?} do not match the grid {:?}",
            model.dim(),
            observed.dim(),
            model_eta.dim(),
            obs_eta.dim(),
            grid.dim()
        ))
        .into());
    }

    let lat_edges: Array1<Float> = grid
        .y
        .rows()
        .into_iter()
        .map(|row| row.fold(Float::NEG_INFINITY, |acc, &v| acc.max(v)))
        .collect();
    let lat: Array1<Float> = lat_edges.windows(2).into_iter().map(|w| 0.5 * (w[0] + w[1])).collect();

    let title = model_source.title();
    let mut results = Vec::with_capacity(ZONAL_BASINS.len());

    for basin in &ZONAL_BASINS {
        let mask = basin.mask(grid);

        let (model_ave, interfaces) =
            zonal_average(model.view(), model_eta.view(), grid.area.view(), mask.view())?;
        let (observed_ave, _) = zonal_average(observed.view(), obs_eta.view(), grid.area.view(), mask.view())?;
        let bias = &model_ave - &observed_ave;

        let weight = section_weight(lat_edges.view(), interfaces.view()).mapv(Float::abs);
        let stats = area_weighted_stats(bias.view(), Some(weight.view()));
        let mesh = section2quadmesh(lat_edges.view(), interfaces.view(), bias.view(), representation)?;

        info!("{} {} zonal bias: {}", basin.name, tracer.prefix(), stats);

        let result = ZonalBias {
            basin: basin.name,
            lat: lat.clone(),
            lat_edges: lat_edges.clone(),
            interfaces,
            model: model_ave,
            observed: observed_ave,
            bias,
            stats,
            mesh,
        };

        result.write(&out_dir.join(output_name(tracer, basin.name)), tracer, &title)?;
        results.push(result);
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::{output_name, run_zonal_bias, Tracer};
    use crate::grid::GridSpec;
    use crate::io::{self, write};
    use crate::toolbox::section::Representation;
    use float_cmp::approx_eq;
    use ndarray::{array, Array2, Array3, Array4};
    use std::path::Path;
    use tempfile::TempDir;

    /// Rows at 0N-10N and 10N-20N, columns in the Atlantic,
    /// Pacific and Indian, the last of the second row is land.
    fn basin_grid() -> GridSpec {
        GridSpec {
            x: Array2::from_shape_fn((3, 4), |(_, i)| 10.0 * i as f64),
            y: Array2::from_shape_fn((3, 4), |(j, _)| 10.0 * j as f64),
            xcenter: Array2::from_shape_fn((2, 3), |(_, i)| 5.0 + 10.0 * i as f64),
            ycenter: Array2::from_shape_fn((2, 3), |(j, _)| 5.0 + 10.0 * j as f64),
            mask: array![[1.0, 1.0, 1.0], [1.0, 1.0, 0.0]],
            area: array![[1.0, 1.0, 1.0], [1.0, 1.0, 0.0]],
            depth: Array2::from_elem((2, 3), 300.0),
            basin: array![[2, 3, 5], [2, 3, 0]],
        }
    }

    fn model_value(k: usize, i: usize) -> f64 {
        10.0 - 5.0 * k as f64 + i as f64
    }

    fn write_files(dir: &Path, model_name: &str, obs_name: &str) {
        {
            let mut file = write::create(&dir.join("annual.nc")).unwrap();
            for (name, len) in [("time", 2), ("zl", 2), ("yh", 2), ("xh", 3)] {
                file.add_dimension(name, len).unwrap();
            }

            // time mean is the model value
            let data = Array4::from_shape_fn((2, 2, 2, 3), |(t, k, _, i)| {
                model_value(k, i) + if t == 0 { 1.0 } else { -1.0 }
            });
            write::put_float(&mut file, model_name, &["time", "zl", "yh", "xh"], data.view(), &[]).unwrap();
        }

        let mut file = write::create(&dir.join("woa.nc")).unwrap();
        for (name, len) in [("depth", 2), ("depth_edges", 3), ("lat", 2), ("lon", 3)] {
            file.add_dimension(name, len).unwrap();
        }

        // one colder in the Atlantic, two elsewhere
        let data = Array3::from_shape_fn((2, 2, 3), |(k, _, i)| model_value(k, i) - if i == 0 { 2.0 } else { 1.0 });
        write::put_float(&mut file, obs_name, &["depth", "lat", "lon"], data.view(), &[]).unwrap();

        let eta = Array3::from_shape_fn((3, 2, 3), |(k, _, _)| [0.0, -100.0, -300.0][k]);
        write::put_float(&mut file, "eta", &["depth_edges", "lat", "lon"], eta.view(), &[]).unwrap();
    }

    #[test]
    fn basin_averages_written() {
        let dir = TempDir::new().unwrap();
        write_files(dir.path(), "thetao", "temp");

        let results = run_zonal_bias(
            &[dir.path().join("annual.nc")],
            &dir.path().join("woa.nc"),
            &basin_grid(),
            Tracer::Temperature,
            Representation::Pcm,
            dir.path(),
        )
        .unwrap();

        let names: Vec<&str> = results.iter().map(|r| r.basin).collect();
        assert_eq!(names, vec!["global", "Atlantic", "Pacific", "Indian"]);

        let global = &results[0];
        assert_eq!(global.lat, array![5.0, 15.0]);
        assert!(approx_eq!(f64, global.model[[0, 0]], 11.0, epsilon = 1.0e-12));
        assert!(approx_eq!(f64, global.bias[[0, 0]], 4.0 / 3.0, epsilon = 1.0e-12));
        assert!(approx_eq!(f64, global.bias[[1, 1]], 1.5, epsilon = 1.0e-12));
        assert_eq!(global.interfaces.column(0).to_vec(), vec![0.0, -100.0, -300.0]);

        assert_eq!(results[1].bias, Array2::from_elem((2, 2), 2.0));
        assert_eq!(results[2].bias, Array2::from_elem((2, 2), 1.0));

        // no Indian ocean in the second row
        let indian = &results[3];
        assert_eq!(indian.bias[[0, 0]], 1.0);
        assert!(indian.bias[[1, 1]].is_nan());
        assert_eq!(indian.interfaces[[2, 1]], 0.0);
        assert_eq!(indian.stats.min, 1.0);

        let output = io::open(&dir.path().join(output_name(Tracer::Temperature, "Atlantic"))).unwrap();
        let bias = io::read_filled(&output, "bias", f64::NAN).unwrap();
        assert_eq!(bias.shape(), &[2, 2]);
        assert!(approx_eq!(f64, bias[[1, 0]], 2.0, epsilon = 1.0e-6));
        assert!(dir.path().join("T_global_xave_bias_WOA05.nc").exists());
    }

    #[test]
    fn salinity_names() {
        let dir = TempDir::new().unwrap();
        write_files(dir.path(), "so", "salt");

        let results = run_zonal_bias(
            &[dir.path().join("annual.nc")],
            &dir.path().join("woa.nc"),
            &basin_grid(),
            Tracer::Salinity,
            Representation::Linear,
            dir.path(),
        )
        .unwrap();

        assert_eq!(results[2].bias, Array2::from_elem((2, 2), 1.0));
        assert!(dir.path().join("S_Pacific_xave_bias_WOA05.nc").exists());

        let missing = run_zonal_bias(
            &[dir.path().join("annual.nc")],
            &dir.path().join("woa.nc"),
            &basin_grid(),
            Tracer::Temperature,
            Representation::Pcm,
            dir.path(),
        );
        assert!(missing.is_err());
    }
}
