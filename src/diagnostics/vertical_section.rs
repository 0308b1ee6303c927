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

//! Vertical sections of model bias against gridded observations
//! along the equator and across the tropical Pacific.
//!
//! Zonal velocity has no observed counterpart and is written
//! for the model alone, across the equatorial currents.

use super::{add_stats_attributes, first_present, with_missing};
use crate::constants::MISSING_VALUE;
use crate::errors::{InputError, ToolError};
use crate::grid::GridSpec;
use crate::io::{self, write, Dataset};
use crate::toolbox::section::{section2quadmesh, QuadMesh, Representation};
use crate::toolbox::stats::{area_weighted_stats, section_weight, FieldStats};
use crate::toolbox::vertical::{get_z, layer_centres, rho_wright97};
use crate::Float;
use log::{debug, info, warn};
use ndarray::{s, Array1, Array2, Array3, ArrayD, ArrayView2, ArrayView3, Axis, Zip};
use std::path::{Path, PathBuf};

const MODEL_TEMPERATURE: [&str; 3] = ["temp", "ptemp", "thetao"];
const OBSERVED_TEMPERATURE: [&str; 2] = ["temp", "ptemp"];
const SALINITY: [&str; 2] = ["salt", "so"];
const ZONAL_VELOCITY: [&str; 1] = ["uo"];

/// Path of a section through the grid.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Track {
    /// Along a latitude, eastwards between two longitudes.
    Zonal {
        lat: Float,
        lon_start: Float,
        lon_end: Float,
    },
    /// Along a longitude, northwards between two latitudes.
    Meridional {
        lon: Float,
        lat_start: Float,
        lat_end: Float,
    },
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SectionLine {
    pub name: &'static str,
    pub track: Track,
}

pub const SECTION_LINES: [SectionLine; 5] = [
    SectionLine {
        name: "Pacific_equator",
        track: Track::Zonal {
            lat: 0.0,
            lon_start: 117.0,
            lon_end: -78.0,
        },
    },
    SectionLine {
        name: "Atlantic_equator",
        track: Track::Zonal {
            lat: 0.0,
            lon_start: -52.0,
            lon_end: 10.5,
        },
    },
    SectionLine {
        name: "170W",
        track: Track::Meridional {
            lon: -170.0,
            lat_start: -20.0,
            lat_end: 20.0,
        },
    },
    SectionLine {
        name: "140W",
        track: Track::Meridional {
            lon: -140.0,
            lat_start: -20.0,
            lat_end: 20.0,
        },
    },
    SectionLine {
        name: "110W",
        track: Track::Meridional {
            lon: -110.0,
            lat_start: -20.0,
            lat_end: 20.0,
        },
    },
];

/// Index range of a section, the end is exclusive.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Cut {
    Row { j: usize, i0: usize, i1: usize },
    Column { i: usize, j0: usize, j1: usize },
}

impl Cut {
    pub fn len(&self) -> usize {
        match *self {
            Cut::Row { i0, i1, .. } => i1 - i0,
            Cut::Column { j0, j1, .. } => j1 - j0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values of `(k, j, i)` field along the section.
    fn slice3(&self, field: ArrayView3<Float>) -> Array2<Float> {
        match *self {
            Cut::Row { j, i0, i1 } => field.slice(s![.., j, i0..i1]).to_owned(),
            Cut::Column { i, j0, j1 } => field.slice(s![.., j0..j1, i]).to_owned(),
        }
    }

    /// Cell centre positions from `xcenter` or `ycenter`.
    fn centres(&self, grid: &GridSpec) -> Array1<Float> {
        match *self {
            Cut::Row { j, i0, i1 } => grid.xcenter.slice(s![j, i0..i1]).to_owned(),
            Cut::Column { i, j0, j1 } => grid.ycenter.slice(s![j0..j1, i]).to_owned(),
        }
    }

    /// Positions of cell faces from the southern or western corners.
    fn edges(&self, grid: &GridSpec) -> Array1<Float> {
        match *self {
            Cut::Row { j, i0, i1 } => grid.x.slice(s![j, i0..=i1]).to_owned(),
            Cut::Column { i, j0, j1 } => grid.y.slice(s![j0..=j1, i]).to_owned(),
        }
    }
}

/// Index of the first minimum.
fn argmin<I: Iterator<Item = Float>>(values: I) -> usize {
    values
        .enumerate()
        .fold((0, Float::INFINITY), |(best, min), (n, v)| {
            if v < min {
                (n, v)
            } else {
                (best, min)
            }
        })
        .0
}

/// Eastward distance in degrees from `lon` to `x`.
fn east_of(x: Float, lon: Float) -> Float {
    (x - lon + 360.0).rem_euclid(360.0)
}

impl Track {
    /// Finds the section on the grid of cell centres. Rows are chosen
    /// by the latitudes of the first column.
    pub fn locate(&self, xcenter: ArrayView2<Float>, ycenter: ArrayView2<Float>) -> Result<Cut, InputError> {
        let row = |lat: Float| argmin(ycenter.column(0).iter().map(|y| (y - lat).abs()));
        let column = |j: usize, lon: Float| argmin(xcenter.row(j).iter().map(|x| east_of(*x, lon)));

        let cut = match *self {
            Track::Zonal {
                lat,
                lon_start,
                lon_end,
            } => {
                let j = row(lat);
                Cut::Row {
                    j,
                    i0: column(j, lon_start),
                    i1: column(j, lon_end),
                }
            }
            Track::Meridional {
                lon,
                lat_start,
                lat_end,
            } => {
                let j0 = row(lat_start);
                Cut::Column {
                    i: column(j0, lon),
                    j0,
                    j1: row(lat_end),
                }
            }
        };

        let reversed = match cut {
            Cut::Row { i0, i1, .. } => i1 <= i0,
            Cut::Column { j0, j1, .. } => j1 <= j0,
        };

        if reversed {
            return Err(InputError::Mismatch(format!(
                "{:?} does not cross the grid in increasing index order ({:?})",
                self, cut
            )));
        }

        Ok(cut)
    }
}

/// Compared quantity.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Field {
    /// Potential temperature \[degC\].
    Temperature,
    /// Potential density anomaly at the surface \[kg m-3\].
    Sigma0,
    /// Zonal velocity \[m s-1\], model only.
    ZonalVelocity,
}

impl Field {
    fn prefix(self) -> &'static str {
        match self {
            Field::Temperature => "T",
            Field::Sigma0 => "sigma0",
            Field::ZonalVelocity => "U",
        }
    }

    fn units(self) -> &'static str {
        match self {
            Field::Temperature => "degC",
            Field::Sigma0 => "kg m-3",
            Field::ZonalVelocity => "m s-1",
        }
    }

    fn long_name(self) -> &'static str {
        match self {
            Field::Temperature => "Potential temperature",
            Field::Sigma0 => "Potential density anomaly",
            Field::ZonalVelocity => "Zonal velocity",
        }
    }

    fn model_variables(self) -> &'static [&'static str] {
        match self {
            Field::ZonalVelocity => &ZONAL_VELOCITY,
            Field::Temperature | Field::Sigma0 => &MODEL_TEMPERATURE,
        }
    }

    fn has_observations(self) -> bool {
        self != Field::ZonalVelocity
    }

    /// Velocity is shown on the meridional lines only.
    fn follows(self, line: &SectionLine) -> bool {
        match self {
            Field::ZonalVelocity => matches!(line.track, Track::Meridional { .. }),
            Field::Temperature | Field::Sigma0 => true,
        }
    }

    /// Reads the first record as `(k, j, i)` array
    /// with missing values as `NaN`.
    fn read(self, source: &Dataset, names: &[&str]) -> Result<Array3<Float>, InputError> {
        let primary = first_record(source, first_present(source, names)?)?;

        match self {
            Field::Temperature | Field::ZonalVelocity => Ok(primary),
            Field::Sigma0 => {
                let salinity = first_record(source, first_present(source, &SALINITY)?)?;
                Ok(sigma0(primary.view(), salinity.view())?)
            }
        }
    }
}

/// `rho(S, T, 0) - 1000` for every point.
pub fn sigma0(temperature: ArrayView3<Float>, salinity: ArrayView3<Float>) -> Result<Array3<Float>, InputError> {
    if temperature.dim() != salinity.dim() {
        return Err(InputError::Mismatch(format!(
            "temperature {:?} and salinity {:?} differ in shape",
            temperature.dim(),
            salinity.dim()
        )));
    }

    Ok(Zip::from(&temperature)
        .and(&salinity)
        .map_collect(|t, s| rho_wright97(*s, *t, 0.0) - 1000.0))
}

fn first_record(source: &Dataset, name: &str) -> Result<Array3<Float>, InputError> {
    let data = source.read_filled(name, Float::NAN)?;
    into_first_record(data, name)
}

fn into_first_record(data: ArrayD<Float>, name: &str) -> Result<Array3<Float>, InputError> {
    match data.ndim() {
        3 => io::into_3d(data),
        4 => io::into_3d(data.index_axis_move(Axis(0), 0)),
        n => Err(InputError::Mismatch(format!("{} has {} dimensions", name, n))),
    }
}

/// Bias along one section.
#[derive(Clone, Debug)]
pub struct SectionBias {
    pub name: String,
    pub cut: Cut,
    pub centres: Array1<Float>,
    pub edges: Array1<Float>,
    /// Interface positions `(nk + 1, n)`.
    pub interfaces: Array2<Float>,
    pub model: Array2<Float>,
    pub observed: Option<Array2<Float>>,
    pub bias: Option<Array2<Float>>,
    /// Statistics of the bias, or of the model without observations.
    pub stats: FieldStats,
    /// Bias (or model) ready for plotting.
    pub mesh: QuadMesh,
}

impl SectionBias {
    pub fn write(&self, path: &Path, field: Field, title: &str) -> Result<(), InputError> {
        let (nk, n) = self.model.dim();
        let mesh_nx = self.mesh.x.len();
        let mesh_nq = self.mesh.q.dim().1;

        let position = match self.cut {
            Cut::Row { .. } => ("Longitude", "degrees_east"),
            Cut::Column { .. } => ("Latitude", "degrees_north"),
        };

        let mut file = write::create(path)?;
        let shown = if self.bias.is_some() { "bias" } else { "model" };

        file.add_attribute("title", format!("{} {}", title, self.name.replace('_', " ")).trim())?;
        file.add_attribute("history", write::history_entry("computed vertical section").as_str())?;
        add_stats_attributes(&mut file, shown, &self.stats)?;

        file.add_dimension("n", n)?;
        file.add_dimension("n_edge", n + 1)?;
        file.add_dimension("zl", nk)?;
        file.add_dimension("zi", nk + 1)?;
        file.add_dimension("mesh_x", mesh_nx)?;
        file.add_dimension("mesh_q", mesh_nq)?;

        write::put_float(
            &mut file,
            "position",
            &["n"],
            self.centres.view(),
            &[("long_name", position.0), ("units", position.1)],
        )?;
        write::put_float(
            &mut file,
            "position_edge",
            &["n_edge"],
            self.edges.view(),
            &[("long_name", position.0), ("units", position.1)],
        )?;
        write::put_float(
            &mut file,
            "e",
            &["zi", "n"],
            self.interfaces.view(),
            &[("long_name", "Interface height"), ("units", "m")],
        )?;

        let mut centres: Array2<Float> = Array2::zeros((nk, n));
        for (i, column) in self.interfaces.columns().into_iter().enumerate() {
            centres.column_mut(i).assign(&layer_centres(column));
        }
        write::put_float(
            &mut file,
            "z",
            &["zl", "n"],
            centres.view(),
            &[("long_name", "Layer centre height"), ("units", "m")],
        )?;

        let observed_name = format!("WOA'05 {}", field.long_name().to_lowercase());
        let bias_name = format!("{} bias (w.r.t. WOA'05)", field.long_name());

        let mut fields = vec![(&self.model, "model", field.long_name())];
        if let Some(observed) = &self.observed {
            fields.push((observed, "observed", observed_name.as_str()));
        }
        if let Some(bias) = &self.bias {
            fields.push((bias, "bias", bias_name.as_str()));
        }

        let mesh_name = match self.bias {
            Some(_) => bias_name.as_str(),
            None => field.long_name(),
        };

        for (data, name, long_name) in fields {
            write::put_float32_with_fill(
                &mut file,
                name,
                &["zl", "n"],
                with_missing(data).view(),
                MISSING_VALUE,
                &[("long_name", long_name), ("units", field.units()), ("coordinates", "z position")],
            )?;
        }

        write::put_float(&mut file, "mesh_x", &["mesh_x"], self.mesh.x.view(), &[("units", position.1)])?;
        write::put_float(&mut file, "mesh_z", &["zi", "mesh_x"], self.mesh.z.view(), &[("units", "m")])?;
        write::put_float32_with_fill(
            &mut file,
            "mesh_q",
            &["zl", "mesh_q"],
            with_missing(&self.mesh.q).view(),
            MISSING_VALUE,
            &[("long_name", mesh_name), ("units", field.units())],
        )?;

        Ok(())
    }
}

/// Output file name, like `T_Pacific_equator_bias_WOA05.nc`.
pub fn output_name(field: Field, section: &str) -> String {
    format!("{}_{}_bias_WOA05.nc", field.prefix(), section)
}

fn section_bias(
    line: &SectionLine,
    cut: Cut,
    grid: &GridSpec,
    model: ArrayView3<Float>,
    observed: Option<ArrayView3<Float>>,
    interfaces: ArrayView3<Float>,
    representation: Representation,
) -> Result<SectionBias, ToolError> {
    let model = cut.slice3(model);
    let observed = observed.map(|o| cut.slice3(o));
    let interfaces = cut.slice3(interfaces);
    let bias = observed.as_ref().map(|o| &model - o);
    let shown = bias.as_ref().unwrap_or(&model);

    let edges = cut.edges(grid);
    let weight = section_weight(edges.view(), interfaces.view()).mapv(Float::abs);
    let stats = area_weighted_stats(shown.view(), Some(weight.view()));
    let mesh = section2quadmesh(edges.view(), interfaces.view(), shown.view(), representation)?;

    Ok(SectionBias {
        name: line.name.to_string(),
        cut,
        centres: cut.centres(grid),
        edges,
        interfaces,
        model,
        observed,
        bias,
        stats,
        mesh,
    })
}

/// Interface positions of the observations (`eta`) when present,
/// otherwise of the model.
fn interfaces(
    obs: &Dataset,
    model: &Dataset,
    grid: &GridSpec,
    model_var: &str,
) -> Result<Array3<Float>, ToolError> {
    if obs.has_variable("eta") {
        debug!("Using interfaces of observations");
        return Ok(into_first_record(obs.read("eta")?, "eta")?);
    }

    Ok(get_z(model, grid.depth.view(), model_var)?)
}

/// Computes the bias of all predefined sections followed by `field`
/// and writes each into `out_dir`. Sections not found on the grid
/// are skipped. Interfaces come from the observation file even when
/// the field has no observations.
pub fn run_vertical_sections(
    model_files: &[PathBuf],
    obs_file: &Path,
    grid: &GridSpec,
    field: Field,
    representation: Representation,
    out_dir: &Path,
) -> Result<Vec<SectionBias>, ToolError> {
    let model_source = Dataset::open_all(model_files)?;
    let obs_source = Dataset::open_all(&[obs_file.to_path_buf()])?;

    let model = field.read(&model_source, field.model_variables())?;
    let observed = if field.has_observations() {
        Some(field.read(&obs_source, &OBSERVED_TEMPERATURE)?)
    } else {
        None
    };
    let model_var = first_present(&model_source, field.model_variables())?;
    let interfaces = interfaces(&obs_source, &model_source, grid, model_var)?;

    let (nk, nj, ni) = model.dim();
    let observed_fits = observed.as_ref().map_or(true, |o| o.dim() == (nk, nj, ni));

    if !observed_fits || interfaces.dim() != (nk + 1, nj, ni) || grid.dim() != (nj, ni) {
        return Err(InputError::Mismatch(format!(
            "model {:?}, observations {:?}, interfaces {:?} and grid {:?} do not match",
            model.dim(),
            observed.as_ref().map(|o| o.dim()),
            interfaces.dim(),
            grid.dim()
        ))
        .into());
    }

    let title = model_source.title();
    let mut sections = Vec::with_capacity(SECTION_LINES.len());

    for line in SECTION_LINES.iter().filter(|line| field.follows(line)) {
        let cut = match line.track.locate(grid.xcenter.view(), grid.ycenter.view()) {
            Ok(cut) => cut,
            Err(err) => {
                warn!("Skipping {} section: {}", line.name, err);
                continue;
            }
        };

        let section = section_bias(
            line,
            cut,
            grid,
            model.view(),
            observed.as_ref().map(|o| o.view()),
            interfaces.view(),
            representation,
        )?;

        info!("{} {} section: {}", line.name, field.prefix(), section.stats);

        section.write(&out_dir.join(output_name(field, line.name)), field, &title)?;
        sections.push(section);
    }

    Ok(sections)
}

#[cfg(test)]
mod tests {
    use super::{output_name, run_vertical_sections, sigma0, Cut, Field, Track, SECTION_LINES};
    use crate::grid::GridSpec;
    use crate::io::{self, write};
    use crate::toolbox::section::Representation;
    use crate::toolbox::vertical::rho_wright97;
    use float_cmp::approx_eq;
    use ndarray::{array, Array2, Array3, Array4};
    use tempfile::TempDir;

    /// 5 rows centred at 40S to 40N, 6 columns centred at 30E to 330E.
    fn global_grid() -> GridSpec {
        GridSpec {
            x: Array2::from_shape_fn((6, 7), |(_, i)| 60.0 * i as f64),
            y: Array2::from_shape_fn((6, 7), |(j, _)| -50.0 + 20.0 * j as f64),
            xcenter: Array2::from_shape_fn((5, 6), |(_, i)| 30.0 + 60.0 * i as f64),
            ycenter: Array2::from_shape_fn((5, 6), |(j, _)| -40.0 + 20.0 * j as f64),
            mask: Array2::ones((5, 6)),
            area: Array2::ones((5, 6)),
            depth: Array2::from_elem((5, 6), 500.0),
            basin: Array2::from_elem((5, 6), 3),
        }
    }

    #[test]
    fn tracks_located_on_grid() {
        let grid = global_grid();
        let locate = |n: usize| SECTION_LINES[n].track.locate(grid.xcenter.view(), grid.ycenter.view());

        assert_eq!(locate(0).unwrap(), Cut::Row { j: 2, i0: 2, i1: 5 });
        // 52W lies east of 10.5E on this grid
        assert!(locate(1).is_err());
        assert_eq!(locate(3).unwrap(), Cut::Column { i: 4, j0: 1, j1: 3 });

        let track = Track::Meridional {
            lon: 90.0,
            lat_start: -40.0,
            lat_end: 40.0,
        };
        let cut = track.locate(grid.xcenter.view(), grid.ycenter.view()).unwrap();
        assert_eq!(cut, Cut::Column { i: 1, j0: 0, j1: 4 });
        assert_eq!(cut.len(), 4);
    }

    #[test]
    fn sigma0_from_wright() {
        let t = Array3::from_elem((1, 1, 2), 10.0);
        let s = Array3::from_elem((1, 1, 2), 35.0);

        let sigma = sigma0(t.view(), s.view()).unwrap();
        assert!(approx_eq!(f64, sigma[[0, 0, 1]], rho_wright97(35.0, 10.0, 0.0) - 1000.0, ulps = 2));
        assert!(sigma0(t.view(), Array3::zeros((1, 1, 1)).view()).is_err());
    }

    #[test]
    fn temperature_bias_sections_written() {
        let dir = TempDir::new().unwrap();
        let model_path = dir.path().join("annual.nc");
        let obs_path = dir.path().join("woa.nc");

        {
            let mut file = write::create(&model_path).unwrap();
            for (name, len) in [("time", 1), ("zl", 2), ("yh", 5), ("xh", 6)] {
                file.add_dimension(name, len).unwrap();
            }
            file.add_attribute("title", "Test run").unwrap();

            let temp = Array4::from_shape_fn((1, 2, 5, 6), |(_, k, _, _)| if k == 0 { 10.0 } else { 5.0 });
            write::put_float(&mut file, "temp", &["time", "zl", "yh", "xh"], temp.view(), &[]).unwrap();
        }

        {
            let mut file = write::create(&obs_path).unwrap();
            for (name, len) in [("depth", 2), ("depth_edges", 3), ("lat", 5), ("lon", 6)] {
                file.add_dimension(name, len).unwrap();
            }

            let temp = Array3::from_shape_fn((2, 5, 6), |(k, _, _)| if k == 0 { 9.0 } else { 5.0 });
            write::put_float(&mut file, "temp", &["depth", "lat", "lon"], temp.view(), &[]).unwrap();

            let eta = Array3::from_shape_fn((3, 5, 6), |(k, _, _)| [0.0, -100.0, -500.0][k]);
            write::put_float(&mut file, "eta", &["depth_edges", "lat", "lon"], eta.view(), &[]).unwrap();
        }

        let sections = run_vertical_sections(
            &[model_path],
            &obs_path,
            &global_grid(),
            Field::Temperature,
            Representation::Pcm,
            dir.path(),
        )
        .unwrap();

        assert_eq!(sections.len(), 4);

        let pacific = &sections[0];
        assert_eq!(pacific.name, "Pacific_equator");
        assert_eq!(pacific.centres, array![150.0, 210.0, 270.0]);
        assert_eq!(pacific.edges, array![120.0, 180.0, 240.0, 300.0]);
        assert_eq!(pacific.bias, Some(array![[1.0, 1.0, 1.0], [0.0, 0.0, 0.0]]));
        assert_eq!(pacific.mesh.x.len(), 6);

        // layers 100 m and 400 m thick
        assert!(approx_eq!(f64, pacific.stats.mean.unwrap(), 0.2, epsilon = 1.0e-12));

        let output = io::open(&dir.path().join(output_name(Field::Temperature, "Pacific_equator"))).unwrap();
        let z = io::read_2d(&output, "z").unwrap();
        assert_eq!(z.column(0).to_vec(), vec![-50.0, -300.0]);
        let bias = io::read_filled(&output, "bias", f64::NAN).unwrap();
        assert_eq!(bias.shape(), &[2, 3]);

        assert!(!dir.path().join(output_name(Field::Temperature, "Atlantic_equator")).exists());
        assert!(dir.path().join("T_110W_bias_WOA05.nc").exists());
    }

    #[test]
    fn velocity_sections_without_observations() {
        let dir = TempDir::new().unwrap();
        let model_path = dir.path().join("annual.nc");
        let obs_path = dir.path().join("woa.nc");

        {
            let mut file = write::create(&model_path).unwrap();
            for (name, len) in [("time", 1), ("zl", 2), ("yh", 5), ("xq", 6)] {
                file.add_dimension(name, len).unwrap();
            }

            let uo = Array4::from_shape_fn((1, 2, 5, 6), |(_, k, _, _)| if k == 0 { 0.5 } else { 0.0 });
            write::put_float(&mut file, "uo", &["time", "zl", "yh", "xq"], uo.view(), &[]).unwrap();
        }

        {
            // interfaces only, no observed temperature
            let mut file = write::create(&obs_path).unwrap();
            for (name, len) in [("depth_edges", 3), ("lat", 5), ("lon", 6)] {
                file.add_dimension(name, len).unwrap();
            }

            let eta = Array3::from_shape_fn((3, 5, 6), |(k, _, _)| [0.0, -100.0, -500.0][k]);
            write::put_float(&mut file, "eta", &["depth_edges", "lat", "lon"], eta.view(), &[]).unwrap();
        }

        let sections = run_vertical_sections(
            &[model_path],
            &obs_path,
            &global_grid(),
            Field::ZonalVelocity,
            Representation::Pcm,
            dir.path(),
        )
        .unwrap();

        let names: Vec<&str> = sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["170W", "140W", "110W"]);

        let section = &sections[1];
        assert!(section.observed.is_none());
        assert!(section.bias.is_none());
        assert_eq!(section.model, array![[0.5, 0.5], [0.0, 0.0]]);
        assert!(approx_eq!(f64, section.stats.mean.unwrap(), 0.1, epsilon = 1.0e-12));

        let output = io::open(&dir.path().join(output_name(Field::ZonalVelocity, "140W"))).unwrap();
        assert!(output.variable("bias").is_none());
        assert_eq!(io::read_filled(&output, "model", f64::NAN).unwrap().shape(), &[2, 2]);

        assert!(!dir.path().join("U_Pacific_equator_bias_WOA05.nc").exists());
        assert!(dir.path().join("U_170W_bias_WOA05.nc").exists());
    }
}
