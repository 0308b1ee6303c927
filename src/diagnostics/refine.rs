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

//! CMIP6 refine-diag of monthly ocean output.
//!
//! Overturning mass streamfunctions are computed for three regions
//! and stored with the coordinates and time averaging information
//! of the input file, in a new file with `_refined` suffix.
//! Heat transports of the 2D monthly output are refined the same way.

use super::overturning::moc_masked;
use crate::constants::MISSING_VALUE;
use crate::errors::{InputError, ToolError};
use crate::io::{self, write};
use crate::toolbox::basins::{atlantic_arctic_mask, indo_pacific_mask};
use crate::Float;
use log::{debug, info, warn};
use ndarray::{
    concatenate, s, Array2, Array3, Array4, ArrayView1, ArrayView2, ArrayView3, Axis, Ix1, Ix3,
    Ix4,
};
use rayon::prelude::*;
use rayon::ThreadPool;
use std::fs;
use std::path::{Path, PathBuf};

pub const REGIONS: [&str; 3] = ["atlantic_arctic_ocean", "indian_pacific_ocean", "global_ocean"];
const REGION_STRLEN: usize = 21;

const TIME_AVERAGING: [&str; 4] = ["average_T1", "average_T2", "average_DT", "time_bnds"];

/// Vertical coordinate of the diagnosed output.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VerticalAxis {
    /// z* levels, `z_l` and `z_i` on tracer rows `yh`.
    Depth,
    /// Potential density referenced to 2000 dbar, `rho2_l` and `rho2_i`
    /// on velocity rows `yq`.
    Density,
}

/// Streamfunction diagnosed from one transport variable.
struct Product {
    source: &'static str,
    name: &'static str,
    long_name: &'static str,
    standard_name: &'static str,
}

const MEAN_FLOW: &str = "Ocean Y Overturning Mass Streamfunction";
const MESOSCALE: &str = "ocean Y overturning mass streamfunction due to parameterized mesoscale advection";
const SUBMESOSCALE: &str =
    "ocean Y overturning mass streamfunction due to parameterized submesoscale advection";

const DEPTH_PRODUCTS: [Product; 3] = [
    Product {
        source: "vmo",
        name: "msftyyz",
        long_name: MEAN_FLOW,
        standard_name: "ocean_y_overturning_mass_streamfunction",
    },
    Product {
        source: "vhGM",
        name: "msftyzmpa",
        long_name: MESOSCALE,
        standard_name: "ocean_y_overturning_mass_streamfunction_due_to_parameterized_mesoscale_advection",
    },
    Product {
        source: "vhml",
        name: "msftyzsmpa",
        long_name: SUBMESOSCALE,
        standard_name:
            "ocean_meridional_overturning_mass_streamfunction_due_to_parameterized_submesoscale_advection",
    },
];

const DENSITY_PRODUCTS: [Product; 2] = [
    Product {
        source: "vmo",
        name: "msftyrho",
        long_name: MEAN_FLOW,
        standard_name: "ocean_y_overturning_mass_streamfunction",
    },
    Product {
        source: "vhGM",
        name: "msftyrhompa",
        long_name: MESOSCALE,
        standard_name: "ocean_y_overturning_mass_streamfunction_due_to_parameterized_mesoscale_advection",
    },
];

impl VerticalAxis {
    fn layer(self) -> &'static str {
        match self {
            VerticalAxis::Depth => "z_l",
            VerticalAxis::Density => "rho2_l",
        }
    }

    fn interface(self) -> &'static str {
        match self {
            VerticalAxis::Depth => "z_i",
            VerticalAxis::Density => "rho2_i",
        }
    }

    fn latitude(self) -> &'static str {
        match self {
            VerticalAxis::Depth => "yh",
            VerticalAxis::Density => "yq",
        }
    }

    fn cell_methods(self) -> &'static str {
        match self {
            VerticalAxis::Depth => "z_i:sum yh:sum basin:mean time:mean",
            VerticalAxis::Density => "rho2_i:point yq:point time:mean",
        }
    }

    fn products(self) -> &'static [Product] {
        match self {
            VerticalAxis::Depth => &DEPTH_PRODUCTS,
            VerticalAxis::Density => &DENSITY_PRODUCTS,
        }
    }
}

/// Name of refined file: `_refined` is appended to the
/// second-to-last dot-separated part of `name`.
pub fn refined_name(name: &str) -> String {
    let mut parts: Vec<String> = name.split('.').map(String::from).collect();
    let n = parts.len();
    let stem = if n >= 2 { n - 2 } else { 0 };
    parts[stem].push_str("_refined");

    parts.join(".")
}

/// Output path from explicit name or from `filename` attribute
/// (or base name) of the input, placed in `refine_dir` when given.
fn output_path(
    input: &Path,
    file: &netcdf::File,
    outfile: Option<&Path>,
    refine_dir: Option<&Path>,
) -> PathBuf {
    let name = match outfile {
        Some(path) => path.to_path_buf(),
        None => {
            let original = io::global_string_attribute(file, "filename").unwrap_or_else(|| {
                input
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });
            PathBuf::from(refined_name(&original))
        }
    };

    match refine_dir {
        Some(dir) => dir.join(name),
        None => name,
    }
}

/// Basin masks `(atlantic_arctic, indo_pacific)` padded with an empty
/// row when the transport has one more row than the basin codes.
fn region_masks(basin_file: &Path, nj: usize) -> Result<[Array2<Float>; 2], InputError> {
    let codes = io::read_filled(&io::open(basin_file)?, "basin", 0.0).and_then(io::into_2d)?;
    let codes = codes.mapv(|c| c.round() as i32);
    let (code_nj, code_ni) = codes.dim();

    let atlantic = atlantic_arctic_mask(codes.view());
    let indo_pacific = indo_pacific_mask(codes.view());

    if nj == code_nj {
        return Ok([atlantic, indo_pacific]);
    }

    if nj != code_nj + 1 {
        return Err(InputError::Mismatch(format!(
            "transport has {} rows but basin codes have {}",
            nj, code_nj
        )));
    }

    debug!("Symmetric grid, padding basin masks with an empty row");
    let empty = Array2::zeros((1, code_ni));
    let pad = |m: Array2<Float>| concatenate(Axis(0), &[m.view(), empty.view()]);

    Ok([pad(atlantic)?, pad(indo_pacific)?])
}

/// Streamfunction `(nt, region, nk + 1, nj)` for all regions.
fn regional_moc(
    vmo: &Array4<Float>,
    masks: &[Array2<Float>; 2],
    pool: &ThreadPool,
) -> Array4<Float> {
    let (nt, nk, nj, _) = vmo.dim();

    let regions: Vec<Array3<Float>> = pool.install(|| {
        [Some(&masks[0]), Some(&masks[1]), None]
            .par_iter()
            .map(|mask| moc_masked(vmo.view(), mask.map(|m| m.view())))
            .collect()
    });

    let mut msft = Array4::from_elem((nt, REGIONS.len(), nk + 1, nj), Float::NAN);

    for (r, region) in regions.iter().enumerate() {
        msft.slice_mut(s![.., r, .., ..]).assign(region);
    }

    msft
}

/// Runs the refine-diag and returns the path of written file,
/// or `None` when the input has none of the transport variables.
pub fn run_refine_diag(
    input: &Path,
    basin_file: &Path,
    axis: VerticalAxis,
    outfile: Option<&Path>,
    refine_dir: Option<&Path>,
    pool: &ThreadPool,
) -> Result<Option<PathBuf>, ToolError> {
    let source = io::open(input)?;

    let available: Vec<&Product> = axis
        .products()
        .iter()
        .filter(|p| source.variable(p.source).is_some())
        .collect();

    if available.is_empty() {
        warn!(
            "None of the transport variables found in {}, nothing to refine",
            input.display()
        );
        return Ok(None);
    }

    let n_interfaces = io::read_array(&source, axis.interface())?.len();
    let n_rows = io::read_array(&source, axis.latitude())?.len();

    let masks = region_masks(basin_file, n_rows)?;

    let mut fields = Vec::with_capacity(available.len());

    for product in &available {
        info!("Computing {} from {}", product.name, product.source);

        let vmo = io::read_filled(&source, product.source, Float::NAN)?
            .into_dimensionality::<Ix4>()
            .map_err(InputError::from)?;
        let (_, nk, nj, ni) = vmo.dim();

        if nk + 1 != n_interfaces || nj != n_rows || masks[0].dim() != (nj, ni) {
            return Err(InputError::Mismatch(format!(
                "{} of shape {:?} does not match {} interfaces, {} rows and basin masks of shape {:?}",
                product.source,
                vmo.dim(),
                n_interfaces,
                n_rows,
                masks[0].dim()
            ))
            .into());
        }

        fields.push((product, regional_moc(&vmo, &masks, pool)));
    }

    let out_path = output_path(input, &source, outfile, refine_dir);
    let mut out = create_refined(&out_path)?;
    write::copy_global_attributes(&source, &mut out, &[])?;
    out.add_attribute("filename", &*out_path.to_string_lossy())?;

    write::copy_coordinate(&source, &mut out, "time", true)?;
    out.add_dimension("basin", REGIONS.len())?;
    out.add_dimension("strlen", REGION_STRLEN)?;

    for coord in [axis.latitude(), axis.layer(), axis.interface(), "nv"] {
        write::copy_coordinate(&source, &mut out, coord, false)?;
    }

    write::put_char_array(
        &mut out,
        "region",
        &["basin", "strlen"],
        &REGIONS,
        REGION_STRLEN,
        &[("standard_name", "region")],
    )?;

    let dims = ["time", "basin", axis.interface(), axis.latitude()];

    for (product, msft) in &fields {
        let mut attrs = vec![
            ("long_name", product.long_name),
            ("units", "kg s-1"),
            ("cell_methods", axis.cell_methods()),
            ("time_avg_info", "average_T1,average_T2,average_DT"),
            ("standard_name", product.standard_name),
        ];

        if axis == VerticalAxis::Density {
            attrs.push(("coordinates", "region"));
        }

        write::put_float32_records(&mut out, product.name, &dims, msft.view(), MISSING_VALUE, &attrs)?;
    }

    copy_time_averaging(&source, &mut out)?;

    Ok(Some(out_path))
}

fn create_refined(out_path: &Path) -> Result<netcdf::FileMut, ToolError> {
    if out_path.exists() {
        debug!("Removing existing {}", out_path.display());
        fs::remove_file(out_path)?;
    }

    info!("Writing {}", out_path.display());

    Ok(write::create(out_path)?)
}

fn copy_time_averaging(source: &netcdf::File, out: &mut netcdf::FileMut) -> Result<(), InputError> {
    for name in TIME_AVERAGING {
        if source.variable(name).is_some() {
            write::copy_record_variable(source, out, name)?;
        } else {
            warn!("Time averaging variable {} not found in input", name);
        }
    }

    Ok(())
}

/// Heat transport diagnosed from advective and diffusive
/// tracer transports of the 2D output.
struct HeatProduct {
    advective: &'static str,
    diffusive: &'static str,
    name: &'static str,
    long_name: &'static str,
    cell_methods: &'static str,
    standard_name: &'static str,
}

const HFY: HeatProduct = HeatProduct {
    advective: "T_ady_2d",
    diffusive: "ndiff_tracer_trans_y_2d_T",
    name: "hfy",
    long_name: "Ocean Heat Y Transport",
    cell_methods: "yq:point xh:mean time:mean",
    standard_name: "ocean_heat_y_transport",
};

const HFX: HeatProduct = HeatProduct {
    advective: "T_adx_2d",
    diffusive: "ndiff_tracer_trans_x_2d_T",
    name: "hfx",
    long_name: "Ocean Heat X Transport",
    cell_methods: "yh:mean xq:point time:mean",
    standard_name: "ocean_heat_x_transport",
};

/// Southern limit of the Indo-Pacific heat transport (degrees north).
pub const INDO_PACIFIC_SOUTH: Float = -34.0;

impl HeatProduct {
    /// Advective plus diffusive transport `(time, j, i)`, `NaN` on land.
    fn read(&self, source: &netcdf::File) -> Result<Array3<Float>, InputError> {
        let mut total = io::read_filled(source, self.advective, Float::NAN)?
            .into_dimensionality::<Ix3>()?;

        if source.variable(self.diffusive).is_some() {
            let diffusive = io::read_filled(source, self.diffusive, Float::NAN)?
                .into_dimensionality::<Ix3>()?;

            if diffusive.dim() != total.dim() {
                return Err(InputError::Mismatch(format!(
                    "{} of shape {:?} does not match {} of shape {:?}",
                    self.diffusive,
                    diffusive.dim(),
                    self.advective,
                    total.dim()
                )));
            }
            total += &diffusive;
        } else {
            warn!(
                "{} not found, {} is the advective transport only",
                self.diffusive, self.name
            );
        }

        Ok(total)
    }
}

/// Zonally summed heat transport `(time, j)` within the mask.
/// Rows without any ocean in the mask, or south of `min_lat`
/// when given, are `NaN`.
pub fn heat_trans_by_basin(
    hfy: ArrayView3<Float>,
    mask: Option<ArrayView2<Float>>,
    lat: ArrayView1<Float>,
    min_lat: Option<Float>,
) -> Array2<Float> {
    let (nt, nj, ni) = hfy.dim();

    Array2::from_shape_fn((nt, nj), |(t, j)| {
        let open = mask.as_ref().map_or(true, |m| m.row(j).sum() != 0.0);
        let north = min_lat.map_or(true, |min| lat[j] >= min);

        if !(open && north) {
            return Float::NAN;
        }

        (0..ni)
            .map(|i| {
                let weight = mask.as_ref().map_or(1.0, |m| m[[j, i]]);
                let value = hfy[[t, j, i]];
                if value.is_nan() {
                    0.0
                } else {
                    value * weight
                }
            })
            .sum()
    })
}

/// Refines `hfy`, `hfx` and the basin sums `hfbasin` of the 2D
/// monthly output and returns the path of written file.
pub fn run_heat_refine_diag(
    input: &Path,
    basin_file: &Path,
    outfile: Option<&Path>,
    refine_dir: Option<&Path>,
) -> Result<PathBuf, ToolError> {
    let source = io::open(input)?;

    info!("Computing {} and {}", HFY.name, HFX.name);
    let hfy = HFY.read(&source)?;
    let hfx = HFX.read(&source)?;

    let (nt, nj, ni) = hfy.dim();
    let lat = io::read_array(&source, "yq")?
        .into_dimensionality::<Ix1>()
        .map_err(InputError::from)?;

    if hfx.dim() != hfy.dim() || lat.len() != nj {
        return Err(InputError::Mismatch(format!(
            "{} {:?}, {} {:?} and {} latitudes of yq do not match",
            HFY.name,
            hfy.dim(),
            HFX.name,
            hfx.dim(),
            lat.len()
        ))
        .into());
    }

    let [atlantic, indo_pacific] = region_masks(basin_file, nj)?;

    if atlantic.dim() != (nj, ni) {
        return Err(InputError::Mismatch(format!(
            "basin masks of shape {:?} do not match {} of shape {:?}",
            atlantic.dim(),
            HFY.name,
            hfy.dim()
        ))
        .into());
    }

    let lat = lat.view();

    let by_region = [
        heat_trans_by_basin(hfy.view(), Some(atlantic.view()), lat, None),
        heat_trans_by_basin(hfy.view(), Some(indo_pacific.view()), lat, Some(INDO_PACIFIC_SOUTH)),
        heat_trans_by_basin(hfy.view(), None, lat, None),
    ];

    let mut hfbasin = Array3::from_elem((nt, REGIONS.len(), nj), Float::NAN);
    for (r, transport) in by_region.iter().enumerate() {
        hfbasin.slice_mut(s![.., r, ..]).assign(transport);
    }

    let out_path = output_path(input, &source, outfile, refine_dir);
    let mut out = create_refined(&out_path)?;
    write::copy_global_attributes(&source, &mut out, &["associated_files"])?;
    out.add_attribute("filename", &*out_path.to_string_lossy())?;

    write::copy_coordinate(&source, &mut out, "time", true)?;
    out.add_dimension("basin", REGIONS.len())?;
    out.add_dimension("strlen", REGION_STRLEN)?;

    for coord in ["yq", "xh", "nv"] {
        write::copy_coordinate(&source, &mut out, coord, false)?;
    }

    write::put_char_array(
        &mut out,
        "region",
        &["basin", "strlen"],
        &REGIONS,
        REGION_STRLEN,
        &[("standard_name", "region")],
    )?;

    // hfx is stored on the hfy dimensions, which have the same
    // lengths on a non-symmetric grid
    for (product, field) in [(&HFY, &hfy), (&HFX, &hfx)] {
        let attrs = [
            ("long_name", product.long_name),
            ("units", "W"),
            ("cell_methods", product.cell_methods),
            ("time_avg_info", "average_T1,average_T2,average_DT"),
            ("standard_name", product.standard_name),
        ];
        write::put_float32_records_3d(
            &mut out,
            product.name,
            &["time", "yq", "xh"],
            field.view(),
            MISSING_VALUE,
            &attrs,
        )?;
    }

    let attrs = [
        ("long_name", "Northward Ocean Heat Transport"),
        ("units", "W"),
        ("coordinates", "region"),
        ("cell_methods", "yq:point time:mean"),
        ("time_avg_info", "average_T1,average_T2,average_DT"),
        ("comment", "Indo-Pacific heat transport begins at 34 S"),
        ("standard_name", "northward_ocean_heat_transport"),
    ];
    write::put_float32_records_3d(
        &mut out,
        "hfbasin",
        &["time", "basin", "yq"],
        hfbasin.view(),
        MISSING_VALUE,
        &attrs,
    )?;

    copy_time_averaging(&source, &mut out)?;

    Ok(out_path)
}

#[cfg(test)]
mod tests {
    use super::{heat_trans_by_basin, refined_name, run_heat_refine_diag, run_refine_diag, VerticalAxis};
    use crate::grid::write_basin_codes;
    use crate::io::{self, write};
    use ndarray::{array, Array1, Array3, Array4, Ix3, Ix4};
    use rayon::ThreadPoolBuilder;
    use tempfile::TempDir;

    #[test]
    fn refined_suffix_before_extension() {
        assert_eq!(refined_name("ocean_month_z.nc"), "ocean_month_z_refined.nc");
        assert_eq!(
            refined_name("19000101.ocean_month_z.nc"),
            "19000101.ocean_month_z_refined.nc"
        );
        assert_eq!(refined_name("plain"), "plain_refined");
    }

    fn write_input(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("19000101.ocean_month_z.nc");
        let mut file = write::create(&path).unwrap();
        file.add_attribute("title", "test run").unwrap();

        for (name, len) in [("time", 2), ("z_l", 2), ("z_i", 3), ("yh", 2), ("xh", 2), ("nv", 2)] {
            file.add_dimension(name, len).unwrap();
        }

        let coords: [(&str, Array1<f64>); 5] = [
            ("time", array![15.5, 45.0]),
            ("z_l", array![5.0, 15.0]),
            ("z_i", array![0.0, 10.0, 20.0]),
            ("yh", array![-10.0, 10.0]),
            ("nv", array![1.0, 2.0]),
        ];
        for (name, values) in &coords {
            write::put_float(&mut file, name, &[*name], values.view(), &[("units", "none")]).unwrap();
        }

        let vmo = Array4::from_shape_fn((2, 2, 2, 2), |(t, _, _, _)| (t + 1) as f64);
        write::put_float(&mut file, "vmo", &["time", "z_l", "yh", "xh"], vmo.view(), &[]).unwrap();

        for name in ["average_T1", "average_T2", "average_DT"] {
            write::put_float(&mut file, name, &["time"], array![1.0, 2.0].view(), &[]).unwrap();
        }
        let bounds = array![[0.0, 31.0], [31.0, 59.0]];
        write::put_float(&mut file, "time_bnds", &["time", "nv"], bounds.view(), &[]).unwrap();

        path
    }

    fn write_basins(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("basin_codes.nc");
        let mut file = write::create(&path).unwrap();
        file.add_dimension("ny", 2).unwrap();
        file.add_dimension("nx", 2).unwrap();
        write_basin_codes(&mut file, &["ny", "nx"], array![[2, 3], [0, 5]].view()).unwrap();

        path
    }

    #[test]
    fn refined_file_has_all_regions() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir);
        let basins = write_basins(&dir);
        let pool = ThreadPoolBuilder::new().num_threads(2).build().unwrap();

        let out = run_refine_diag(&input, &basins, VerticalAxis::Depth, None, Some(dir.path()), &pool)
            .unwrap()
            .unwrap();

        assert_eq!(out, dir.path().join("19000101.ocean_month_z_refined.nc"));

        let refined = io::open(&out).unwrap();
        let msft = io::read_filled(&refined, "msftyyz", f64::NAN)
            .unwrap()
            .into_dimensionality::<Ix4>()
            .unwrap();
        assert_eq!(msft.dim(), (2, 3, 3, 2));

        // global, first record, first row
        assert_eq!(msft[[0, 2, 0, 0]], -4.0);
        assert_eq!(msft[[0, 2, 2, 0]], 0.0);
        // atlantic has one column in the first row only
        assert_eq!(msft[[0, 0, 0, 0]], -2.0);
        assert!(msft[[0, 0, 0, 1]].is_nan());
        // indo-pacific, second record
        assert_eq!(msft[[1, 1, 0, 1]], -4.0);
        assert_eq!(msft[[1, 2, 0, 1]], -8.0);

        assert!(refined.variable("msftyzmpa").is_none());
        assert_eq!(io::read_array(&refined, "time").unwrap().len(), 2);
        assert_eq!(io::read_array(&refined, "time_bnds").unwrap().shape(), &[2, 2]);

        let region: Vec<i8> = io::variable(&refined, "region").unwrap().get_values(..).unwrap();
        let first: String = region[..21]
            .iter()
            .take_while(|b| **b != 0)
            .map(|b| *b as u8 as char)
            .collect();
        assert_eq!(first, "atlantic_arctic_ocean");

        assert_eq!(io::global_string_attribute(&refined, "title").as_deref(), Some("test run"));

        // existing output is replaced
        assert!(run_refine_diag(&input, &basins, VerticalAxis::Depth, None, Some(dir.path()), &pool)
            .unwrap()
            .is_some());
    }

    #[test]
    fn nothing_to_refine_in_density_space() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("ocean_month_rho2.nc");
        {
            let mut file = write::create(&input).unwrap();
            file.add_dimension("yq", 2).unwrap();
            write::put_float(&mut file, "yq", &["yq"], array![0.0, 1.0].view(), &[]).unwrap();
        }
        let basins = write_basins(&dir);
        let pool = ThreadPoolBuilder::new().num_threads(1).build().unwrap();

        let out = run_refine_diag(&input, &basins, VerticalAxis::Density, None, None, &pool).unwrap();
        assert!(out.is_none());
    }

    fn write_heat_input(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("19000101.ocean_month.nc");
        let mut file = write::create(&path).unwrap();
        file.add_attribute("associated_files", "areacello: 19000101.ocean_static.nc")
            .unwrap();

        for (name, len) in [("time", 2), ("yq", 2), ("xh", 2), ("nv", 2)] {
            file.add_dimension(name, len).unwrap();
        }

        let coords: [(&str, Array1<f64>); 4] = [
            ("time", array![15.5, 45.0]),
            ("yq", array![-40.0, 10.0]),
            ("xh", array![-100.0, 50.0]),
            ("nv", array![1.0, 2.0]),
        ];
        for (name, values) in &coords {
            write::put_float(&mut file, name, &[*name], values.view(), &[("units", "none")]).unwrap();
        }

        let dims = ["time", "yq", "xh"];
        let ady = Array3::from_shape_fn((2, 2, 2), |(t, j, i)| ((t + 1) * (1 + 2 * j + i)) as f64);
        write::put_float(&mut file, "T_ady_2d", &dims, ady.view(), &[]).unwrap();
        let diffusive = Array3::from_elem((2, 2, 2), 0.5);
        write::put_float(&mut file, "ndiff_tracer_trans_y_2d_T", &dims, diffusive.view(), &[])
            .unwrap();
        let adx = Array3::from_elem((2, 2, 2), 7.0);
        write::put_float(&mut file, "T_adx_2d", &dims, adx.view(), &[]).unwrap();

        path
    }

    #[test]
    fn heat_transports_by_region() {
        let dir = TempDir::new().unwrap();
        let input = write_heat_input(&dir);
        let basins = write_basins(&dir);

        let out = run_heat_refine_diag(&input, &basins, None, Some(dir.path())).unwrap();
        assert_eq!(out, dir.path().join("19000101.ocean_month_refined.nc"));

        let refined = io::open(&out).unwrap();
        let read = |name| {
            io::read_filled(&refined, name, f64::NAN)
                .unwrap()
                .into_dimensionality::<Ix3>()
                .unwrap()
        };

        let hfy = read("hfy");
        assert_eq!(hfy[[0, 0, 0]], 1.5);
        assert_eq!(hfy[[1, 1, 1]], 8.5);
        // no diffusive part of hfx
        assert_eq!(read("hfx")[[1, 0, 1]], 7.0);

        let hfbasin = read("hfbasin");
        assert_eq!(hfbasin.dim(), (2, 3, 2));
        // atlantic has ocean in the first row only
        assert_eq!(hfbasin[[0, 0, 0]], 1.5);
        assert!(hfbasin[[0, 0, 1]].is_nan());
        // indo-pacific starts north of 34S
        assert!(hfbasin[[0, 1, 0]].is_nan());
        assert_eq!(hfbasin[[0, 1, 1]], 4.5);
        // global
        assert_eq!(hfbasin[[0, 2, 0]], 4.0);
        assert_eq!(hfbasin[[1, 2, 1]], 15.0);

        let hfbasin_var = io::variable(&refined, "hfbasin").unwrap();
        assert_eq!(
            io::string_attribute(&hfbasin_var, "standard_name").as_deref(),
            Some("northward_ocean_heat_transport")
        );
        assert!(io::global_string_attribute(&refined, "associated_files").is_none());
    }

    #[test]
    fn missing_transport_not_counted() {
        let hfy = array![[[1.0, f64::NAN], [2.0, 3.0]]];
        let lat = array![-50.0, 0.0];
        let mask = array![[1.0, 1.0], [0.0, 0.0]];

        let global = heat_trans_by_basin(hfy.view(), None, lat.view(), None);
        assert_eq!(global, array![[1.0, 5.0]]);

        let masked = heat_trans_by_basin(hfy.view(), Some(mask.view()), lat.view(), None);
        assert_eq!(masked[[0, 0]], 1.0);
        assert!(masked[[0, 1]].is_nan());

        let limited = heat_trans_by_basin(hfy.view(), None, lat.view(), Some(-34.0));
        assert!(limited[[0, 0]].is_nan());
        assert_eq!(limited[[0, 1]], 5.0);
    }
}
