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

//! Vertical mass transport (or velocity, given cell areas)
//! from the divergence of horizontal mass transports.

use crate::constants::MISSING_VALUE;
use crate::errors::{InputError, ToolError};
use crate::io::{self, write};
use crate::toolbox::vertical::w_from_convergence;
use crate::Float;
use log::{debug, info};
use ndarray::{Array4, Axis, Ix4};
use std::path::{Path, PathBuf};

pub const OUTPUT_FILE: &str = "w_from_convergence.nc";

/// Names and boundaries of the horizontal transports.
#[derive(Clone, Debug)]
pub struct Transports<'a> {
    pub u_name: &'a str,
    pub v_name: &'a str,
    pub wrap_x: bool,
    pub wrap_y: bool,
}

fn read_transport(file: &netcdf::File, name: &str) -> Result<Array4<Float>, InputError> {
    Ok(io::read_filled(file, name, Float::NAN)?.into_dimensionality::<Ix4>()?)
}

/// Diagnoses vertical transport at interfaces and writes it into
/// `out_dir`. With a static file it is divided by `areacello`
/// and `rho0`, giving vertical velocity.
pub fn run_vertical_velocity(
    input: &Path,
    transports: &Transports,
    static_file: Option<&Path>,
    rho0: Float,
    out_dir: &Path,
) -> Result<PathBuf, ToolError> {
    let source = io::open(input)?;

    let u = read_transport(&source, transports.u_name)?;
    let v = read_transport(&source, transports.v_name)?;
    let mut w = w_from_convergence(u.view(), v.view(), transports.wrap_x, transports.wrap_y)?;

    let (nt, nk1, nj, ni) = w.dim();
    debug!("Vertical transport of {} records on {} interfaces", nt, nk1);

    let units = match static_file {
        Some(path) => {
            let area = io::read_filled(&io::open(path)?, "areacello", Float::NAN).and_then(io::into_2d)?;

            if area.dim() != (nj, ni) {
                return Err(InputError::Mismatch(format!(
                    "areacello of shape {:?} does not match transports of shape {:?}",
                    area.dim(),
                    u.dim()
                ))
                .into());
            }

            for mut record in w.outer_iter_mut() {
                for mut level in record.axis_iter_mut(Axis(0)) {
                    level.zip_mut_with(&area, |value, a| *value /= a * rho0);
                }
            }
            "m s-1"
        }
        None => "kg s-1",
    };

    let out_path = out_dir.join(OUTPUT_FILE);
    info!("Writing {}", out_path.display());

    let mut out = write::create(&out_path)?;
    out.add_attribute("history", write::history_entry("computed vertical transport").as_str())?;

    if source.variable("time").is_some() {
        write::copy_coordinate(&source, &mut out, "time", true)?;
    } else {
        out.add_unlimited_dimension("time")?;
    }
    out.add_dimension("zi", nk1)?;
    out.add_dimension("yh", nj)?;
    out.add_dimension("xh", ni)?;

    let long_name = match static_file {
        Some(_) => "Vertical velocity from horizontal convergence",
        None => "Vertical mass transport from horizontal convergence",
    };

    write::put_float32_records(
        &mut out,
        "w",
        &["time", "zi", "yh", "xh"],
        w.view(),
        MISSING_VALUE,
        &[("long_name", long_name), ("units", units), ("positive", "up")],
    )?;

    Ok(out_path)
}

#[cfg(test)]
mod tests {
    use super::{run_vertical_velocity, Transports};
    use crate::io::{self, write};
    use float_cmp::approx_eq;
    use ndarray::{array, Array4, Ix4};
    use tempfile::TempDir;

    fn write_transports(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("month.nc");
        let mut file = write::create(&path).unwrap();
        for (name, len) in [("time", 1), ("z_l", 1), ("yh", 1), ("xq", 2)] {
            file.add_dimension(name, len).unwrap();
        }
        write::put_float(&mut file, "time", &["time"], array![15.5].view(), &[("units", "days")]).unwrap();

        let dims = ["time", "z_l", "yh", "xq"];
        let umo = Array4::from_shape_vec((1, 1, 1, 2), vec![2070.0, 0.0]).unwrap();
        write::put_float(&mut file, "umo", &dims, umo.view(), &[]).unwrap();
        write::put_float(&mut file, "vmo", &dims, Array4::<f64>::zeros((1, 1, 1, 2)).view(), &[]).unwrap();

        path
    }

    #[test]
    fn transport_written_at_interfaces() {
        let dir = TempDir::new().unwrap();
        let input = write_transports(&dir);
        let transports = Transports {
            u_name: "umo",
            v_name: "vmo",
            wrap_x: false,
            wrap_y: false,
        };

        let out = run_vertical_velocity(&input, &transports, None, 1035.0, dir.path()).unwrap();
        let file = io::open(&out).unwrap();
        let w = io::read_filled(&file, "w", f64::NAN)
            .unwrap()
            .into_dimensionality::<Ix4>()
            .unwrap();

        assert_eq!(w.dim(), (1, 2, 1, 2));
        assert_eq!(w[[0, 0, 0, 0]], -2070.0);
        assert_eq!(w[[0, 0, 0, 1]], 2070.0);
        assert_eq!(w[[0, 1, 0, 1]], 0.0);
        assert_eq!(io::read_array(&file, "time").unwrap().len(), 1);
    }

    #[test]
    fn velocity_with_cell_area() {
        let dir = TempDir::new().unwrap();
        let input = write_transports(&dir);
        let static_file = dir.path().join("ocean_static.nc");
        {
            let mut file = write::create(&static_file).unwrap();
            file.add_dimension("yh", 1).unwrap();
            file.add_dimension("xh", 2).unwrap();
            write::put_float(&mut file, "areacello", &["yh", "xh"], array![[1.0, 2.0]].view(), &[]).unwrap();
        }
        let transports = Transports {
            u_name: "umo",
            v_name: "vmo",
            wrap_x: true,
            wrap_y: false,
        };

        let out = run_vertical_velocity(&input, &transports, Some(&static_file), 1035.0, dir.path()).unwrap();
        let w = io::read_filled(&io::open(&out).unwrap(), "w", f64::NAN).unwrap();

        // periodic: 0 - 2070 and 2070 - 0
        assert!(approx_eq!(f64, w[[0, 0, 0, 0]], -2.0, epsilon = 1.0e-6));
        assert!(approx_eq!(f64, w[[0, 0, 0, 1]], 1.0, epsilon = 1.0e-6));

        let missing = Transports {
            u_name: "uh",
            ..transports
        };
        assert!(run_vertical_velocity(&input, &missing, None, 1035.0, dir.path()).is_err());
    }
}
