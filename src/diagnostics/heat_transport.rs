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

//! Poleward heat transport from vertically integrated
//! temperature advection and diffusion.

use crate::constants::WATTS_TO_PW;
use crate::errors::{InputError, ToolError};
use crate::grid::GridSpec;
use crate::io::{self, Dataset};
use crate::toolbox::basins::{atlantic_arctic_mask, indo_pacific_mask, staggered_v_mask};
use crate::Float;
use log::{debug, info, warn};
use ndarray::{Array1, Array2, ArrayD, ArrayView2};
use rayon::prelude::*;
use rayon::ThreadPool;
use std::path::{Path, PathBuf};

pub const SERIES_FILE: &str = "HeatTransport.csv";
pub const GW2000_FILE: &str = "HeatTransport_GW2000.csv";
pub const TC2001_FILE: &str = "HeatTransport_TC2001.csv";

/// Basin transports are not defined south of this latitude.
const BASIN_SOUTHERN_LIMIT: Float = -34.0;

/// Hydrographic estimates of Ganachaud and Wunsch (2000):
/// basin, latitudes, transports \[PW\] and their errors.
const GANACHAUD_WUNSCH: [(&str, &[Float], &[Float], &[Float]); 3] = [
    (
        "global",
        &[-30.0, -19.0, 24.0, 47.0],
        &[-0.6, -0.8, 1.8, 0.6],
        &[0.3, 0.6, 0.3, 0.1],
    ),
    (
        "atlantic",
        &[-45.0, -30.0, -19.0, -11.0, -4.5, 7.5, 24.0, 47.0],
        &[0.66, 0.35, 0.77, 0.9, 1.0, 1.26, 1.27, 0.6],
        &[0.12, 0.15, 0.2, 0.4, 0.55, 0.31, 0.15, 0.09],
    ),
    (
        "indopacific",
        &[-30.0, -18.0, 24.0, 47.0],
        &[-0.9, -1.6, 0.52, 0.0],
        &[0.3, 0.6, 0.2, 0.05],
    ),
];

/// Variables of Trenberth and Caron (2001) file, NCEP and ECMWF
/// based estimates for each basin.
const TRENBERTH_CARON: [&str; 6] = ["OTn", "ATLn", "INDPACn", "OTe", "ATLe", "INDPACe"];

/// Converts vertically integrated temperature transport \[K kg s^-1\]
/// into heat transport \[PW\] summed along rows.
pub fn heat_trans(
    advective: ArrayView2<Float>,
    diffusive: Option<ArrayView2<Float>>,
    vmask: Option<ArrayView2<Float>>,
    rho0: Float,
    cp: Float,
) -> Array1<Float> {
    let (nj, ni) = advective.dim();

    Array1::from_shape_fn(nj, |j| {
        (0..ni)
            .map(|i| {
                let total = advective[[j, i]] + diffusive.as_ref().map_or(0.0, |d| d[[j, i]]);
                let m = vmask.as_ref().map_or(1.0, |m| m[[j, i]]);

                total * (rho0 * cp) * WATTS_TO_PW * m
            })
            .sum()
    })
}

/// Heat transport series against northern face latitude.
#[derive(Clone, Debug)]
pub struct HeatTransport {
    pub lat: Vec<Float>,
    pub global: Array1<Float>,
    pub atlantic: Array1<Float>,
    pub indopacific: Array1<Float>,
    pub has_diffusive: bool,
}

impl HeatTransport {
    pub fn write_csv(&self, path: &Path) -> Result<(), csv::Error> {
        let mut out_file = csv::Writer::from_path(path)?;

        out_file.write_record(&["lat", "global", "atlantic", "indopacific"])?;

        for (j, lat) in self.lat.iter().enumerate() {
            out_file.write_record(&[
                lat.to_string(),
                self.global[j].to_string(),
                self.atlantic[j].to_string(),
                self.indopacific[j].to_string(),
            ])?;
        }

        out_file.flush()?;

        Ok(())
    }
}

/// Reads the 2D field, averaging over records when it has them.
fn read_integrated(source: &Dataset, name: &str) -> Result<Array2<Float>, InputError> {
    let mut data: ArrayD<Float> = source.read_filled(name, 0.0)?;

    if data.ndim() == 3 {
        debug!("Averaging {} over {} records", name, data.shape()[0]);
        data = io::time_mean(&data)?;
    }

    io::into_2d(data)
}

/// Computes global, Atlantic and Indo-Pacific heat transport
/// and writes the series with reference estimates into `out_dir`.
pub fn run_heat_transport(
    files: &[PathBuf],
    grid: &GridSpec,
    (rho0, cp): (Float, Float),
    out_dir: &Path,
    pool: &ThreadPool,
    observations: Option<&Path>,
) -> Result<HeatTransport, ToolError> {
    let source = Dataset::open_all(files)?;

    let advective = read_integrated(&source, "T_ady_2d")?;

    let diffusive = if source.has_variable("T_diffy_2d") {
        Some(read_integrated(&source, "T_diffy_2d")?)
    } else {
        warn!("Diffusive temperature term not found. This will result in an underestimation of the heat transport.");
        None
    };

    if advective.dim() != grid.dim() {
        return Err(InputError::Mismatch(format!(
            "T_ady_2d of shape {:?} does not match grid of shape {:?}",
            advective.dim(),
            grid.dim()
        ))
        .into());
    }

    let lat = grid.northern_face_latitude();

    let masks = [
        None,
        Some(staggered_v_mask(atlantic_arctic_mask(grid.basin.view()).view())),
        Some(staggered_v_mask(indo_pacific_mask(grid.basin.view()).view())),
    ];

    let mut series: Vec<Array1<Float>> = pool.install(|| {
        masks
            .par_iter()
            .map(|vmask| {
                heat_trans(
                    advective.view(),
                    diffusive.as_ref().map(|d| d.view()),
                    vmask.as_ref().map(|m| m.view()),
                    rho0,
                    cp,
                )
            })
            .collect()
    });

    for basin in series.iter_mut().skip(1) {
        for (value, y) in basin.iter_mut().zip(&lat) {
            if *y < BASIN_SOUTHERN_LIMIT {
                *value = Float::NAN;
            }
        }
    }

    let indopacific = series.pop().unwrap_or_default();
    let atlantic = series.pop().unwrap_or_default();
    let global = series.pop().unwrap_or_default();

    let transport = HeatTransport {
        lat,
        global,
        atlantic,
        indopacific,
        has_diffusive: diffusive.is_some(),
    };

    info!("Writing heat transport series");
    transport.write_csv(&out_dir.join(SERIES_FILE))?;
    write_ganachaud_wunsch(&out_dir.join(GW2000_FILE))?;

    if let Some(obs_path) = observations {
        write_trenberth_caron(obs_path, &out_dir.join(TC2001_FILE))?;
    }

    Ok(transport)
}

fn write_ganachaud_wunsch(path: &Path) -> Result<(), csv::Error> {
    let mut out_file = csv::Writer::from_path(path)?;

    out_file.write_record(&["basin", "lat", "trans", "err"])?;

    for (basin, lat, trans, err) in GANACHAUD_WUNSCH {
        for n in 0..lat.len() {
            out_file.write_record(&[
                basin.to_string(),
                lat[n].to_string(),
                trans[n].to_string(),
                err[n].to_string(),
            ])?;
        }
    }

    out_file.flush()?;

    Ok(())
}

/// Copies the Trenberth and Caron (2001) estimates into CSV,
/// so that they can be shown together with the model.
/// Every estimate must have one value per latitude.
fn write_trenberth_caron(obs_path: &Path, path: &Path) -> Result<(), ToolError> {
    let obs = io::open(obs_path)?;
    let ylat = io::read_array(&obs, "ylat")?;

    let columns = TRENBERTH_CARON
        .iter()
        .map(|name| io::read_filled(&obs, name, Float::NAN))
        .collect::<Result<Vec<ArrayD<Float>>, InputError>>()?;

    for (name, column) in TRENBERTH_CARON.iter().zip(&columns) {
        if column.len() != ylat.len() {
            return Err(InputError::Mismatch(format!(
                "{} has {} values but ylat has {}",
                name,
                column.len(),
                ylat.len()
            ))
            .into());
        }
    }

    let mut out_file = csv::Writer::from_path(path)?;

    let mut header = vec!["lat"];
    header.extend(TRENBERTH_CARON);
    out_file.write_record(&header)?;

    let mut values: Vec<_> = columns.iter().map(|c| c.iter()).collect();

    for y in ylat.iter() {
        let mut record = vec![y.to_string()];
        for column in values.iter_mut() {
            record.extend(column.next().map(|v| v.to_string()));
        }
        out_file.write_record(&record)?;
    }

    out_file.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{heat_trans, run_heat_transport, write_trenberth_caron, GW2000_FILE, SERIES_FILE, TC2001_FILE};
    use crate::errors::{InputError, ToolError};
    use crate::grid::GridSpec;
    use crate::io::write;
    use float_cmp::approx_eq;
    use ndarray::{array, Array1, Array2};
    use std::path::{Path, PathBuf};
    use rayon::ThreadPoolBuilder;
    use tempfile::TempDir;

    #[test]
    fn transport_in_petawatts() {
        let adv = array![[1.0e15, 1.0e15], [2.0e15, 0.0]];
        let diff = array![[0.0, 1.0e15], [0.0, 0.0]];

        let ht = heat_trans(adv.view(), Some(diff.view()), None, 1.0, 1.0);
        assert!(approx_eq!(f64, ht[0], 3.0, epsilon = 1.0e-12));
        assert!(approx_eq!(f64, ht[1], 2.0, epsilon = 1.0e-12));

        let vmask = array![[0.0, 1.0], [1.0, 1.0]];
        let ht = heat_trans(adv.view(), None, Some(vmask.view()), 2.0, 0.5);
        assert!(approx_eq!(f64, ht[0], 1.0, epsilon = 1.0e-12));
    }

    fn grid() -> GridSpec {
        // three rows with northern faces at 40S, 0 and 40N
        let y = array![[-80.0, -80.0], [-40.0, -40.0], [0.0, 0.0], [40.0, 40.0]];
        let x = array![[0.0, 10.0], [0.0, 10.0], [0.0, 10.0], [0.0, 10.0]];

        GridSpec {
            x,
            y,
            xcenter: Array2::zeros((3, 1)),
            ycenter: Array2::zeros((3, 1)),
            mask: Array2::ones((3, 1)),
            area: Array2::ones((3, 1)),
            depth: Array2::from_elem((3, 1), 4000.0),
            basin: array![[2], [2], [2]],
        }
    }

    #[test]
    fn basin_series_cut_in_the_south() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("annual.nc");

        {
            let mut file = write::create(&path).unwrap();
            file.add_dimension("time", 2).unwrap();
            file.add_dimension("yq", 3).unwrap();
            file.add_dimension("xh", 1).unwrap();

            let adv = array![[[1.0e15], [2.0e15], [3.0e15]], [[3.0e15], [2.0e15], [1.0e15]]];
            write::put_float(&mut file, "T_ady_2d", &["time", "yq", "xh"], adv.view(), &[]).unwrap();
        }

        let pool = ThreadPoolBuilder::new().num_threads(2).build().unwrap();
        let ht = run_heat_transport(&[path], &grid(), (1.0, 1.0), dir.path(), &pool, None).unwrap();

        assert!(!ht.has_diffusive);
        assert_eq!(ht.lat, vec![-40.0, 0.0, 40.0]);
        assert!(approx_eq!(f64, ht.global[0], 2.0, epsilon = 1.0e-12));
        assert!(ht.atlantic[0].is_nan());
        assert!(approx_eq!(f64, ht.atlantic[1], 2.0, epsilon = 1.0e-12));
        assert_eq!(ht.indopacific[2], 0.0);

        let mut reader = csv::Reader::from_path(dir.path().join(SERIES_FILE)).unwrap();
        assert_eq!(reader.records().count(), 3);

        let mut reader = csv::Reader::from_path(dir.path().join(GW2000_FILE)).unwrap();
        assert_eq!(reader.records().count(), 16);
    }

    /// Observation file with `ylat` and the six estimates,
    /// the last one with `indpac_len` values.
    fn write_observations(dir: &Path, indpac_len: usize) -> PathBuf {
        let path = dir.join("Trenberth_and_Caron_Heat_Transport.nc");
        let mut file = write::create(&path).unwrap();
        file.add_dimension("ylat", 3).unwrap();
        file.add_dimension("short", indpac_len).unwrap();

        write::put_float(&mut file, "ylat", &["ylat"], array![-30.0, 0.0, 30.0].view(), &[]).unwrap();

        for (n, name) in ["OTn", "ATLn", "INDPACn", "OTe", "ATLe"].iter().enumerate() {
            let values = array![-1.0, 0.5, 1.5] + n as f64;
            write::put_float(&mut file, name, &["ylat"], values.view(), &[]).unwrap();
        }

        let dim = if indpac_len == 3 { "ylat" } else { "short" };
        let values = Array1::from_elem(indpac_len, 0.25);
        write::put_float(&mut file, "INDPACe", &[dim], values.view(), &[]).unwrap();

        path
    }

    #[test]
    fn observed_estimates_copied() {
        let dir = TempDir::new().unwrap();
        let obs = write_observations(dir.path(), 3);
        let out = dir.path().join(TC2001_FILE);

        write_trenberth_caron(&obs, &out).unwrap();

        let mut reader = csv::Reader::from_path(&out).unwrap();
        assert_eq!(
            reader.headers().unwrap().iter().collect::<Vec<&str>>(),
            vec!["lat", "OTn", "ATLn", "INDPACn", "OTe", "ATLe", "INDPACe"]
        );

        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 3);
        assert_eq!(&records[1][0], "0");
        assert_eq!(&records[1][1], "0.5");
        assert_eq!(&records[2][3], "3.5");
        assert_eq!(&records[2][6], "0.25");
    }

    #[test]
    fn short_estimate_rejected() {
        let dir = TempDir::new().unwrap();
        let obs = write_observations(dir.path(), 1);
        let out = dir.path().join(TC2001_FILE);

        let result = write_trenberth_caron(&obs, &out);
        assert!(matches!(result, Err(ToolError::Input(InputError::Mismatch(_)))));
        assert!(!out.exists());
    }

    #[test]
    fn observations_written_with_model() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("annual.nc");

        {
            let mut file = write::create(&path).unwrap();
            file.add_dimension("yq", 3).unwrap();
            file.add_dimension("xh", 1).unwrap();

            let adv = array![[1.0e15], [2.0e15], [3.0e15]];
            write::put_float(&mut file, "T_ady_2d", &["yq", "xh"], adv.view(), &[]).unwrap();
            write::put_float(&mut file, "T_diffy_2d", &["yq", "xh"], adv.view(), &[]).unwrap();
        }

        let obs = write_observations(dir.path(), 3);
        let pool = ThreadPoolBuilder::new().num_threads(1).build().unwrap();
        let ht = run_heat_transport(&[path], &grid(), (1.0, 1.0), dir.path(), &pool, Some(obs.as_path())).unwrap();

        assert!(ht.has_diffusive);
        assert!(approx_eq!(f64, ht.global[2], 6.0, epsilon = 1.0e-12));

        let mut reader = csv::Reader::from_path(dir.path().join(TC2001_FILE)).unwrap();
        assert_eq!(reader.records().count(), 3);
    }
}
