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

//! Sub-module generating supergrids with their metrics.
//!
//! A supergrid is the model grid refined twice in each direction,
//! so that every model cell holds 2x2 supergrid cells, giving
//! positions of cell corners, face centres and cell centres.
//! Positions are kept in degrees, metrics in metres.

use crate::constants::EARTH_RADIUS;
use crate::errors::{InputError, ToolboxError};
use crate::io::write;
use crate::Float;
use log::debug;
use ndarray::{Array1, Array2, ArrayView1};
use std::f64::consts::FRAC_PI_4;
use std::path::Path;
use std::str::FromStr;

const TILE_NAME: &str = "tile1";
const TILE_STRING_LEN: usize = 255;

/// Latitude spacing of generated supergrid.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Projection {
    /// Uniform spacing in latitude.
    Spherical,
    /// Spacing uniform in Mercator coordinate, giving isotropic cells.
    Mercator,
}

impl FromStr for Projection {
    type Err = ToolboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "spherical" => Ok(Projection::Spherical),
            "mercator" => Ok(Projection::Mercator),
            _ => Err(ToolboxError::Shape(format!("unknown projection {}", s))),
        }
    }
}

/// Supergrid positions and metrics.
///
/// With `nyp x nxp` points:
/// `dx` is `(nyp, nx)`, `dy` is `(ny, nxp)`,
/// `area` is `(ny, nx)` and `angle_dx` is `(nyp, nxp)`.
#[derive(Clone, Debug)]
pub struct Supergrid {
    pub x: Array2<Float>,
    pub y: Array2<Float>,
    pub dx: Array2<Float>,
    pub dy: Array2<Float>,
    pub area: Array2<Float>,
    pub angle_dx: Array2<Float>,
    pub cyclic_x: bool,
    pub tripolar_n: bool,
}

impl Supergrid {
    /// Builds supergrid with `nx x ny` cells starting at `(lon0, lat0)`
    /// and spanning `lenlon x lenlat` degrees.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        projection: Projection,
        nx: usize,
        ny: usize,
        lat0: Float,
        lenlat: Float,
        lon0: Float,
        lenlon: Float,
        cyclic_x: bool,
        tripolar_n: bool,
    ) -> Result<Self, ToolboxError> {
        match projection {
            Projection::Spherical => {
                Supergrid::spherical(nx, ny, lat0, lenlat, lon0, lenlon, cyclic_x, tripolar_n)
            }
            Projection::Mercator => {
                Supergrid::mercator(nx, ny, lat0, lenlat, lon0, lenlon, cyclic_x, tripolar_n)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn spherical(
        nx: usize,
        ny: usize,
        lat0: Float,
        lenlat: Float,
        lon0: Float,
        lenlon: Float,
        cyclic_x: bool,
        tripolar_n: bool,
    ) -> Result<Self, ToolboxError> {
        check_cells(nx, ny)?;

        let lon = Array1::linspace(lon0, lon0 + lenlon, nx + 1);
        let lat = Array1::linspace(lat0, lat0 + lenlat, ny + 1);

        Supergrid::from_axes(lon.view(), lat.view(), cyclic_x, tripolar_n)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn mercator(
        nx: usize,
        ny: usize,
        lat0: Float,
        lenlat: Float,
        lon0: Float,
        lenlon: Float,
        cyclic_x: bool,
        tripolar_n: bool,
    ) -> Result<Self, ToolboxError> {
        check_cells(nx, ny)?;

        let lat1 = lat0 + lenlat;
        if lat0.abs() >= 90.0 || lat1.abs() >= 90.0 {
            return Err(ToolboxError::Shape(
                "Mercator grid cannot reach the poles".to_string(),
            ));
        }

        let merc = |lat: Float| (FRAC_PI_4 + 0.5 * lat.to_radians()).tan().ln();
        let unmerc = |m: Float| (2.0 * m.exp().atan() - 2.0 * FRAC_PI_4).to_degrees();

        let lon = Array1::linspace(lon0, lon0 + lenlon, nx + 1);
        let lat = Array1::linspace(merc(lat0), merc(lat1), ny + 1).mapv(unmerc);

        Supergrid::from_axes(lon.view(), lat.view(), cyclic_x, tripolar_n)
    }

    /// Builds supergrid from 1D longitude and latitude axes.
    pub fn from_axes(
        lon: ArrayView1<Float>,
        lat: ArrayView1<Float>,
        cyclic_x: bool,
        tripolar_n: bool,
    ) -> Result<Self, ToolboxError> {
        if lon.len() < 2 || lat.len() < 2 {
            return Err(ToolboxError::Shape(
                "supergrid axes need at least two points each".to_string(),
            ));
        }

        let shape = (lat.len(), lon.len());
        let x = Array2::from_shape_fn(shape, |(_, i)| lon[i]);
        let y = Array2::from_shape_fn(shape, |(j, _)| lat[j]);

        Ok(Supergrid::from_positions(x, y, cyclic_x, tripolar_n))
    }

    fn from_positions(x: Array2<Float>, y: Array2<Float>, cyclic_x: bool, tripolar_n: bool) -> Self {
        let (nyp, nxp) = x.dim();
        debug!("Computing metrics of supergrid with {} x {} points", nyp, nxp);

        let dx = Array2::from_shape_fn((nyp, nxp - 1), |(j, i)| {
            haversine((x[[j, i]], y[[j, i]]), (x[[j, i + 1]], y[[j, i + 1]]))
        });

        let dy = Array2::from_shape_fn((nyp - 1, nxp), |(j, i)| {
            haversine((x[[j, i]], y[[j, i]]), (x[[j + 1, i]], y[[j + 1, i]]))
        });

        let area = Array2::from_shape_fn((nyp - 1, nxp - 1), |(j, i)| {
            let dlon = (x[[j, i + 1]] - x[[j, i]]).to_radians();
            let south = 0.5 * (y[[j, i]] + y[[j, i + 1]]);
            let north = 0.5 * (y[[j + 1, i]] + y[[j + 1, i + 1]]);

            EARTH_RADIUS.powi(2) * (dlon * (north.to_radians().sin() - south.to_radians().sin())).abs()
        });

        let angle_dx = grid_angle(&x, &y, cyclic_x);

        Supergrid {
            x,
            y,
            dx,
            dy,
            area,
            angle_dx,
            cyclic_x,
            tripolar_n,
        }
    }

    /// Number of supergrid cells `(ny, nx)`.
    pub fn cells(&self) -> (usize, usize) {
        self.area.dim()
    }

    /// Writes supergrid in the mosaic layout read by the model.
    pub fn write(&self, path: &Path) -> Result<(), InputError> {
        let (ny, nx) = self.cells();

        let mut file = write::create(path)?;

        file.add_dimension("nyp", ny + 1)?;
        file.add_dimension("nxp", nx + 1)?;
        file.add_dimension("ny", ny)?;
        file.add_dimension("nx", nx)?;
        file.add_dimension("string", TILE_STRING_LEN)?;

        file.add_attribute("cyclic_x", i32::from(self.cyclic_x))?;
        file.add_attribute("tripolar_n", i32::from(self.tripolar_n))?;

        write::put_char_array(
            &mut file,
            "tile",
            &["string"],
            &[TILE_NAME],
            TILE_STRING_LEN,
            &[("long_name", "tile name")],
        )?;

        let degrees = [("units", "degrees")];
        write::put_float(&mut file, "x", &["nyp", "nxp"], self.x.view(), &degrees)?;
        write::put_float(&mut file, "y", &["nyp", "nxp"], self.y.view(), &degrees)?;
        write::put_float(&mut file, "dx", &["nyp", "nx"], self.dx.view(), &[("units", "meters")])?;
        write::put_float(&mut file, "dy", &["ny", "nxp"], self.dy.view(), &[("units", "meters")])?;
        write::put_float(&mut file, "area", &["ny", "nx"], self.area.view(), &[("units", "m2")])?;
        write::put_float(
            &mut file,
            "angle_dx",
            &["nyp", "nxp"],
            self.angle_dx.view(),
            &[("units", "degrees")],
        )?;

        Ok(())
    }
}

fn check_cells(nx: usize, ny: usize) -> Result<(), ToolboxError> {
    if nx == 0 || ny == 0 {
        return Err(ToolboxError::Shape(format!(
            "supergrid needs at least one cell, got {} x {}",
            nx, ny
        )));
    }

    Ok(())
}

/// Great-circle distance between two points given in degrees.
pub fn haversine(p0: (Float, Float), p1: (Float, Float)) -> Float {
    let lat0 = p0.1.to_radians();
    let lat1 = p1.1.to_radians();
    let dlat = lat1 - lat0;
    let dlon = (p1.0 - p0.0).to_radians();

    let a = (0.5 * dlat).sin().powi(2) + lat0.cos() * lat1.cos() * (0.5 * dlon).sin().powi(2);

    2.0 * EARTH_RADIUS * a.sqrt().min(1.0).asin()
}

/// Angle (degrees, anticlockwise) between the local grid x-direction and east.
fn grid_angle(x: &Array2<Float>, y: &Array2<Float>, cyclic_x: bool) -> Array2<Float> {
    let (nyp, nxp) = x.dim();

    Array2::from_shape_fn((nyp, nxp), |(j, i)| {
        let (west, east) = if cyclic_x {
            // last column duplicates the first one on a cyclic grid
            let n = nxp - 1;
            ((i + n - 1) % n, (i + 1) % n)
        } else {
            (i.saturating_sub(1), (i + 1).min(nxp - 1))
        };

        let dlon = wrap_longitude(x[[j, east]] - x[[j, west]]);
        let dlat = y[[j, east]] - y[[j, west]];

        (dlat.atan2(dlon * y[[j, i]].to_radians().cos())).to_degrees()
    })
}

fn wrap_longitude(dlon: Float) -> Float {
    let wrapped = (dlon + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && dlon > 0.0 {
        180.0
    } else {
        wrapped
    }
}
