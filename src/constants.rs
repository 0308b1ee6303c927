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

//! Module containing constants used by the tools.

use crate::Float;

///Mean radius of the Earth sphere used for grid metrics
pub const EARTH_RADIUS: Float = 6_371_000.0;

///Boussinesq reference density of seawater (kg m-3)
pub const RHO_0: Float = 1.035e3;

///Heat capacity of seawater (J kg-1 K-1)
pub const CP: Float = 3989.0;

///Conversion of W to PW
pub const WATTS_TO_PW: Float = 1.0e-15;

///Conversion of mass transport (kg s-1) to Sverdrups
pub const KG_S_TO_SV: Float = 1.0e-9;

///Conversion of volume transport (m3 s-1) to Sverdrups
pub const M3_S_TO_SV: Float = 1.0e-6;

///Fill value written to CMIP6 refined diagnostics
pub const MISSING_VALUE: Float = 1.0e20;

///Model calendar year length used to convert days to years
pub const DAYS_PER_YEAR: Float = 365.0;

///Tolerance for detecting zonally periodic sections (degrees)
pub const PERIODIC_TOLERANCE: Float = 1.0e-6;
