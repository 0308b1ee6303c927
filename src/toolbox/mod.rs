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

//! Module containing spatial helpers shared by all tools.
//!
//! Fields handled here live on the model horizontal grid and are
//! indexed `[j, i]`, where `j` runs northward and `i` eastward.
//! Masks are stored as [`Float`](crate::Float) arrays of zeros and ones
//! so that they can be combined with plain arithmetic, the same
//! way the cut lines of [`basins`] are combined.

pub mod basins;
pub mod bisection;
pub mod calendar;
pub mod flood;
pub mod search;
pub mod section;
pub mod stats;
pub mod vertical;
