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

//! Model time in the `noleap` calendar.
//!
//! Time coordinates are given in days since a reference date
//! read from the `units` attribute, every year has 365 days.

use crate::constants::DAYS_PER_YEAR;
use crate::Float;
use chrono::{Datelike, NaiveDate};

pub const DAYS_IN_MONTH: [usize; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
pub const DAYS_IN_LEAP_MONTH: [usize; 12] = [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

pub const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Reference date of `days since YYYY-MM-DD [hh:mm:ss]` units.
pub fn reference_date(units: &str) -> Option<NaiveDate> {
    let (_, date) = units.split_once("since")?;
    let date = date.split_whitespace().next()?;

    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Zero-based day of the year of the reference date.
fn reference_day(reference: Option<NaiveDate>) -> Float {
    reference.map_or(0.0, |date| {
        let before: usize = DAYS_IN_MONTH[..date.month0() as usize].iter().sum();
        (before + date.day0() as usize) as Float
    })
}

/// Zero-based month of `days` after the reference date.
pub fn noleap_month(days: Float, reference: Option<NaiveDate>) -> usize {
    let day = (days + reference_day(reference)).rem_euclid(DAYS_PER_YEAR);

    let mut end = 0.0;
    for (month, length) in DAYS_IN_MONTH.iter().enumerate() {
        end += *length as Float;
        if day < end {
            return month;
        }
    }

    DAYS_IN_MONTH.len() - 1
}

/// Calendar year of `days` after the reference date.
pub fn noleap_year(days: Float, reference: Option<NaiveDate>) -> i32 {
    let first = reference.map_or(0, |date| date.year());
    let elapsed = ((days + reference_day(reference)) / DAYS_PER_YEAR).floor();

    first + elapsed as i32
}
