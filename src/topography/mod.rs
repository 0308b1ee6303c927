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

//! Module responsible for editing model topography.
//!
//! Edits are recorded as a list of `(i, j, new value)` entries
//! where `i` is the column and `j` is the row of the edited cell.
//! Edited files keep the record of changes in `iEdit`, `jEdit`
//! and `zEdit` (original value) variables along the unlimited
//! `nEdits` dimension, so that edits can be undone and re-applied.

pub mod edits;
pub mod files;

use crate::toolbox::search::find_point_in_mesh;
use crate::Float;
use edits::Edits;
use ndarray::{s, Array2};

/// Topography with cell corner coordinates.
///
/// `longitude` and `latitude` hold cell corners of shape `(nj + 1, ni + 1)`,
/// `height` and `reference` are cell-centred with shape `(nj, ni)`.
#[derive(Clone, Debug)]
pub struct Topography {
    pub longitude: Array2<Float>,
    pub latitude: Array2<Float>,
    pub height: Array2<Float>,
    pub reference: Array2<Float>,
    pub has_reference: bool,
}

impl Topography {
    /// Without reference the height itself is the reference.
    pub fn new(
        longitude: Array2<Float>,
        latitude: Array2<Float>,
        height: Array2<Float>,
        reference: Option<Array2<Float>>,
    ) -> Self {
        let has_reference = reference.is_some();
        let reference = reference.unwrap_or_else(|| height.clone());

        Topography {
            longitude,
            latitude,
            height,
            reference,
            has_reference,
        }
    }

    pub fn dim(&self) -> (usize, usize) {
        self.height.dim()
    }

    pub fn xlim(&self) -> (Float, Float) {
        min_max(&self.longitude)
    }

    pub fn ylim(&self) -> (Float, Float) {
        min_max(&self.latitude)
    }

    /// Range of height values.
    pub fn height_range(&self) -> (Float, Float) {
        min_max(&self.height)
    }

    pub fn diff(&self) -> Array2<Float> {
        &self.height - &self.reference
    }

    pub fn diff_range(&self) -> (Float, Float) {
        min_max(&self.diff())
    }

    /// Copy of the window starting at cell `(i0, j0)`
    /// spanning `iw` columns and `jw` rows.
    pub fn clone_window(&self, i0: usize, j0: usize, iw: usize, jw: usize) -> Self {
        let (i1, j1) = (i0 + iw, j0 + jw);

        Topography {
            longitude: self.longitude.slice(s![j0..=j1, i0..=i1]).to_owned(),
            latitude: self.latitude.slice(s![j0..=j1, i0..=i1]).to_owned(),
            height: self.height.slice(s![j0..j1, i0..i1]).to_owned(),
            reference: self.reference.slice(s![j0..j1, i0..i1]).to_owned(),
            has_reference: self.has_reference,
        }
    }

    /// Applies edits made on `orig` topography to this one.
    ///
    /// Each edited cell is located by its centre, so `self`
    /// can be any window of `orig`. Edits outside of the window
    /// are skipped. Returns the number of applied edits.
    pub fn apply_edits(&mut self, orig: &Topography, edits: &Edits) -> usize {
        let mut applied = 0;

        for edit in edits.iter() {
            let (x, y) = match orig.cell_coord(edit.i, edit.j) {
                Some(xy) => xy,
                None => continue,
            };

            if let Some((row, col)) =
                find_point_in_mesh(self.longitude.view(), self.latitude.view(), x, y)
            {
                self.height[[row, col]] = edit.value;
                applied += 1;
            }
        }

        applied
    }

    /// Coordinates of the centre of cell in column `i` and row `j`.
    pub fn cell_coord(&self, i: usize, j: usize) -> Option<(Float, Float)> {
        let (nj, ni) = self.dim();

        if i >= ni || j >= nj {
            return None;
        }

        let x = 0.5 * (self.longitude[[j, i]] + self.longitude[[j + 1, i + 1]]);
        let y = 0.5 * (self.latitude[[j, i]] + self.latitude[[j + 1, i + 1]]);

        Some((x, y))
    }
}

fn min_max(data: &Array2<Float>) -> (Float, Float) {
    data.iter()
        .fold((Float::INFINITY, Float::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

/// Editing window over the topography of `ni` columns and `nj` rows.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct View {
    pub ni: usize,
    pub nj: usize,
    pub i0: usize,
    pub j0: usize,
    pub iw: usize,
    pub jw: usize,
}

impl View {
    /// Window covering the whole domain.
    pub fn new(ni: usize, nj: usize) -> Self {
        View {
            ni,
            nj,
            i0: 0,
            j0: 0,
            iw: ni,
            jw: nj,
        }
    }

    /// Moves the window by `di` and `dj` half-widths,
    /// keeping it inside the domain.
    pub fn move_by(&mut self, di: i64, dj: i64) {
        self.i0 = shift_clamped(self.i0, di, self.iw, self.ni);
        self.j0 = shift_clamped(self.j0, dj, self.jw, self.nj);
    }

    pub fn i_range(&self) -> (usize, usize) {
        (self.i0, self.i0 + self.iw)
    }

    pub fn j_range(&self) -> (usize, usize) {
        (self.j0, self.j0 + self.jw)
    }

    pub fn set_i(&mut self, (lo, hi): (usize, usize)) {
        let hi = hi.min(self.ni);
        self.i0 = lo.min(hi);
        self.iw = hi - self.i0;
    }

    pub fn set_j(&mut self, (lo, hi): (usize, usize)) {
        let hi = hi.min(self.nj);
        self.j0 = lo.min(hi);
        self.jw = hi - self.j0;
    }

    /// Window cut out of the full topography.
    pub fn window(&self, full: &Topography) -> Topography {
        full.clone_window(self.i0, self.j0, self.iw, self.jw)
    }
}

fn shift_clamped(start: usize, halves: i64, width: usize, len: usize) -> usize {
    // truncation towards zero, as int() does
    let shift = (halves as Float * width as Float / 2.0) as i64;
    let max_start = len.saturating_sub(width) as i64;

    (start as i64 + shift).max(0).min(max_start) as usize
}
