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

//! Sub-module with helpers for writing NetCDF output
//! following CF conventions.

use super::{flat, variable};
use crate::{errors::InputError, Float};
use chrono::Local;
use ndarray::{ArrayView, ArrayView3, ArrayView4, Dimension};
use netcdf::{File, FileMut, VariableMut};
use std::path::Path;

/// Creates a new output file, overwriting existing one.
pub fn create(path: &Path) -> Result<FileMut, InputError> {
    let mut file = netcdf::create(path)?;
    file.add_attribute("Conventions", "CF-1.8")?;

    Ok(file)
}

/// Adds the dimension only when the file does not have it yet.
pub fn ensure_dimension(file: &mut FileMut, name: &str, len: usize) -> Result<(), InputError> {
    match file.dimension(name) {
        Some(dim) if dim.len() == len => Ok(()),
        Some(dim) => Err(InputError::Mismatch(format!(
            "dimension {} has length {} but {} is required",
            name,
            dim.len(),
            len
        ))),
        None => {
            file.add_dimension(name, len)?;
            Ok(())
        }
    }
}

/// Gets the variable for writing or returns
/// a meaningful error.
pub fn variable_mut<'f>(file: &'f mut FileMut, name: &str) -> Result<VariableMut<'f>, InputError> {
    file.variable_mut(name)
        .ok_or_else(|| InputError::MissingVariable(name.to_string()))
}

/// Writes a [`Float`] field with text attributes.
pub fn put_float<D: Dimension>(
    file: &mut FileMut,
    name: &str,
    dims: &[&str],
    data: ArrayView<Float, D>,
    attrs: &[(&str, &str)],
) -> Result<(), InputError> {
    let mut var = file.add_variable::<Float>(name, dims)?;
    put_text_attributes(&mut var, attrs)?;
    var.put_values(&flat(&data), ..)?;

    Ok(())
}

/// Writes a single precision field with `_FillValue` and `missing_value`,
/// as expected by CMIP6 post-processing.
pub fn put_float32_with_fill<D: Dimension>(
    file: &mut FileMut,
    name: &str,
    dims: &[&str],
    data: ArrayView<Float, D>,
    fill: Float,
    attrs: &[(&str, &str)],
) -> Result<(), InputError> {
    let mut var = file.add_variable::<f32>(name, dims)?;
    var.put_attribute("_FillValue", fill as f32)?;
    var.put_attribute("missing_value", fill as f32)?;
    put_text_attributes(&mut var, attrs)?;

    let values: Vec<f32> = data.iter().map(|v| *v as f32).collect();
    var.put_values(&values, ..)?;

    Ok(())
}

/// Writes an integer field with text attributes.
pub fn put_int<D: Dimension>(
    file: &mut FileMut,
    name: &str,
    dims: &[&str],
    data: ArrayView<i32, D>,
    attrs: &[(&str, &str)],
) -> Result<(), InputError> {
    let mut var = file.add_variable::<i32>(name, dims)?;
    put_text_attributes(&mut var, attrs)?;
    var.put_values(&flat(&data), ..)?;

    Ok(())
}

/// Writes strings as a NetCDF character array `(n, len)`,
/// padded with zero bytes. The last dimension holds the characters.
pub fn put_char_array(
    file: &mut FileMut,
    name: &str,
    dims: &[&str],
    texts: &[&str],
    len: usize,
    attrs: &[(&str, &str)],
) -> Result<(), InputError> {
    let mut bytes = vec![0_i8; texts.len() * len];

    for (row, text) in bytes.chunks_mut(len).zip(texts) {
        for (slot, byte) in row.iter_mut().zip(text.bytes()) {
            *slot = byte as i8;
        }
    }

    let mut var = file.add_variable::<i8>(name, dims)?;
    put_text_attributes(&mut var, attrs)?;
    var.put_values(&bytes, ..)?;

    Ok(())
}

fn put_text_attributes(var: &mut VariableMut, attrs: &[(&str, &str)]) -> Result<(), InputError> {
    for (key, value) in attrs {
        var.put_attribute(key, *value)?;
    }

    Ok(())
}

/// Copies all attributes of the source variable.
pub fn copy_attributes(
    src: &File,
    src_name: &str,
    dst: &mut VariableMut,
) -> Result<(), InputError> {
    let src_var = variable(src, src_name)?;

    for attr in src_var.attributes() {
        // fill value must be set before data is written
        // and is handled by the caller
        if attr.name() == "_FillValue" {
            continue;
        }
        dst.put_attribute(attr.name(), attr.value()?)?;
    }

    Ok(())
}

/// Copies the global attributes of the source file
/// except the ones named in `skip`.
pub fn copy_global_attributes(src: &File, dst: &mut FileMut, skip: &[&str]) -> Result<(), InputError> {
    for attr in src.attributes().filter(|a| !skip.contains(&a.name())) {
        dst.add_attribute(attr.name(), attr.value()?)?;
    }

    Ok(())
}

/// Copies a 1D coordinate variable together with
/// its dimension and attributes.
pub fn copy_coordinate(
    src: &File,
    dst: &mut FileMut,
    name: &str,
    unlimited: bool,
) -> Result<(), InputError> {
    let values: Vec<Float> = variable(src, name)?.get_values(..)?;

    if unlimited {
        if dst.dimension(name).is_none() {
            dst.add_unlimited_dimension(name)?;
        }
    } else {
        ensure_dimension(dst, name, values.len())?;
    }

    let mut var = dst.add_variable::<Float>(name, &[name])?;
    copy_attributes(src, name, &mut var)?;

    if unlimited {
        for (t, value) in values.iter().enumerate() {
            var.put_value(*value, [t])?;
        }
    } else {
        var.put_values(&values, ..)?;
    }

    Ok(())
}

/// Copies a 1D or 2D variable with leading record dimension
/// (like time bounds) record by record. All dimensions
/// must already exist in the destination.
pub fn copy_record_variable(src: &File, dst: &mut FileMut, name: &str) -> Result<(), InputError> {
    let data = super::read_array(src, name)?;
    let dims = super::dimension_names(src, name)?;
    let dims: Vec<&str> = dims.iter().map(String::as_str).collect();

    let mut var = dst.add_variable::<Float>(name, &dims)?;
    copy_attributes(src, name, &mut var)?;

    match data.ndim() {
        1 => {
            for (t, value) in data.iter().enumerate() {
                var.put_value(*value, [t])?;
            }
        }
        2 => {
            for (t, record) in data.outer_iter().enumerate() {
                var.put_values(&flat(&record), (t, ..))?;
            }
        }
        n => {
            return Err(InputError::Mismatch(format!(
                "record variable {} has {} dimensions",
                name, n
            )))
        }
    }

    Ok(())
}

/// Writes a single precision `(time, a, b, c)` field record by record
/// with `_FillValue` and `missing_value`. `NaN` values are written as `fill`.
pub fn put_float32_records(
    file: &mut FileMut,
    name: &str,
    dims: &[&str; 4],
    data: ArrayView4<Float>,
    fill: Float,
    attrs: &[(&str, &str)],
) -> Result<(), InputError> {
    let mut var = file.add_variable::<f32>(name, dims)?;
    var.put_attribute("_FillValue", fill as f32)?;
    var.put_attribute("missing_value", fill as f32)?;
    put_text_attributes(&mut var, attrs)?;

    for (t, record) in data.outer_iter().enumerate() {
        let values: Vec<f32> = record
            .iter()
            .map(|v| if v.is_nan() { fill as f32 } else { *v as f32 })
            .collect();
        var.put_values(&values, (t, .., .., ..))?;
    }

    Ok(())
}

/// Same as [`put_float32_records`] for `(time, a, b)` fields.
pub fn put_float32_records_3d(
    file: &mut FileMut,
    name: &str,
    dims: &[&str; 3],
    data: ArrayView3<Float>,
    fill: Float,
    attrs: &[(&str, &str)],
) -> Result<(), InputError> {
    let mut var = file.add_variable::<f32>(name, dims)?;
    var.put_attribute("_FillValue", fill as f32)?;
    var.put_attribute("missing_value", fill as f32)?;
    put_text_attributes(&mut var, attrs)?;

    for (t, record) in data.outer_iter().enumerate() {
        let values: Vec<f32> = record
            .iter()
            .map(|v| if v.is_nan() { fill as f32 } else { *v as f32 })
            .collect();
        var.put_values(&values, (t, .., ..))?;
    }

    Ok(())
}

/// Builds the text appended to `history` attribute.
pub fn history_entry(message: &str) -> String {
    let args: Vec<String> = std::env::args().collect();

    format!(
        "{} {} {}",
        Local::now().format("%a %b %e %H:%M:%S %Y"),
        args.join(" "),
        message
    )
}
