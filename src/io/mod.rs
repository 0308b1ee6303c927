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

//! Module responsible for reading NetCDF input and
//! writing NetCDF output.
//!
//! All fields are read as [`Float`] arrays in row-major order,
//! so that the last index is the fastest varying, exactly as
//! the variables are laid out in the files. Multiple input files
//! are treated as one dataset split along the record (time) dimension.

pub mod write;

use crate::{errors::InputError, Float};
use log::debug;
use ndarray::{
    concatenate, Array2, Array3, ArrayBase, ArrayD, ArrayView, Axis, Data, Dimension, Ix2, Ix3,
    IxDyn,
};
use netcdf::{AttributeValue, File, Variable};
use std::path::{Path, PathBuf};

/// Values with magnitude above this threshold are treated
/// as missing even when the variable has no fill attribute.
const MISSING_THRESHOLD: Float = 1.0e19;

/// Opens a single NetCDF file for reading.
pub fn open(path: &Path) -> Result<File, InputError> {
    if !path.is_file() {
        return Err(InputError::BadPath(path.display().to_string()));
    }

    debug!("Opening {}", path.display());
    Ok(netcdf::open(path)?)
}

/// Gets the variable from the file or returns
/// a meaningful error.
pub fn variable<'f>(file: &'f File, name: &str) -> Result<Variable<'f>, InputError> {
    file.variable(name)
        .ok_or_else(|| InputError::MissingVariable(name.to_string()))
}

/// Reads the whole variable into dynamic-dimensional array.
pub fn read_array(file: &File, name: &str) -> Result<ArrayD<Float>, InputError> {
    let var = variable(file, name)?;
    read_variable(&var)
}

fn read_variable(var: &Variable) -> Result<ArrayD<Float>, InputError> {
    let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
    let values: Vec<Float> = var.get_values(..)?;

    Ok(ArrayD::from_shape_vec(IxDyn(&shape), values)?)
}

/// Reads a variable that must be two-dimensional.
pub fn read_2d(file: &File, name: &str) -> Result<Array2<Float>, InputError> {
    into_2d(read_array(file, name)?)
}

/// Reads a variable that must be three-dimensional.
pub fn read_3d(file: &File, name: &str) -> Result<Array3<Float>, InputError> {
    into_3d(read_array(file, name)?)
}

pub fn into_2d(data: ArrayD<Float>) -> Result<Array2<Float>, InputError> {
    Ok(data.into_dimensionality::<Ix2>()?)
}

pub fn into_3d(data: ArrayD<Float>) -> Result<Array3<Float>, InputError> {
    Ok(data.into_dimensionality::<Ix3>()?)
}

/// Reads the variable and replaces missing values
/// (`_FillValue`, `missing_value` or huge values) with `fill`.
pub fn read_filled(file: &File, name: &str, fill: Float) -> Result<ArrayD<Float>, InputError> {
    let var = variable(file, name)?;
    let mut data = read_variable(&var)?;
    replace_missing(&mut data, &missing_markers(&var), fill);

    Ok(data)
}

fn missing_markers(var: &Variable) -> Vec<Float> {
    ["_FillValue", "missing_value"]
        .iter()
        .filter_map(|attr| numeric_attribute(var, attr))
        .collect()
}

fn replace_missing(data: &mut ArrayD<Float>, markers: &[Float], fill: Float) {
    data.mapv_inplace(|v| {
        let is_marker = markers
            .iter()
            .any(|m| v == *m || (v - m).abs() <= m.abs() * 1.0e-6);

        if !v.is_finite() || v.abs() > MISSING_THRESHOLD || is_marker {
            fill
        } else {
            v
        }
    });
}

/// Reads a numeric attribute of variable as [`Float`].
pub fn numeric_attribute(var: &Variable, name: &str) -> Option<Float> {
    match var.attribute_value(name)?.ok()? {
        AttributeValue::Double(v) => Some(v),
        AttributeValue::Float(v) => Some(Float::from(v)),
        AttributeValue::Int(v) => Some(Float::from(v)),
        AttributeValue::Short(v) => Some(Float::from(v)),
        AttributeValue::Schar(v) => Some(Float::from(v)),
        AttributeValue::Doubles(v) => v.first().copied(),
        AttributeValue::Floats(v) => v.first().map(|f| Float::from(*f)),
        _ => None,
    }
}

/// Reads a text attribute of variable.
pub fn string_attribute(var: &Variable, name: &str) -> Option<String> {
    match var.attribute_value(name)?.ok()? {
        AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}

/// Reads a global text attribute of file.
pub fn global_string_attribute(file: &File, name: &str) -> Option<String> {
    match file.attribute(name)?.value().ok()? {
        AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}

/// Names of variable dimensions in order.
pub fn dimension_names(file: &File, name: &str) -> Result<Vec<String>, InputError> {
    let var = variable(file, name)?;
    Ok(var.dimensions().iter().map(|d| d.name()).collect())
}

/// Collapses the first (record) axis with arithmetic mean.
pub fn time_mean(data: &ArrayD<Float>) -> Result<ArrayD<Float>, InputError> {
    data.mean_axis(Axis(0)).ok_or_else(|| {
        InputError::Mismatch("cannot average over an empty record dimension".to_string())
    })
}

/// Flattens an array of any layout into a row-major vector,
/// ready to be written with `put_values`.
pub fn flat<S, D, T>(data: &ArrayBase<S, D>) -> Vec<T>
where
    S: Data<Elem = T>,
    D: Dimension,
    T: Copy,
{
    data.iter().copied().collect()
}

/// Set of NetCDF files treated as a single dataset
/// split along the record dimension.
///
/// Variables with leading record dimension are concatenated
/// in the order the files were given, all other variables
/// are read from the first file.
#[derive(Debug)]
pub struct Dataset {
    files: Vec<File>,
    paths: Vec<PathBuf>,
}

impl Dataset {
    pub fn open_all(paths: &[PathBuf]) -> Result<Self, InputError> {
        if paths.is_empty() {
            return Err(InputError::BadPath("no input files given".to_string()));
        }

        let files = paths
            .iter()
            .map(|p| open(p))
            .collect::<Result<Vec<File>, InputError>>()?;

        Ok(Dataset {
            files,
            paths: paths.to_vec(),
        })
    }

    pub fn first(&self) -> &File {
        &self.files[0]
    }

    pub fn first_path(&self) -> &Path {
        &self.paths[0]
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.first().variable(name).is_some()
    }

    pub fn dimension_names(&self, name: &str) -> Result<Vec<String>, InputError> {
        dimension_names(self.first(), name)
    }

    /// Number of dimensions of variable.
    pub fn ndim(&self, name: &str) -> Result<usize, InputError> {
        Ok(variable(self.first(), name)?.dimensions().len())
    }

    pub fn string_attribute(&self, var_name: &str, attr: &str) -> Option<String> {
        let var = self.first().variable(var_name)?;
        string_attribute(&var, attr)
    }

    pub fn title(&self) -> String {
        global_string_attribute(self.first(), "title").unwrap_or_default()
    }

    pub fn read(&self, name: &str) -> Result<ArrayD<Float>, InputError> {
        self.read_with(name, |file| read_array(file, name))
    }

    pub fn read_filled(&self, name: &str, fill: Float) -> Result<ArrayD<Float>, InputError> {
        self.read_with(name, |file| read_filled(file, name, fill))
    }

    fn read_with<F>(&self, name: &str, reader: F) -> Result<ArrayD<Float>, InputError>
    where
        F: Fn(&File) -> Result<ArrayD<Float>, InputError>,
    {
        if self.files.len() == 1 || !self.is_record_variable(name)? {
            return reader(self.first());
        }

        let parts = self
            .files
            .iter()
            .map(&reader)
            .collect::<Result<Vec<ArrayD<Float>>, InputError>>()?;

        let views: Vec<ArrayView<Float, IxDyn>> = parts.iter().map(|p| p.view()).collect();

        Ok(concatenate(Axis(0), &views)?)
    }

    fn is_record_variable(&self, name: &str) -> Result<bool, InputError> {
        let var = variable(self.first(), name)?;

        Ok(var
            .dimensions()
            .first()
            .map(|d| d.is_unlimited() || d.name() == "time")
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::{flat, replace_missing};
    use ndarray::{array, ArrayD};

    #[test]
    fn missing_values_replaced() {
        let mut data: ArrayD<f64> = array![[1.0, 1.0e20], [-1.0e34, f64::NAN]].into_dyn();
        replace_missing(&mut data, &[-1.0e34], 0.0);

        assert_eq!(flat(&data), vec![1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn fill_marker_replaced_below_threshold() {
        let mut data: ArrayD<f64> = array![[-999.0, 5.0]].into_dyn();
        replace_missing(&mut data, &[-999.0], 0.0);

        assert_eq!(flat(&data), vec![0.0, 5.0]);
    }

    #[test]
    fn flat_follows_logical_order() {
        let data = array![[1, 2], [3, 4]];
        let transposed = data.t();

        assert_eq!(flat(&transposed), vec![1, 3, 2, 4]);
    }
}
