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

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Error while reading config.yaml: {0}")]
    Config(#[from] ConfigError),

    #[error("Error while reading input data: {0}")]
    Input(#[from] InputError),

    #[error("Error in spatial toolbox: {0}")]
    Toolbox(#[from] ToolboxError),

    #[error("Error while handling topography edits: {0}")]
    Edit(#[from] EditError),

    #[error("Error while creating ThreadPool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Error while writing output: {0}")]
    Io(#[from] std::io::Error),

    #[error("Error while writing CSV output: {0}")]
    Csv(#[from] csv::Error),

    #[error("Output cannot be written: {0}")]
    FaultyOutput(&'static str),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot open config.yaml: {0}")]
    CantOpenFile(#[from] std::io::Error),

    #[error("Cannot deserialize config.yaml: {0}")]
    CantDeserialize(#[from] serde_yaml::Error),

    #[error("Configuration component is out of bounds {0}")]
    OutOfBounds(&'static str),
}

#[derive(Error, Debug)]
pub enum InputError {
    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    #[error("Variable {0} not found in input file")]
    MissingVariable(String),

    #[error("Dimension {0} not found in input file")]
    MissingDimension(String),

    #[error("Data has unexpected shape: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Input data mismatch: {0}")]
    Mismatch(String),

    #[error("Input path does not exist or is not usable: {0}")]
    BadPath(String),
}

#[derive(Error, Debug)]
pub enum ToolboxError {
    #[error("Incorrect array shape: {0}")]
    Shape(String),

    #[error("Unknown section representation: {0}")]
    UnknownRepresentation(String),

    #[error("Search failed: {0}")]
    Search(#[from] SearchError),

    #[error("Cannot determine vertical coordinate: {0}")]
    VerticalCoordinate(String),

    #[error("Error while reading input data: {0}")]
    Input(#[from] InputError),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchError {
    #[error("Searched array is empty")]
    EmptyArray,

    #[error("Searched value is out of array bounds")]
    OutOfBounds,
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("Units mismatch between edits ({0}) and topography ({1})")]
    UnitsMismatch(String, String),

    #[error("{0}-dimension mismatch between edits and topography")]
    DimensionMismatch(char),

    #[error("List of existing edits ({0}) is longer than list of new edits ({1})")]
    TooManyExisting(usize, usize),

    #[error("Cannot parse edits file line {0}: {1}")]
    Parse(usize, String),

    #[error("Error while reading or writing edits file: {0}")]
    Csv(#[from] csv::Error),

    #[error("Edit at i={0}, j={1} is outside of the topography")]
    OutOfDomain(usize, usize),

    #[error("Error while reading input data: {0}")]
    Input(#[from] InputError),

    #[error("I/O error while handling edits: {0}")]
    Io(#[from] std::io::Error),
}

impl From<netcdf::Error> for ToolError {
    fn from(err: netcdf::Error) -> Self {
        ToolError::Input(InputError::NetCdf(err))
    }
}

impl From<netcdf::Error> for EditError {
    fn from(err: netcdf::Error) -> Self {
        EditError::Input(InputError::NetCdf(err))
    }
}

impl From<SearchError> for ToolError {
    fn from(err: SearchError) -> Self {
        ToolError::Toolbox(ToolboxError::Search(err))
    }
}
