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

//! Module responsible for parsing and checking the configuration file.
//!
//! The configuration file uses [YAML](https://en.wikipedia.org/wiki/YAML)
//! and `serde` to enforce strong typing and automatic type checking.
//! All sections are optional and when the file does not exist
//! the defaults are used.
//!
//! The structures and their fields in this module directly correspond to
//! the fields inside `config.yaml` so you can check this documentation
//! for more details how to set the config file.

use crate::constants::{CP, RHO_0};
use crate::diagnostics::transports::{default_sections, Section};
use crate::errors::ConfigError;
use crate::Float;
use log::debug;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// _(Optional)_ Fields with information about
/// resources available for the tools.
#[derive(Clone, PartialEq, PartialOrd, Debug, Deserialize)]
pub struct Resources {
    /// _(Optional)_ Thread count used by the tools that
    /// process sections or basins in parallel.
    ///
    /// Cannot be less than `1`. Defaults to `1`.
    #[serde(default = "Resources::default_threads")]
    pub threads: u16,

    /// _(Optional)_ Heap memory limit in MB.
    /// Useful for enabling meaningful Out-of-memory error messages
    /// when processing large model output.
    ///
    /// Cannot be less than `128`. Defaults to whole addressable-space
    /// (`2^32` or `2^64` bytes).
    #[serde(default = "Resources::default_memory")]
    pub memory: usize,
}

impl Resources {
    fn default_threads() -> u16 {
        1
    }

    fn default_memory() -> usize {
        usize::MAX / (1024 * 1024)
    }

    /// Checks if thread count and memory limit are
    /// above limits.
    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        if self.threads < 1 {
            return Err(ConfigError::OutOfBounds(
                "Available threads cannot be less than 1",
            ));
        }

        if self.memory < 128 {
            return Err(ConfigError::OutOfBounds(
                "Available memory cannot be less than 128 MB",
            ));
        }

        Ok(())
    }
}

impl Default for Resources {
    fn default() -> Self {
        Resources {
            threads: Resources::default_threads(),
            memory: Resources::default_memory(),
        }
    }
}

/// _(Optional)_ Seawater constants used in heat transport.
#[derive(Clone, PartialEq, PartialOrd, Debug, Deserialize)]
pub struct Physics {
    /// Reference density \[kg m-3\]. Defaults to `1035.0`.
    #[serde(default = "Physics::default_rho0")]
    pub rho0: Float,

    /// Specific heat capacity \[J kg-1 K-1\]. Defaults to `3989.0`.
    #[serde(default = "Physics::default_cp")]
    pub cp: Float,
}

impl Physics {
    fn default_rho0() -> Float {
        RHO_0
    }

    fn default_cp() -> Float {
        CP
    }

    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        if self.rho0 <= 0.0 {
            return Err(ConfigError::OutOfBounds("Reference density must be positive"));
        }

        if self.cp <= 0.0 {
            return Err(ConfigError::OutOfBounds("Heat capacity must be positive"));
        }

        Ok(())
    }
}

impl Default for Physics {
    fn default() -> Self {
        Physics {
            rho0: Physics::default_rho0(),
            cp: Physics::default_cp(),
        }
    }
}

/// _(Optional)_ Where the diagnostics are written.
#[derive(Clone, PartialEq, PartialOrd, Debug, Deserialize)]
pub struct Output {
    /// Output directory of diagnostics, created when missing.
    /// Defaults to the working directory.
    #[serde(default = "Output::default_directory")]
    pub directory: PathBuf,
}

impl Output {
    fn default_directory() -> PathBuf {
        PathBuf::from(".")
    }
}

impl Default for Output {
    fn default() -> Self {
        Output {
            directory: Output::default_directory(),
        }
    }
}

/// Main config structure representing the fields in
/// configuration file.
#[derive(Clone, PartialEq, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub resources: Resources,

    #[serde(default)]
    pub physics: Physics,

    #[serde(default)]
    pub output: Output,

    /// _(Optional)_ Sections used by `section-transports`
    /// instead of the OMIP sections.
    #[serde(default)]
    pub sections: Option<Vec<Section>>,
}

impl Config {
    /// Config structure constructor, responsible for
    /// deserializing configuration and checking it.
    pub fn new_from_file(file_path: &Path) -> Result<Config, ConfigError> {
        let data = fs::read(file_path)?;
        let config: Config = serde_yaml::from_slice(data.as_slice())?;

        config.resources.check_bounds()?;
        config.physics.check_bounds()?;

        if let Some(sections) = &config.sections {
            if sections.iter().any(|s| s.parts.is_empty()) {
                return Err(ConfigError::OutOfBounds("Each section needs at least one part"));
            }
        }

        Ok(config)
    }

    /// Reads the configuration file if it exists,
    /// otherwise returns the defaults.
    pub fn new_or_default(file_path: &Path) -> Result<Config, ConfigError> {
        if file_path.is_file() {
            debug!("Reading configuration from {}", file_path.display());
            Config::new_from_file(file_path)
        } else {
            debug!("{} not found, using default configuration", file_path.display());
            Ok(Config::default())
        }
    }

    /// Configured sections or the OMIP sections.
    pub fn sections(&self) -> Vec<Section> {
        self.sections.clone().unwrap_or_else(default_sections)
    }
}

#[cfg(test)]
mod tests {
    use super::Config;
    use crate::diagnostics::transports::FlowVariable;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    #[test]
    fn defaults_without_file() {
        let config = Config::new_or_default(Path::new("surely/not/here.yaml")).unwrap();

        assert_eq!(config.resources.threads, 1);
        assert_eq!(config.physics.rho0, 1035.0);
        assert_eq!(config.output.directory, PathBuf::from("."));
        assert_eq!(config.sections().len(), 18);
    }

    #[test]
    fn partial_file_filled_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "resources:\n  threads: 4\nsections:\n  - label: Strait\n    parts:\n      - dir: ocean_Strait\n        var: vmo\n",
        )
        .unwrap();

        let config = Config::new_or_default(&path).unwrap();

        assert_eq!(config.resources.threads, 4);
        assert_eq!(config.physics.cp, 3989.0);
        let sections = config.sections();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].parts[0].var, FlowVariable::Vmo);
    }

    #[test]
    fn out_of_bounds_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");

        fs::write(&path, "resources:\n  memory: 64\n").unwrap();
        assert!(Config::new_from_file(&path).is_err());

        fs::write(&path, "physics:\n  rho0: -1.0\n").unwrap();
        assert!(Config::new_from_file(&path).is_err());

        fs::write(&path, "resources: [1, 2]\n").unwrap();
        assert!(Config::new_from_file(&path).is_err());
    }
}
