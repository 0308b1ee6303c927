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

//! Module connecting the command line with the tools.
//!
//! Each subcommand is a sequential transformation: arguments are parsed,
//! input is read, the tool computes its fields and writes them out.
//! Tools processing many independent pieces (sections, basins)
//! use the thread pool of [`Core`].

pub mod cli;
mod configuration;

use crate::diagnostics::{
    bias::{run_monthly_sst_bias, run_sst_bias},
    drift::run_ts_drift,
    eke::run_eke,
    heat_transport::run_heat_transport,
    mld::run_mld,
    overturning::run_moc,
    refine::{run_heat_refine_diag, run_refine_diag},
    transports::run_section_transports,
    variance::run_monthly_variance,
    vertical_section::run_vertical_sections,
    vertical_velocity::{run_vertical_velocity, Transports},
    zonal_bias::run_zonal_bias,
};
use crate::errors::{ConfigError, ToolError};
use crate::grid::{append_basin_mask, supergrid::Supergrid, GridSpec};
use crate::topography::files::{apply_edits_file, edit_topography, extract_edits};
use crate::ALLOCATOR;
use cli::{Cli, Commands, DiagnosticArgs};
use configuration::Config;
use log::{debug, info, warn};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Runs the tool selected on the command line.
pub fn main(cli: Cli) -> Result<(), ToolError> {
    info!("Preparing the tools core");

    let core = Core::new(&cli.config)?;

    match cli.command {
        Commands::BasinMask(args) => {
            let output = append_basin_mask(&args.infile, args.outfile.as_deref(), args.force)?;
            info!("Basin codes written to {}", output.display());
        }
        Commands::EditTopo(args) => {
            let output = edit_topography(
                &args.filename,
                &args.variable,
                args.output.as_deref(),
                args.reference.as_deref(),
                args.apply.as_deref(),
                args.supergrid.as_deref(),
            )?;
            info!("Edited topography written to {}", output.display());
        }
        Commands::ApplyEdits(args) => {
            apply_edits_file(&args.edits, &args.topography, &args.variable)?;
        }
        Commands::ExtractEdits(args) => {
            extract_edits(&args.topography, &args.variable, args.output.as_deref())?;
        }
        Commands::MakeSupergrid(args) => {
            let supergrid = Supergrid::new(
                args.projection.into(),
                args.nx,
                args.ny,
                args.lat0,
                args.lenlat,
                args.lon0,
                args.lenlon,
                args.cyclic_x,
                args.tripolar_n,
            )?;
            supergrid.write(&args.output)?;
            info!("Supergrid written to {}", args.output.display());
        }
        Commands::Moc(args) => {
            let (grid, out_dir) = core.prepare_diagnostic(&args)?;
            run_moc(&args.files, &grid, &out_dir, &core.threadpool)?;
        }
        Commands::HeatTransport(args) => {
            let (grid, out_dir) = core.prepare_diagnostic(&args.diagnostic)?;
            let physics = &core.config.physics;

            run_heat_transport(
                &args.diagnostic.files,
                &grid,
                (physics.rho0, physics.cp),
                &out_dir,
                &core.threadpool,
                args.observations.as_deref(),
            )?;
        }
        Commands::RefineDiag(args) => {
            let written = run_refine_diag(
                &args.infile,
                &args.basin_file,
                args.axis.into(),
                args.outfile.as_deref(),
                args.refine_dir.as_deref(),
                &core.threadpool,
            )?;

            match written {
                Some(path) => info!("Refined diagnostics written to {}", path.display()),
                None => warn!("Nothing was refined"),
            }
        }
        Commands::RefineHeat(args) => {
            let path = run_heat_refine_diag(
                &args.infile,
                &args.basin_file,
                args.outfile.as_deref(),
                args.refine_dir.as_deref(),
            )?;
            info!("Heat transports written to {}", path.display());
        }
        Commands::SectionTransports(args) => {
            let out_dir = core.output_dir(args.outdir.as_deref())?;

            run_section_transports(
                &args.pp_root,
                core.config.sections(),
                args.time_range(),
                &out_dir,
                &core.threadpool,
            )?;
        }
        Commands::SstBias(args) => {
            let (grid, out_dir) = core.prepare_diagnostic(&args.diagnostic)?;
            run_sst_bias(&args.diagnostic.files, &args.woa, &grid, &out_dir)?;
        }
        Commands::MonthlySstBias(args) => {
            let (grid, out_dir) = core.prepare_diagnostic(&args.diagnostic)?;
            run_monthly_sst_bias(&args.diagnostic.files, &args.woa, &grid, &out_dir)?;
        }
        Commands::VerticalSection(args) => {
            let (grid, out_dir) = core.prepare_diagnostic(&args.bias.diagnostic)?;

            run_vertical_sections(
                &args.bias.diagnostic.files,
                &args.bias.woa,
                &grid,
                args.field.into(),
                args.representation.into(),
                &out_dir,
            )?;
        }
        Commands::ZonalBias(args) => {
            let (grid, out_dir) = core.prepare_diagnostic(&args.bias.diagnostic)?;

            run_zonal_bias(
                &args.bias.diagnostic.files,
                &args.bias.woa,
                &grid,
                args.tracer.into(),
                args.representation.into(),
                &out_dir,
            )?;
        }
        Commands::Mld(args) => {
            let (grid, out_dir) = core.prepare_diagnostic(&args.diagnostic)?;
            run_mld(&args.diagnostic.files, &grid, args.obs.as_deref(), &out_dir)?;
        }
        Commands::Eke(args) => {
            let out_dir = core.output_dir(args.outdir.as_deref())?;
            run_eke(&args.files, &args.static_file, &out_dir)?;
        }
        Commands::TsDrift(args) => {
            let out_dir = core.output_dir(args.outdir.as_deref())?;
            run_ts_drift(&args.prefixes, args.time_range(), &out_dir)?;
        }
        Commands::VerticalVelocity(args) => {
            let out_dir = core.output_dir(args.outdir.as_deref())?;
            let transports = Transports {
                u_name: &args.uname,
                v_name: &args.vname,
                wrap_x: !args.no_wrap_x,
                wrap_y: args.wrap_y,
            };

            let path = run_vertical_velocity(
                &args.infile,
                &transports,
                args.static_file.as_deref(),
                core.config.physics.rho0,
                &out_dir,
            )?;
            info!("Vertical transport written to {}", path.display());
        }
        Commands::MonthlyVariance(args) => {
            run_monthly_variance(&args.variable, &args.daily_file, &args.output)?;
            info!("Monthly variance written to {}", args.output.display());
        }
    }

    Ok(())
}

/// Structure containing the configuration and resources
/// shared by all tools.
#[derive(Debug)]
pub struct Core {
    pub config: Config,
    pub threadpool: ThreadPool,
}

impl Core {
    /// Tools [`Core`] constructor.
    ///
    /// Reads the configuration (or uses defaults), sets the memory
    /// limit and prepares the thread pool.
    pub fn new(config_path: &Path) -> Result<Self, ToolError> {
        let config = Config::new_or_default(config_path)?;

        debug!("Setting memory limit");
        ALLOCATOR
            .set_limit(config.resources.memory.saturating_mul(1024 * 1024))
            .map_err(|_| {
                ConfigError::OutOfBounds("Memory limit is lower than memory already in use")
            })?;

        debug!("Setting up ThreadPool");
        let threadpool = ThreadPoolBuilder::new()
            .num_threads(config.resources.threads as usize)
            .stack_size(2 * 1024 * 1024)
            .build()?;

        Ok(Core { config, threadpool })
    }

    /// Output directory given on the command line or in the configuration.
    fn output_dir(&self, cli_dir: Option<&Path>) -> Result<PathBuf, ToolError> {
        let out_dir = cli_dir.unwrap_or(&self.config.output.directory);
        prepare_output_dir(out_dir)?;

        Ok(out_dir.to_path_buf())
    }

    fn prepare_diagnostic(&self, args: &DiagnosticArgs) -> Result<(GridSpec, PathBuf), ToolError> {
        let out_dir = self.output_dir(args.outdir.as_deref())?;
        let grid = GridSpec::load(&args.gridspec)?;

        Ok((grid, out_dir))
    }
}

/// Makes sure the output directory exists.
///
/// Unlike other outputs the diagnostics are written next to
/// existing files, so a non-empty directory is accepted.
fn prepare_output_dir(out_path: &Path) -> Result<(), ToolError> {
    debug!("Checking and setting output directory");

    if out_path.is_dir() {
        debug!("Output directory exists so continuing");
    } else if out_path.exists() {
        return Err(ToolError::FaultyOutput(
            "Output path exists and is not a directory",
        ));
    } else {
        debug!("Output directory does not exist so creating a new one");
        fs::create_dir_all(out_path)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{prepare_output_dir, Core};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn output_dir_created_or_reused() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b");

        prepare_output_dir(&nested).unwrap();
        assert!(nested.is_dir());
        fs::write(nested.join("MOC_global.nc"), b"").unwrap();
        assert!(prepare_output_dir(&nested).is_ok());

        let file = dir.path().join("file");
        fs::write(&file, b"").unwrap();
        assert!(prepare_output_dir(&file).is_err());
    }

    #[test]
    fn core_from_configuration() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "resources:\n  threads: 2\n").unwrap();

        let core = Core::new(&path).unwrap();
        assert_eq!(core.threadpool.current_num_threads(), 2);

        let out_dir = core.output_dir(Some(&dir.path().join("out"))).unwrap();
        assert!(out_dir.is_dir());
    }
}
