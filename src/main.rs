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

//! MOM6 Tools (m6tools) is a collection of pre- and post-processing
//! utilities for the MOM6 ocean model.
//!
//! It gathers the topography editing, grid generation, basin masking
//! and model validation diagnostics (overturning and heat transport,
//! section transports, biases w.r.t. climatologies, mixed layer depth,
//! eddy kinetic energy, drift and the CMIP6 refine-diag) behind one
//! command-line program. Every tool reads NetCDF input,
//! computes and writes NetCDF or CSV output.
//!
//! The spatial helpers shared by all tools live in [`toolbox`].

mod constants;
mod diagnostics;
mod errors;
mod grid;
mod io;
mod toolbox;
mod tools;
mod topography;

use cap::Cap;
use clap::Parser;
use env_logger::Env;
use log::{error, info};
use std::{alloc, process::ExitCode};

type Float = f64;

/// Global allocator used by the tools.
///
/// Use of static global allocator allows for capping the memory to the limit set by user
/// in configuration file and in effect provide better [OOM error](https://en.wikipedia.org/wiki/Out_of_memory) handling.
#[global_allocator]
static ALLOCATOR: Cap<alloc::System> = Cap::new(alloc::System, usize::MAX);

/// The main program function.
/// Parses the command line, prepares the logger and calls the [`tools::main`].
///
/// To provide meaningful and high-quality error messages the `env_logger`
/// needs to be initiated before any log messages are possible to occur.
fn main() -> ExitCode {
    let cli = tools::cli::Cli::parse();

    let default_level = if cli.verbose || cfg!(feature = "debug") {
        "debug"
    } else {
        "info"
    };

    let logger_env = Env::new().filter_or("M6T_LOG_LEVEL", default_level);

    env_logger::Builder::from_env(logger_env)
        .format_timestamp_millis()
        .init();

    match tools::main(cli) {
        Ok(_) => {
            info!("Tool execution finished. Check the output directory and log.");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("Tool execution failed with error: {}", err);
            ExitCode::FAILURE
        }
    }
}
