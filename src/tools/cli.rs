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

//! Command line interface of the tools.
//!
//! Every tool is a subcommand with its own arguments,
//! options shared by all tools are global.

use crate::diagnostics::{refine::VerticalAxis, vertical_section::Field, zonal_bias::Tracer};
use crate::grid::supergrid::Projection;
use crate::toolbox::section::Representation;
use crate::Float;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "m6tools")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Pre- and post-processing tools for the MOM6 ocean model", long_about = None)]
pub struct Cli {
    /// Print debug messages
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file, defaults are used when it does not exist
    #[arg(short, long, global = true, default_value = "config.yaml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Append the CF basin code variable to an ocean static file
    BasinMask(BasinMaskArgs),
    /// Apply a list of edits to topography and record them
    EditTopo(EditTopoArgs),
    /// Apply edits stored in a NetCDF file to topography in place
    ApplyEdits(ApplyEditsArgs),
    /// Extract edits recorded in topography
    ExtractEdits(ExtractEditsArgs),
    /// Create a regular supergrid with metrics
    MakeSupergrid(SupergridArgs),
    /// Meridional overturning streamfunction
    Moc(DiagnosticArgs),
    /// Poleward heat transport
    HeatTransport(HeatTransportArgs),
    /// CMIP6 overturning diagnostics of monthly z-space output
    RefineDiag(RefineDiagArgs),
    /// CMIP6 heat transports (hfy, hfx, hfbasin) of monthly 2D output
    RefineHeat(RefineHeatArgs),
    /// Transports through straits and passages
    SectionTransports(SectionTransportsArgs),
    /// Annual mean SST bias w.r.t. WOA'05
    SstBias(BiasArgs),
    /// SST bias w.r.t. WOA'05 of the months present in the input
    MonthlySstBias(BiasArgs),
    /// Equatorial and tropical Pacific sections of bias w.r.t. WOA'05
    VerticalSection(VerticalSectionArgs),
    /// Zonally averaged temperature or salinity bias by basin
    ZonalBias(ZonalBiasArgs),
    /// Annual extremes of the monthly mixed layer depth climatology
    Mld(MldArgs),
    /// Annual mean surface eddy kinetic energy
    Eke(EkeArgs),
    /// Drift of horizontally averaged temperature and salinity
    TsDrift(TsDriftArgs),
    /// Vertical transport from convergence of horizontal transports
    VerticalVelocity(VerticalVelocityArgs),
    /// Monthly mean, square and variance of a daily field
    MonthlyVariance(MonthlyVarianceArgs),
}

#[derive(Args, Debug)]
pub struct BasinMaskArgs {
    /// Static file with geolon, geolat and deptho
    pub infile: PathBuf,

    /// Output file, by default input name with "basins" before extension
    #[arg(short, long)]
    pub outfile: Option<PathBuf>,

    /// Overwrite existing output
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct EditTopoArgs {
    /// Topography file to edit
    pub filename: PathBuf,

    /// Name of the topography variable
    #[arg(long, default_value = "depth")]
    pub variable: String,

    /// Output file, by default input name with "edit_" prefix
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Reference topography file with the same variable
    #[arg(short, long)]
    pub reference: Option<PathBuf>,

    /// File with edits to apply (NetCDF or text)
    #[arg(short, long)]
    pub apply: Option<PathBuf>,

    /// Supergrid with coordinates of the topography
    #[arg(short, long)]
    pub supergrid: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ApplyEditsArgs {
    /// NetCDF file with iEdit, jEdit and zEdit
    pub edits: PathBuf,

    /// Topography file modified in place
    pub topography: PathBuf,

    /// Name of the topography variable
    #[arg(long, default_value = "depth")]
    pub variable: String,
}

#[derive(Args, Debug)]
pub struct ExtractEditsArgs {
    /// Topography file with recorded edits
    pub topography: PathBuf,

    /// Name of the topography variable
    #[arg(long, default_value = "depth")]
    pub variable: String,

    /// Write edits into this NetCDF file instead of printing them
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ProjectionArg {
    Spherical,
    Mercator,
}

impl From<ProjectionArg> for Projection {
    fn from(arg: ProjectionArg) -> Self {
        match arg {
            ProjectionArg::Spherical => Projection::Spherical,
            ProjectionArg::Mercator => Projection::Mercator,
        }
    }
}

#[derive(Args, Debug)]
pub struct SupergridArgs {
    /// Output supergrid file
    #[arg(default_value = "ocean_hgrid.nc")]
    pub output: PathBuf,

    #[arg(short, long, value_enum, default_value_t = ProjectionArg::Spherical)]
    pub projection: ProjectionArg,

    /// Number of supergrid cells in x
    #[arg(long)]
    pub nx: usize,

    /// Number of supergrid cells in y
    #[arg(long)]
    pub ny: usize,

    /// Southern edge latitude
    #[arg(long, allow_hyphen_values = true, default_value_t = -80.0)]
    pub lat0: Float,

    /// Latitudinal extent
    #[arg(long, default_value_t = 160.0)]
    pub lenlat: Float,

    /// Western edge longitude
    #[arg(long, allow_hyphen_values = true, default_value_t = -300.0)]
    pub lon0: Float,

    /// Longitudinal extent
    #[arg(long, default_value_t = 360.0)]
    pub lenlon: Float,

    #[arg(long)]
    pub cyclic_x: bool,

    #[arg(long)]
    pub tripolar_n: bool,
}

#[derive(Args, Debug)]
pub struct DiagnosticArgs {
    /// Annually-averaged model output, files are joined along time
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Directory with ocean_hgrid.nc, ocean_mask.nc and ocean_topog.nc
    #[arg(short, long)]
    pub gridspec: PathBuf,

    /// Output directory, overrides the configuration
    #[arg(short, long)]
    pub outdir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct HeatTransportArgs {
    #[command(flatten)]
    pub diagnostic: DiagnosticArgs,

    /// Trenberth and Caron (2001) estimates to include in output
    #[arg(long)]
    pub observations: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum AxisArg {
    /// z* levels
    Z,
    /// Potential density (sigma2)
    Rho2,
}

impl From<AxisArg> for VerticalAxis {
    fn from(arg: AxisArg) -> Self {
        match arg {
            AxisArg::Z => VerticalAxis::Depth,
            AxisArg::Rho2 => VerticalAxis::Density,
        }
    }
}

#[derive(Args, Debug)]
pub struct RefineDiagArgs {
    /// Monthly ocean output with vmo, vhGM or vhml
    pub infile: PathBuf,

    /// File with basin codes
    #[arg(short, long)]
    pub basin_file: PathBuf,

    /// Output file name
    #[arg(short, long)]
    pub outfile: Option<PathBuf>,

    /// Directory of refined output
    #[arg(short, long)]
    pub refine_dir: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = AxisArg::Z)]
    pub axis: AxisArg,
}

#[derive(Args, Debug)]
pub struct RefineHeatArgs {
    /// Monthly 2D ocean output with T_ady_2d and T_adx_2d
    pub infile: PathBuf,

    /// File with basin codes
    #[arg(short, long)]
    pub basin_file: PathBuf,

    /// Output file name
    #[arg(short, long)]
    pub outfile: Option<PathBuf>,

    /// Directory of refined output
    #[arg(short, long)]
    pub refine_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SectionTransportsArgs {
    /// Post-processing root directory with ocean_<section> subdirectories
    pub pp_root: PathBuf,

    /// First and last year included
    #[arg(short, long, num_args = 2, value_names = ["START", "END"], allow_hyphen_values = true)]
    pub trange: Option<Vec<Float>>,

    /// Output directory, overrides the configuration
    #[arg(short, long)]
    pub outdir: Option<PathBuf>,
}

impl SectionTransportsArgs {
    pub fn time_range(&self) -> Option<(Float, Float)> {
        match self.trange.as_deref() {
            Some([start, end]) => Some((*start, *end)),
            _ => None,
        }
    }
}

#[derive(Args, Debug)]
pub struct BiasArgs {
    #[command(flatten)]
    pub diagnostic: DiagnosticArgs,

    /// WOA (or other gridded observations) file
    #[arg(short, long)]
    pub woa: PathBuf,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum FieldArg {
    Temperature,
    Sigma0,
    /// Model zonal velocity on the meridional lines
    ZonalVelocity,
}

impl From<FieldArg> for Field {
    fn from(arg: FieldArg) -> Self {
        match arg {
            FieldArg::Temperature => Field::Temperature,
            FieldArg::Sigma0 => Field::Sigma0,
            FieldArg::ZonalVelocity => Field::ZonalVelocity,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum RepresentationArg {
    Pcm,
    Plm,
    Linear,
}

impl From<RepresentationArg> for Representation {
    fn from(arg: RepresentationArg) -> Self {
        match arg {
            RepresentationArg::Pcm => Representation::Pcm,
            RepresentationArg::Plm => Representation::Plm,
            RepresentationArg::Linear => Representation::Linear,
        }
    }
}

#[derive(Args, Debug)]
pub struct VerticalSectionArgs {
    #[command(flatten)]
    pub bias: BiasArgs,

    #[arg(short, long, value_enum, default_value_t = FieldArg::Temperature)]
    pub field: FieldArg,

    /// Reconstruction of layers in output mesh
    #[arg(short, long, value_enum, default_value_t = RepresentationArg::Pcm)]
    pub representation: RepresentationArg,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum TracerArg {
    Temperature,
    Salinity,
}

impl From<TracerArg> for Tracer {
    fn from(arg: TracerArg) -> Self {
        match arg {
            TracerArg::Temperature => Tracer::Temperature,
            TracerArg::Salinity => Tracer::Salinity,
        }
    }
}

#[derive(Args, Debug)]
pub struct ZonalBiasArgs {
    #[command(flatten)]
    pub bias: BiasArgs,

    #[arg(long, value_enum, default_value_t = TracerArg::Temperature)]
    pub tracer: TracerArg,

    /// Reconstruction of layers in output mesh
    #[arg(short, long, value_enum, default_value_t = RepresentationArg::Pcm)]
    pub representation: RepresentationArg,
}

#[derive(Args, Debug)]
pub struct MldArgs {
    #[command(flatten)]
    pub diagnostic: DiagnosticArgs,

    /// Hosoda et al. (2010) mixed layer depth climatology
    #[arg(long)]
    pub obs: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct EkeArgs {
    /// Daily output with ssu and ssv, files are joined along time
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Ocean static file with geolon, geolat, wet and area_t
    #[arg(short, long = "static")]
    pub static_file: PathBuf,

    /// Output directory, overrides the configuration
    #[arg(short, long)]
    pub outdir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct TsDriftArgs {
    /// Prefixes of <prefix>.thetao_xyave.nc and <prefix>.so_xyave.nc series
    #[arg(required = true)]
    pub prefixes: Vec<PathBuf>,

    /// First and last year included
    #[arg(short, long, num_args = 2, value_names = ["START", "END"], allow_hyphen_values = true)]
    pub trange: Option<Vec<Float>>,

    /// Output directory, overrides the configuration
    #[arg(short, long)]
    pub outdir: Option<PathBuf>,
}

impl TsDriftArgs {
    pub fn time_range(&self) -> Option<(Float, Float)> {
        match self.trange.as_deref() {
            Some([start, end]) => Some((*start, *end)),
            _ => None,
        }
    }
}

#[derive(Args, Debug)]
pub struct VerticalVelocityArgs {
    /// Output with horizontal mass transports
    pub infile: PathBuf,

    #[arg(long, default_value = "umo")]
    pub uname: String,

    #[arg(long, default_value = "vmo")]
    pub vname: String,

    /// Closed western and eastern boundaries
    #[arg(long)]
    pub no_wrap_x: bool,

    /// Periodic meridional boundary
    #[arg(long)]
    pub wrap_y: bool,

    /// Ocean static file with areacello, gives velocity instead of transport
    #[arg(short, long = "static")]
    pub static_file: Option<PathBuf>,

    /// Output directory, overrides the configuration
    #[arg(short, long)]
    pub outdir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct MonthlyVarianceArgs {
    /// Variable to process
    pub variable: String,

    /// One year of daily records
    pub daily_file: PathBuf,

    /// Output file
    pub output: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::{AxisArg, Cli, Commands, FieldArg, TracerArg};
    use clap::{CommandFactory, Parser};
    use std::path::PathBuf;

    #[test]
    fn cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_options_after_subcommand() {
        let cli = Cli::parse_from([
            "m6tools",
            "refine-diag",
            "month.nc",
            "-b",
            "basin_codes.nc",
            "--axis",
            "rho2",
            "-v",
        ]);

        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from("config.yaml"));

        match cli.command {
            Commands::RefineDiag(args) => {
                assert_eq!(args.axis, AxisArg::Rho2);
                assert_eq!(args.basin_file, PathBuf::from("basin_codes.nc"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn time_range_needs_two_values() {
        let cli = Cli::parse_from(["m6tools", "section-transports", "pp", "-t", "1900", "1950"]);

        match cli.command {
            Commands::SectionTransports(args) => assert_eq!(args.time_range(), Some((1900.0, 1950.0))),
            other => panic!("unexpected command {:?}", other),
        }

        assert!(Cli::try_parse_from(["m6tools", "section-transports", "pp", "-t", "1900"]).is_err());
    }

    #[test]
    fn zonal_velocity_section_field() {
        let cli = Cli::parse_from([
            "m6tools",
            "vertical-section",
            "annual.nc",
            "-g",
            "gridspec",
            "-w",
            "woa.nc",
            "--field",
            "zonal-velocity",
        ]);

        match cli.command {
            Commands::VerticalSection(args) => assert_eq!(args.field, FieldArg::ZonalVelocity),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn zonal_bias_of_salinity() {
        let cli = Cli::parse_from([
            "m6tools", "zonal-bias", "annual.nc", "-g", "gridspec", "-w", "woa.nc", "--tracer", "salinity",
        ]);

        match cli.command {
            Commands::ZonalBias(args) => {
                assert_eq!(args.tracer, TracerArg::Salinity);
                assert_eq!(args.bias.woa, PathBuf::from("woa.nc"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn vertical_velocity_defaults() {
        let cli = Cli::parse_from(["m6tools", "vertical-velocity", "month.nc", "--wrap-y"]);

        match cli.command {
            Commands::VerticalVelocity(args) => {
                assert_eq!(args.uname, "umo");
                assert_eq!(args.vname, "vmo");
                assert!(!args.no_wrap_x);
                assert!(args.wrap_y);
                assert!(args.static_file.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn drift_and_variance_arguments() {
        let cli = Cli::parse_from(["m6tools", "ts-drift", "a", "b", "-t", "1", "20"]);

        match cli.command {
            Commands::TsDrift(args) => {
                assert_eq!(args.prefixes.len(), 2);
                assert_eq!(args.time_range(), Some((1.0, 20.0)));
            }
            other => panic!("unexpected command {:?}", other),
        }

        let cli = Cli::parse_from(["m6tools", "monthly-variance", "tos", "daily.nc", "var.nc"]);
        assert!(matches!(cli.command, Commands::MonthlyVariance(args) if args.variable == "tos"));

        assert!(Cli::try_parse_from(["m6tools", "eke", "daily.nc"]).is_err());
    }
}
