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

//! Transports through straits and passages compared with
//! observed estimates.
//!
//! Each section is read from the time series of post-processed
//! output (`<pp>/<section>/ts/<freq>/<chunk>/*.<var>.nc`), summed
//! over the section and converted to Sverdrups.

use crate::constants::{DAYS_PER_YEAR, KG_S_TO_SV};
use crate::errors::{InputError, ToolError};
use crate::io::Dataset;
use crate::toolbox::bisection::inclusive_window;
use crate::Float;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use ndarray::{Axis, Ix1};
use rayon::ThreadPool;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};

pub const SERIES_FILE: &str = "section_flows.csv";
pub const SUMMARY_FILE: &str = "section_flows_summary.csv";

pub const REFERENCE: &str = "Griffies et al., 2016: OMIP contribution to CMIP6: experimental and diagnostic protocol for the physical component of the Ocean Model Intercomparison Project. Geosci. Model. Dev., 9, 3231-3296. doi:10.5194/gmd-9-3231-2016";

/// Time series directories, in order of preference.
const SERIES_DIRS: [&str; 4] = ["ts/120hr/20yr", "ts/120hr/5yr", "ts/daily/20yr", "ts/daily/5yr"];

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowVariable {
    /// Zonal mass transport, summed along the section rows.
    Umo,
    /// Meridional mass transport, summed along the section columns.
    Vmo,
}

impl FlowVariable {
    pub fn name(self) -> &'static str {
        match self {
            FlowVariable::Umo => "umo",
            FlowVariable::Vmo => "vmo",
        }
    }
}

/// Observed transport \[Sv\], either a range of estimates
/// or a single value given for reference.
#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Observed {
    Range(Float, Float),
    Reference(Float),
}

impl fmt::Display for Observed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observed::Range(a, b) => write!(f, "{} to {}", a.min(*b), a.max(*b)),
            Observed::Reference(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SectionPart {
    pub dir: String,
    pub var: FlowVariable,
}

/// Section definition, as in `sections` list of `config.yaml`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Section {
    pub label: String,

    /// Transports of all parts are added together.
    pub parts: Vec<SectionPart>,

    /// _(Optional)_ Range of transport expected for display.
    #[serde(default)]
    pub ylim: Option<(Float, Float)>,

    /// _(Optional)_ Only layers with centres strictly within
    /// this depth range \[m\] are summed.
    #[serde(default)]
    pub zlim: Option<(Float, Float)>,

    #[serde(default)]
    pub observed: Option<Observed>,
}

impl Section {
    fn single(
        dir: &str,
        var: FlowVariable,
        label: &str,
        ylim: Option<(Float, Float)>,
        observed: Option<Observed>,
    ) -> Self {
        Section {
            label: label.to_string(),
            parts: vec![SectionPart {
                dir: dir.to_string(),
                var,
            }],
            ylim,
            zlim: None,
            observed,
        }
    }
}

/// OMIP sections with observed estimates.
pub fn default_sections() -> Vec<Section> {
    use FlowVariable::{Umo, Vmo};
    use Observed::{Range, Reference};

    let mut iceland_faroe = Section::single(
        "ocean_Iceland_Faroe_U",
        Umo,
        "Iceland-Faroe",
        None,
        Some(Range(4.35, 4.85)),
    );
    iceland_faroe.parts.push(SectionPart {
        dir: "ocean_Iceland_Faroe_V".to_string(),
        var: Vmo,
    });

    let mut undercurrent = Section::single(
        "ocean_Pacific_undercurrent",
        Umo,
        "Pacific Equatorial Undercurrent",
        None,
        Some(Range(24.5, 28.3)),
    );
    undercurrent.zlim = Some((0.0, 350.0));

    vec![
        Section::single("ocean_Agulhas_section", Umo, "Agulhas", Some((100.0, 200.0)), Some(Range(129.8, 143.6))),
        Section::single("ocean_Bering_Strait", Vmo, "Bering Strait", Some((-2.0, 3.0)), Some(Range(0.7, 1.1))),
        Section::single("ocean_Barents_opening", Umo, "Barents Opening", Some((-1.0, 9.0)), Some(Reference(2.0))),
        Section::single("ocean_Davis_Strait", Vmo, "Davis Strait", Some((-5.0, 0.5)), Some(Range(-2.1, -1.1))),
        Section::single("ocean_Denmark_Strait", Vmo, "Denmark Strait", Some((-12.0, 2.0)), Some(Range(-4.8, -2.0))),
        Section::single("ocean_Drake_Passage", Umo, "Drake Passage", Some((100.0, 200.0)), Some(Range(129.8, 143.6))),
        Section::single("ocean_English_Channel", Umo, "English Channel", Some((-0.4, 0.4)), Some(Range(0.01, 0.1))),
        Section::single("ocean_Faroe_Scotland", Umo, "Faroe-Scotland", Some((-5.0, 12.0)), Some(Range(0.8, 1.0))),
        Section::single("ocean_Florida_Bahamas", Vmo, "Florida-Bahamas", Some((15.0, 35.0)), Some(Range(28.9, 34.3))),
        Section::single("ocean_Fram_Strait", Vmo, "Fram Strait", Some((-8.0, 4.0)), Some(Range(-4.7, 0.7))),
        Section::single("ocean_Gibraltar_Strait", Umo, "Gibraltar Strait", Some((-1.0, 1.0)), Some(Reference(0.11))),
        iceland_faroe,
        Section::single("ocean_Iceland_Norway", Vmo, "Iceland-Norway", Some((-5.0, 15.0)), None),
        Section::single("ocean_Indonesian_Throughflow", Vmo, "Indonesian Throughflow", Some((-40.0, 10.0)), Some(Range(-15.0, -13.0))),
        Section::single("ocean_Mozambique_Channel", Vmo, "Mozambique Channel", Some((-50.0, 10.0)), Some(Range(-25.6, -7.8))),
        undercurrent,
        Section::single("ocean_Taiwan_Luzon", Umo, "Taiwan-Luzon Strait", Some((-15.0, 10.0)), Some(Range(-3.0, -1.8))),
        Section::single("ocean_Windward_Passage", Vmo, "Windward Passage", Some((-20.0, 10.0)), Some(Range(-15.0, 5.0))),
    ]
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Agreement {
    Inside,
    Outside,
    ReferenceOnly,
    NoObservation,
}

impl fmt::Display for Agreement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Agreement::Inside => "inside",
            Agreement::Outside => "outside",
            Agreement::ReferenceOnly => "reference",
            Agreement::NoObservation => "none",
        };

        write!(f, "{}", text)
    }
}

/// Transport time series through one section.
#[derive(Clone, Debug)]
pub struct SectionSeries {
    pub label: String,
    /// Time in years.
    pub time: Vec<Float>,
    /// Transport in Sv.
    pub transport: Vec<Float>,
    pub observed: Option<Observed>,
}

impl SectionSeries {
    pub fn mean(&self) -> Float {
        self.transport.iter().sum::<Float>() / self.transport.len() as Float
    }

    /// Whether the mean transport is within the observed range.
    pub fn agreement(&self) -> Agreement {
        match self.observed {
            Some(Observed::Range(a, b)) => {
                let mean = self.mean();
                if a.min(b) <= mean && mean <= a.max(b) {
                    Agreement::Inside
                } else {
                    Agreement::Outside
                }
            }
            Some(Observed::Reference(_)) => Agreement::ReferenceOnly,
            None => Agreement::NoObservation,
        }
    }
}

/// Files with time series of `var` in the first existing
/// time series directory of the section.
fn series_files(section_dir: &Path, var: &str) -> Result<Vec<PathBuf>, InputError> {
    let suffix = format!(".{}.nc", var);

    let series_dir = SERIES_DIRS
        .iter()
        .map(|d| section_dir.join(d))
        .find(|d| d.is_dir())
        .ok_or_else(|| {
            InputError::BadPath(format!(
                "unable to find suitable transport data in ts/120hr or ts/daily of {}",
                section_dir.display()
            ))
        })?;

    debug!("Reading {} from {}", var, series_dir.display());

    let mut files: Vec<PathBuf> = fs::read_dir(&series_dir)
        .map_err(|err| InputError::BadPath(format!("{}: {}", series_dir.display(), err)))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .map_or(false, |n| n.to_string_lossy().ends_with(&suffix))
        })
        .collect();

    if files.is_empty() {
        return Err(InputError::BadPath(format!(
            "no *{} files in {}",
            suffix,
            series_dir.display()
        )));
    }

    files.sort();

    Ok(files)
}

/// Reads and sums the transport through all parts of the section.
pub fn section_series(
    pp_root: &Path,
    section: &Section,
    trange: Option<(Float, Float)>,
) -> Result<SectionSeries, ToolError> {
    let mut total: Option<Vec<Float>> = None;
    let mut time: Vec<Float> = vec![];

    for part in &section.parts {
        let var = part.var.name();
        let source = Dataset::open_all(&series_files(&pp_root.join(&part.dir), var)?)?;

        let mut flow = source.read_filled(var, 0.0)?;

        if flow.ndim() < 2 {
            return Err(InputError::Mismatch(format!("{} has no vertical dimension", var)).into());
        }

        if let Some((top, bottom)) = section.zlim {
            let dims = source.dimension_names(var)?;
            let z_l = source.read(&dims[1])?;
            let levels: Vec<usize> = z_l
                .iter()
                .enumerate()
                .filter(|(_, z)| **z > top && **z < bottom)
                .map(|(k, _)| k)
                .collect();

            debug!("Summing {} levels of {} within {:?} m", levels.len(), var, (top, bottom));
            flow = flow.select(Axis(1), &levels);
        }

        // sum over all dimensions but time
        let part_total: Vec<Float> = flow.outer_iter().map(|record| record.sum()).collect();

        total = match total {
            None => Some(part_total),
            Some(t) if t.len() == part_total.len() => {
                Some(t.iter().zip(&part_total).map(|(a, b)| a + b).collect())
            }
            Some(t) => {
                return Err(InputError::Mismatch(format!(
                    "parts of {} have {} and {} records",
                    section.label,
                    t.len(),
                    part_total.len()
                ))
                .into())
            }
        };

        time = source
            .read("time")?
            .into_dimensionality::<Ix1>()
            .map_err(InputError::from)?
            .iter()
            .map(|t| t / DAYS_PER_YEAR)
            .collect();
    }

    let mut transport: Vec<Float> = total
        .unwrap_or_default()
        .iter()
        .map(|t| t * KG_S_TO_SV)
        .collect();

    if let Some((start, end)) = trange {
        match inclusive_window(&time, start, end)? {
            Some((first, last)) => {
                time = time[first..=last].to_vec();
                transport = transport[first..=last].to_vec();
            }
            None => {
                return Err(InputError::Mismatch(format!(
                    "no records of {} between years {} and {}",
                    section.label, start, end
                ))
                .into())
            }
        }
    }

    if transport.is_empty() || transport.len() != time.len() {
        return Err(InputError::Mismatch(format!(
            "{} has {} transport records and {} times",
            section.label,
            transport.len(),
            time.len()
        ))
        .into());
    }

    Ok(SectionSeries {
        label: section.label.clone(),
        time,
        transport,
        observed: section.observed,
    })
}

/// Processes all sections on the thread pool and writes
/// the series with their summary into `out_dir`.
///
/// Sections that cannot be processed are reported and skipped.
pub fn run_section_transports(
    pp_root: &Path,
    sections: Vec<Section>,
    trange: Option<(Float, Float)>,
    out_dir: &Path,
    pool: &ThreadPool,
) -> Result<Vec<SectionSeries>, ToolError> {
    let sections_count = sections.len();
    let sections = Arc::new(sections);
    let pp_root = Arc::new(pp_root.to_path_buf());

    info!("Computing transports through {} sections", sections_count);

    let sections_bar = ProgressBar::new(sections_count as u64);
    sections_bar.set_style(
        ProgressStyle::default_bar()
            .template("{prefix} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
            .progress_chars("#>-"),
    );
    sections_bar.set_prefix("Processed sections");

    let (tx, rx) = mpsc::channel();

    for index in 0..sections_count {
        let tx = tx.clone();
        let sections = Arc::clone(&sections);
        let pp_root = Arc::clone(&pp_root);

        pool.spawn(move || {
            let result = section_series(&pp_root, &sections[index], trange);

            if tx.send((index, result)).is_err() {
                error!("Result of section {} could not be reported", index);
            }
        });
    }

    drop(tx);

    let mut processed: Vec<(usize, SectionSeries)> = Vec::with_capacity(sections_count);

    for (index, result) in rx.iter() {
        match result {
            Ok(series) => processed.push((index, series)),
            Err(err) => {
                warn!("Unable to process {}: {}", sections[index].label, err);
                println!();
            }
        }
        sections_bar.inc(1);
    }

    sections_bar.finish_with_message("All sections processed");

    processed.sort_by_key(|(index, _)| *index);
    let series: Vec<SectionSeries> = processed.into_iter().map(|(_, s)| s).collect();

    for s in &series {
        match s.observed {
            Some(observed) => info!(
                "{}: mean {:.2} Sv, observed {} ({})",
                s.label,
                s.mean(),
                observed,
                s.agreement()
            ),
            None => info!("{}: mean {:.2} Sv", s.label, s.mean()),
        }
    }

    info!("Observations summarized in {}", REFERENCE);

    write_series(&series, &out_dir.join(SERIES_FILE))?;
    write_summary(&series, &out_dir.join(SUMMARY_FILE))?;

    Ok(series)
}

fn write_series(series: &[SectionSeries], path: &Path) -> Result<(), csv::Error> {
    let mut out_file = csv::Writer::from_path(path)?;

    out_file.write_record(&["section", "year", "transport"])?;

    for s in series {
        for (time, transport) in s.time.iter().zip(&s.transport) {
            out_file.write_record(&[s.label.clone(), time.to_string(), transport.to_string()])?;
        }
    }

    out_file.flush()?;

    Ok(())
}

fn write_summary(series: &[SectionSeries], path: &Path) -> Result<(), csv::Error> {
    let mut out_file = csv::Writer::from_path(path)?;

    out_file.write_record(&["section", "mean", "observed", "agreement"])?;

    for s in series {
        out_file.write_record(&[
            s.label.clone(),
            format!("{:.2}", s.mean()),
            s.observed.map(|o| o.to_string()).unwrap_or_default(),
            s.agreement().to_string(),
        ])?;
    }

    out_file.flush()?;

    Ok(())
}
