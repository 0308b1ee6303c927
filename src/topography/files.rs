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

//! Sub-module with reading and writing of topography edits.

use super::edits::{Edit, Edits};
use super::{Topography, View};
use crate::errors::{EditError, InputError};
use crate::io::{self, write};
use crate::Float;
use log::{debug, info, warn};
use ndarray::{s, Array2};
use netcdf::{File, FileMut};
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

const EDITS_DIM: &str = "nEdits";
const ORIGINAL_VALUE: &str = "Original value of edited data";
const NEW_VALUE: &str = "New value of data";

/// Edits as recorded in the file: new or original values
/// depending on the kind of file.
#[derive(Clone, Debug, Default)]
struct Recorded {
    list: Vec<Edit>,
    units: Option<String>,
}

fn has_recorded_edits(file: &File) -> bool {
    ["iEdit", "jEdit", "zEdit"]
        .iter()
        .all(|name| file.variable(name).is_some())
}

fn read_indices(file: &File, name: &str) -> Result<Vec<usize>, InputError> {
    let values: Vec<i32> = io::variable(file, name)?.get_values(..)?;

    values
        .into_iter()
        .map(|v| {
            usize::try_from(v)
                .map_err(|_| InputError::Mismatch(format!("negative index {} in {}", v, name)))
        })
        .collect()
}

fn read_recorded(file: &File) -> Result<Option<Recorded>, InputError> {
    if !has_recorded_edits(file) {
        return Ok(None);
    }

    let i_edit = read_indices(file, "iEdit")?;
    let j_edit = read_indices(file, "jEdit")?;
    let z_var = io::variable(file, "zEdit")?;
    let z_edit: Vec<Float> = z_var.get_values(..)?;

    if i_edit.len() != j_edit.len() || i_edit.len() != z_edit.len() {
        return Err(InputError::Mismatch(
            "iEdit, jEdit and zEdit have different lengths".to_string(),
        ));
    }

    let list = i_edit
        .into_iter()
        .zip(j_edit)
        .zip(z_edit)
        .map(|((i, j), value)| Edit { i, j, value })
        .collect();

    Ok(Some(Recorded {
        list,
        units: io::string_attribute(&z_var, "units"),
    }))
}

fn read_scalar(file: &File, name: &str) -> Result<usize, InputError> {
    let values: Vec<i32> = io::variable(file, name)?.get_values(..)?;

    values
        .first()
        .and_then(|v| usize::try_from(*v).ok())
        .ok_or_else(|| InputError::Mismatch(format!("{} is not a valid size", name)))
}

/// Writes the edit record along the unlimited `nEdits` dimension,
/// creating the dimension and variables when needed.
fn put_recorded(
    file: &mut FileMut,
    list: &[Edit],
    z_long_name: &str,
    units: Option<&str>,
) -> Result<(), EditError> {
    if file.dimension(EDITS_DIM).is_none() {
        file.add_unlimited_dimension(EDITS_DIM)?;
    }

    for (name, long_name) in [
        ("iEdit", "i-index of edited data"),
        ("jEdit", "j-index of edited data"),
    ] {
        if file.variable(name).is_none() {
            let mut var = file.add_variable::<i32>(name, &[EDITS_DIM])?;
            var.put_attribute("long_name", long_name)?;
        }
    }

    if file.variable("zEdit").is_none() {
        let mut var = file.add_variable::<f32>("zEdit", &[EDITS_DIM])?;
        var.put_attribute("long_name", z_long_name)?;
        if let Some(units) = units {
            var.put_attribute("units", units)?;
        }
    }

    for (l, edit) in list.iter().enumerate() {
        write::variable_mut(file, "iEdit")?.put_value(edit.i as i32, [l])?;
        write::variable_mut(file, "jEdit")?.put_value(edit.j as i32, [l])?;
        write::variable_mut(file, "zEdit")?.put_value(edit.value as f32, [l])?;
    }

    Ok(())
}

/// Reads list of edits to apply. Files with `.nc` extension are read
/// as NetCDF with `iEdit`, `jEdit` and the edited variable holding
/// new values. Any other file is read as text with a header line
/// followed by `i j old new` rows.
pub fn read_edits(path: &Path, var_name: &str) -> Result<Vec<Edit>, EditError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("nc") => read_edits_netcdf(path, var_name),
        _ => read_edits_text(path),
    }
}

fn read_edits_netcdf(path: &Path, var_name: &str) -> Result<Vec<Edit>, EditError> {
    let file = io::open(path)?;

    if file.variable("iEdit").is_none() || file.variable("jEdit").is_none() {
        warn!("{} does not have any recorded edits", path.display());
        return Ok(vec![]);
    }

    let i_edit = read_indices(&file, "iEdit")?;
    let j_edit = read_indices(&file, "jEdit")?;
    let new_values = io::read_2d(&file, var_name)?;
    let (nj, ni) = new_values.dim();

    i_edit
        .into_iter()
        .zip(j_edit)
        .map(|(i, j)| {
            if i >= ni || j >= nj {
                return Err(EditError::OutOfDomain(i, j));
            }
            Ok(Edit {
                i,
                j,
                value: new_values[[j, i]],
            })
        })
        .collect()
}

fn read_edits_text(path: &Path) -> Result<Vec<Edit>, EditError> {
    let reader = BufReader::new(fs::File::open(path)?);
    let mut list = vec![];

    // first line is a header
    for (n, line) in reader.lines().enumerate().skip(1) {
        let line = line?;
        let line_no = n + 1;

        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();

        if fields.len() != 4 {
            return Err(EditError::Parse(
                line_no,
                format!("expected 4 columns but found {}", fields.len()),
            ));
        }

        let parse_err = |e: &dyn std::fmt::Display| EditError::Parse(line_no, e.to_string());

        list.push(Edit {
            i: fields[0].parse::<usize>().map_err(|e| parse_err(&e))?,
            j: fields[1].parse::<usize>().map_err(|e| parse_err(&e))?,
            value: fields[3].parse::<Float>().map_err(|e| parse_err(&e))?,
        });
    }

    Ok(list)
}

/// Writes tab-separated `i j old new` log of edits.
pub fn write_edits_log(
    path: &Path,
    edits: &Edits,
    original: &Array2<Float>,
) -> Result<(), EditError> {
    let mut out_file = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)?;

    out_file.write_record(&["i", "j", "old", "new"])?;

    for edit in edits.iter() {
        out_file.write_record(&[
            edit.i.to_string(),
            edit.j.to_string(),
            original[[edit.j, edit.i]].to_string(),
            edit.value.to_string(),
        ])?;
    }

    out_file.flush()?;

    Ok(())
}

fn check_domain(list: &[Edit], (nj, ni): (usize, usize)) -> Result<(), EditError> {
    match list.iter().find(|e| e.i >= ni || e.j >= nj) {
        Some(e) => Err(EditError::OutOfDomain(e.i, e.j)),
        None => Ok(()),
    }
}

fn read_reference(
    path: &Path,
    var_name: &str,
    dim: (usize, usize),
) -> Result<Array2<Float>, EditError> {
    let reference = io::read_2d(&io::open(path)?, var_name)?;

    if reference.dim() != dim {
        return Err(InputError::Mismatch(format!(
            "reference of shape {:?} does not match topography of shape {:?}",
            reference.dim(),
            dim
        ))
        .into());
    }

    Ok(reference)
}

/// Cell corners from the supergrid or cell indices if no supergrid is given.
fn corners(
    supergrid: Option<&Path>,
    (nj, ni): (usize, usize),
) -> Result<(Array2<Float>, Array2<Float>), EditError> {
    let path = match supergrid {
        Some(path) => path,
        None => {
            debug!("No supergrid given, using cell indices as coordinates");
            let lon = Array2::from_shape_fn((nj + 1, ni + 1), |(_, i)| i as Float);
            let lat = Array2::from_shape_fn((nj + 1, ni + 1), |(j, _)| j as Float);
            return Ok((lon, lat));
        }
    };

    let file = io::open(path)?;
    let x = io::read_2d(&file, "x")?;
    let y = io::read_2d(&file, "y")?;

    let (sj, si) = x.dim();
    if sj < 2 * nj + 1 || si < 2 * ni + 1 || y.dim() != x.dim() {
        return Err(InputError::Mismatch(format!(
            "supergrid of shape {:?} is too small for topography of shape {:?}",
            x.dim(),
            (nj, ni)
        ))
        .into());
    }

    let lon = x.slice(s![..=2 * nj;2, ..=2 * ni;2]).to_owned();
    let lat = y.slice(s![..=2 * nj;2, ..=2 * ni;2]).to_owned();

    Ok((lon, lat))
}

/// Default output of [`edit_topography`]: `edit_` prefixed input name.
pub fn default_output(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    input.with_file_name(format!("edit_{}", name))
}

/// Applies edits to topography variable without user interaction.
///
/// Edits already recorded in the input are restored first and stay on
/// the edit list, so the output records all edits made to the original
/// data. New edits from `apply` replace recorded edits of the same cells.
/// The edit log is written next to the output with `.txt` extension.
pub fn edit_topography(
    input: &Path,
    var_name: &str,
    output: Option<&Path>,
    reference: Option<&Path>,
    apply: Option<&Path>,
    supergrid: Option<&Path>,
) -> Result<PathBuf, EditError> {
    let file = io::open(input)?;
    let height = io::read_2d(&file, var_name)?;
    let units = io::string_attribute(&io::variable(&file, var_name)?, "units");

    let reference = match reference {
        Some(path) => Some(read_reference(path, var_name, height.dim())?),
        None => None,
    };

    let (lon, lat) = corners(supergrid, height.dim())?;
    let mut full = Topography::new(lon, lat, height, reference);

    let (lo, hi) = full.height_range();
    info!("Range of input depths: min={} max={}", lo, hi);

    let mut edits = Edits::new();

    if let Some(recorded) = read_recorded(&file)? {
        check_domain(&recorded.list, full.dim())?;
        debug!("Restoring {} recorded edits", recorded.list.len());

        for edit in recorded.list {
            edits.set_val(full.height[[edit.j, edit.i]]);
            full.height[[edit.j, edit.i]] = edit.value;
            edits.add(edit.i, edit.j, None);
        }
    }

    drop(file);

    if let Some(path) = apply {
        let new_edits = read_edits(path, var_name)?;
        check_domain(&new_edits, full.dim())?;
        info!("Applying {} edits from {}", new_edits.len(), path.display());

        for edit in new_edits {
            edits.add(edit.i, edit.j, Some(edit.value));
        }
    }

    let (nj, ni) = full.dim();
    let view = View::new(ni, nj);
    let mut window = view.window(&full);
    let applied = window.apply_edits(&full, &edits);
    let (lo, hi) = window.height_range();
    info!(
        "Edited window i={:?} j={:?}: {} edits, depths min={} max={}",
        view.i_range(),
        view.j_range(),
        applied,
        lo,
        hi
    );

    if window.has_reference {
        let (lo, hi) = window.diff_range();
        info!("Difference from reference: min={} max={}", lo, hi);
    }

    let output = output.map(Path::to_path_buf).unwrap_or_else(|| default_output(input));

    if !edits.is_empty() {
        let log_path = output.with_extension("txt");
        info!("Creating new file {}", log_path.display());
        write_edits_log(&log_path, &edits, &full.height)?;
    }

    info!("Creating new file {}", output.display());

    if output != input {
        fs::copy(input, &output)?;
    }

    let mut file = netcdf::append(&output)?;

    let record: Vec<Edit> = edits
        .iter()
        .map(|e| Edit {
            value: full.height[[e.j, e.i]],
            ..*e
        })
        .collect();

    for edit in edits.iter() {
        full.height[[edit.j, edit.i]] = edit.value;
    }

    write::variable_mut(&mut file, var_name)?.put_values(&io::flat(&full.height), ..)?;

    if !edits.is_empty() {
        put_recorded(&mut file, &record, ORIGINAL_VALUE, units.as_deref())?;

        let changes: Vec<String> = record
            .iter()
            .zip(edits.iter())
            .map(|(old, new)| format!("({}, {}, {:?}, {:?})", old.i, old.j, old.value, new.value))
            .collect();

        let message = format!(
            "made {} changes (i, j, old, new): {}",
            edits.len(),
            changes.join(", ")
        );

        info!("Made {} changes (i, j, old, new):", edits.len());
        for change in &changes {
            info!("{}", change);
        }

        let entry = write::history_entry(&message);
        let history = match io::global_string_attribute(&file, "history") {
            Some(history) => format!("{} | {}", history, entry),
            None => entry,
        };
        file.add_attribute("history", history)?;
    }

    Ok(output)
}

/// Applies edits recorded in `edits_path` (new values in `zEdit`)
/// to the topography file in place.
///
/// Edits already recorded in the topography are undone first.
/// Negative values (land) are set to zero and the original
/// values of edited cells are recorded in `zEdit`.
pub fn apply_edits_file(
    edits_path: &Path,
    topo_path: &Path,
    var_name: &str,
) -> Result<(), EditError> {
    let (new_edits, eni, enj) = {
        let file = io::open(edits_path)?;

        let recorded = match read_recorded(&file)? {
            Some(recorded) => recorded,
            None => {
                warn!("{} does not have any recorded edits", edits_path.display());
                return Ok(());
            }
        };

        (recorded, read_scalar(&file, "ni")?, read_scalar(&file, "nj")?)
    };

    if !topo_path.is_file() {
        return Err(InputError::BadPath(topo_path.display().to_string()).into());
    }

    let mut file = netcdf::append(topo_path)?;

    let topo_units = io::string_attribute(&io::variable(&file, var_name)?, "units");
    if topo_units != new_edits.units {
        return Err(EditError::UnitsMismatch(
            new_edits.units.unwrap_or_default(),
            topo_units.unwrap_or_default(),
        ));
    }

    let mut depth = io::read_2d(&file, var_name)?;
    let (nj, ni) = depth.dim();

    if nj != enj {
        return Err(EditError::DimensionMismatch('j'));
    }
    if ni != eni {
        return Err(EditError::DimensionMismatch('i'));
    }

    check_domain(&new_edits.list, (nj, ni))?;

    let n_existing = match read_recorded(&file)? {
        Some(existing) => {
            check_domain(&existing.list, (nj, ni))?;
            debug!("Undoing {} existing edits", existing.list.len());

            for edit in &existing.list {
                depth[[edit.j, edit.i]] = edit.value;
            }
            existing.list.len()
        }
        None => 0,
    };

    if n_existing > new_edits.list.len() {
        return Err(EditError::TooManyExisting(n_existing, new_edits.list.len()));
    }

    let mut old_depths = Vec::with_capacity(new_edits.list.len());

    for edit in &new_edits.list {
        old_depths.push(Edit {
            value: depth[[edit.j, edit.i]],
            ..*edit
        });
        depth[[edit.j, edit.i]] = edit.value;
    }

    depth.mapv_inplace(|d| if d < 0.0 { 0.0 } else { d });

    info!(
        "Applying {} edits from {} to {}",
        new_edits.list.len(),
        edits_path.display(),
        topo_path.display()
    );

    write::variable_mut(&mut file, var_name)?.put_values(&io::flat(&depth), ..)?;
    put_recorded(&mut file, &old_depths, ORIGINAL_VALUE, new_edits.units.as_deref())?;

    Ok(())
}

/// Extracts edits recorded in the topography file together with
/// current (new) values.
///
/// Without output the list is printed, otherwise it is written
/// to a NetCDF file that can be used with [`apply_edits_file`].
pub fn extract_edits(
    topo_path: &Path,
    var_name: &str,
    output: Option<&Path>,
) -> Result<(), EditError> {
    let file = io::open(topo_path)?;

    let recorded = match read_recorded(&file)? {
        Some(recorded) => recorded,
        None => {
            warn!("{} does not have any recorded edits", topo_path.display());
            return Ok(());
        }
    };

    let depth = io::read_2d(&file, var_name)?;
    let (nj, ni) = depth.dim();

    check_domain(&recorded.list, (nj, ni))?;

    let new_values: Vec<Edit> = recorded
        .list
        .iter()
        .map(|e| Edit {
            value: depth[[e.j, e.i]],
            ..*e
        })
        .collect();

    let output = match output {
        Some(output) => output,
        None => {
            println!("Edits apply to a dataset of dimensions {} x {}", ni, nj);
            for (n, (old, new)) in recorded.list.iter().zip(&new_values).enumerate() {
                println!(
                    "{:5}: i={:4}, j={:4}, old depth={:8.2}, new depth={:8.2}",
                    n, old.i, old.j, old.value, new.value
                );
            }
            return Ok(());
        }
    };

    info!("Writing {} edits to {}", new_values.len(), output.display());

    let mut out = write::create(output)?;

    for (name, len, axis) in [("ni", ni, 'i'), ("nj", nj, 'j')] {
        let mut var = out.add_variable::<i32>(name, &[])?;
        var.put_attribute(
            "long_name",
            format!(
                "The size of the {}-dimension of the dataset these edits apply to",
                axis
            ),
        )?;
        var.put_values(&[len as i32], ..)?;
    }

    put_recorded(&mut out, &new_values, NEW_VALUE, recorded.units.as_deref())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{apply_edits_file, default_output, edit_topography, extract_edits, read_edits};
    use crate::errors::EditError;
    use crate::io::{self, write};
    use ndarray::{array, Array2};
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn write_topography(path: &Path, depth: &Array2<f64>, units: &str) {
        let (nj, ni) = depth.dim();
        let mut file = write::create(path).unwrap();
        file.add_dimension("ny", nj).unwrap();
        file.add_dimension("nx", ni).unwrap();
        write::put_float(&mut file, "depth", &["ny", "nx"], depth.view(), &[("units", units)])
            .unwrap();
    }

    fn original_depth() -> Array2<f64> {
        array![
            [100.0, 200.0, 300.0, 400.0],
            [-5.0, 500.0, 600.0, 700.0],
            [0.0, 0.0, 800.0, 900.0]
        ]
    }

    fn read_depth(path: &Path) -> Array2<f64> {
        io::read_2d(&io::open(path).unwrap(), "depth").unwrap()
    }

    fn read_record(path: &Path, name: &str) -> Vec<f64> {
        io::flat(&io::read_array(&io::open(path).unwrap(), name).unwrap())
    }

    fn write_text_edits(dir: &TempDir, name: &str, rows: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, format!("i\tj\told\tnew\n{}", rows)).unwrap();
        path
    }

    #[test]
    fn text_edits_parsed() {
        let dir = TempDir::new().unwrap();
        let path = write_text_edits(&dir, "edits.txt", "3 1 600.0 0.0\n\n0 2 0 250.5\n");

        let edits = read_edits(&path, "depth").unwrap();

        assert_eq!(edits.len(), 2);
        assert_eq!((edits[0].i, edits[0].j, edits[0].value), (3, 1, 0.0));
        assert_eq!((edits[1].i, edits[1].j, edits[1].value), (0, 2, 250.5));
    }

    #[test]
    fn text_edits_errors_point_to_line() {
        let dir = TempDir::new().unwrap();
        let path = write_text_edits(&dir, "edits.txt", "3 1 600.0 0.0\n3 x 1.0 2.0\n");

        match read_edits(&path, "depth") {
            Err(EditError::Parse(line, _)) => assert_eq!(line, 3),
            other => panic!("unexpected result {:?}", other),
        }

        let path = write_text_edits(&dir, "short.txt", "3 1 600.0\n");
        assert!(matches!(read_edits(&path, "depth"), Err(EditError::Parse(2, _))));
    }

    #[test]
    fn edits_applied_recorded_and_logged() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("topog.nc");
        write_topography(&input, &original_depth(), "m");

        let edits = write_text_edits(&dir, "edits.txt", "1 0 200.0 0.0\n2 2 800.0 50.0\n");

        let output = edit_topography(&input, "depth", None, None, Some(&edits), None).unwrap();
        assert_eq!(output, default_output(&input));
        assert_eq!(output, dir.path().join("edit_topog.nc"));

        let depth = read_depth(&output);
        assert_eq!(depth[[0, 1]], 0.0);
        assert_eq!(depth[[2, 2]], 50.0);
        assert_eq!(depth[[1, 1]], 500.0);

        assert_eq!(read_record(&output, "iEdit"), vec![1.0, 2.0]);
        assert_eq!(read_record(&output, "jEdit"), vec![0.0, 2.0]);
        assert_eq!(read_record(&output, "zEdit"), vec![200.0, 800.0]);

        let file = io::open(&output).unwrap();
        let history = io::global_string_attribute(&file, "history").unwrap();
        assert!(history.contains("made 2 changes (i, j, old, new): (1, 0, 200.0, 0.0), (2, 2, 800.0, 50.0)"));

        let log = fs::read_to_string(dir.path().join("edit_topog.txt")).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines[0], "i\tj\told\tnew");
        assert_eq!(lines[1], "1\t0\t200\t0");
        assert_eq!(lines.len(), 3);

        // input is left untouched
        assert_eq!(read_depth(&input), original_depth());
    }

    #[test]
    fn recorded_edits_restored_before_new_ones() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("topog.nc");
        write_topography(&input, &original_depth(), "m");

        let first = write_text_edits(&dir, "first.txt", "1 0 200.0 0.0\n");
        let edited = edit_topography(&input, "depth", None, None, Some(&first), None).unwrap();

        let second = write_text_edits(&dir, "second.txt", "1 0 0.0 10.0\n3 0 400.0 1.0\n");
        let output = dir.path().join("final.nc");
        edit_topography(&edited, "depth", Some(&output), None, Some(&second), None).unwrap();

        let depth = read_depth(&output);
        assert_eq!(depth[[0, 1]], 10.0);
        assert_eq!(depth[[0, 3]], 1.0);

        // original values survive repeated editing
        assert_eq!(read_record(&output, "zEdit"), vec![200.0, 400.0]);

        let file = io::open(&output).unwrap();
        let history = io::global_string_attribute(&file, "history").unwrap();
        assert!(history.contains(" | "));
    }

    #[test]
    fn edits_outside_domain_rejected() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("topog.nc");
        write_topography(&input, &original_depth(), "m");

        let edits = write_text_edits(&dir, "edits.txt", "4 0 0.0 0.0\n");

        assert!(matches!(
            edit_topography(&input, "depth", None, None, Some(&edits), None),
            Err(EditError::OutOfDomain(4, 0))
        ));
    }

    #[test]
    fn extracted_edits_reapplied_to_original() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("topog.nc");
        write_topography(&input, &original_depth(), "m");

        let edits = write_text_edits(&dir, "edits.txt", "1 0 200.0 0.0\n2 2 800.0 50.0\n");
        let edited = edit_topography(&input, "depth", None, None, Some(&edits), None).unwrap();

        let extracted = dir.path().join("extracted.nc");
        extract_edits(&edited, "depth", Some(&extracted)).unwrap();

        assert_eq!(read_record(&extracted, "zEdit"), vec![0.0, 50.0]);
        assert_eq!(read_record(&extracted, "ni"), vec![4.0]);
        assert_eq!(read_record(&extracted, "nj"), vec![3.0]);

        let target = dir.path().join("target.nc");
        write_topography(&target, &original_depth(), "m");
        apply_edits_file(&extracted, &target, "depth").unwrap();

        let depth = read_depth(&target);
        assert_eq!(depth[[0, 1]], 0.0);
        assert_eq!(depth[[2, 2]], 50.0);
        // land zeroed
        assert_eq!(depth[[1, 0]], 0.0);
        assert_eq!(read_record(&target, "zEdit"), vec![200.0, 800.0]);

        // extracted list applies on top of its own record
        apply_edits_file(&extracted, &target, "depth").unwrap();
        assert_eq!(read_record(&target, "zEdit"), vec![200.0, 800.0]);
    }

    #[test]
    fn apply_checks_units_and_shape() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("topog.nc");
        write_topography(&input, &original_depth(), "m");

        let edits = write_text_edits(&dir, "edits.txt", "1 0 200.0 0.0\n");
        let edited = edit_topography(&input, "depth", None, None, Some(&edits), None).unwrap();
        let extracted = dir.path().join("extracted.nc");
        extract_edits(&edited, "depth", Some(&extracted)).unwrap();

        let feet = dir.path().join("feet.nc");
        write_topography(&feet, &original_depth(), "ft");
        assert!(matches!(
            apply_edits_file(&extracted, &feet, "depth"),
            Err(EditError::UnitsMismatch(_, _))
        ));

        let small = dir.path().join("small.nc");
        write_topography(&small, &Array2::zeros((2, 4)), "m");
        assert!(matches!(
            apply_edits_file(&extracted, &small, "depth"),
            Err(EditError::DimensionMismatch('j'))
        ));
    }

    #[test]
    fn files_without_edits_are_skipped() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("topog.nc");
        write_topography(&input, &original_depth(), "m");

        extract_edits(&input, "depth", None).unwrap();
        apply_edits_file(&input, &input, "depth").unwrap();

        assert_eq!(read_depth(&input), original_depth());
    }
}
