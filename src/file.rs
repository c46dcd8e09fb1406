// src/file.rs

use std::{
    fs::{self, File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use serde::Serialize;

use crate::core::{AttributeCombo, RangeDescriptor};
use crate::error::StoreError;

pub fn ensure_directory(dir: &Path) -> Result<(), StoreError> {
    if dir.exists() && !dir.is_dir() {
        return Err(StoreError::io(
            dir,
            std::io::Error::other("path exists but is not a directory"),
        ));
    }
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
    }
    Ok(())
}

/// Keep ASCII alphanumerics, `-` and `_`; whitespace runs become one `_`.
pub fn sanitize_segment(name: &str, fallback: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_us = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() { out.push(ch); last_us = false; }
        else if ch.is_whitespace() { if !last_us { out.push('_'); last_us = true; } }
        else if ch == '-' || ch == '_' { if !(last_us && ch == '_') { out.push(ch); } last_us = ch == '_'; }
    }
    let out = out.trim_matches('_').to_string();
    if out.is_empty() { s!(fallback) } else { out }
}

pub fn range_dir_name(range: RangeDescriptor) -> String {
    join!("range_", &range.slug())
}

/// Directory for one combo's pages, e.g. `combo_Meal~20prep+Errands__-`.
///
/// Injective: values keep ASCII alphanumerics and escape every other byte as
/// `~XX`, so `+` (value separator), `__` (dimension separator) and `-` (empty
/// subset) never occur inside a value. The all-empty combo is `unfiltered`.
pub fn combo_dir_name(combo: &AttributeCombo) -> String {
    if combo.is_empty() {
        return s!("unfiltered");
    }
    let dims: Vec<String> = combo.subsets().iter()
        .map(|subset| {
            if subset.is_empty() {
                return s!("-");
            }
            subset.iter()
                .map(|v| escape_value(v))
                .collect::<Vec<_>>()
                .join("+")
        })
        .collect();
    join!("combo_", &dims.join("__"))
}

fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for b in value.bytes() {
        if b.is_ascii_alphanumeric() {
            out.push(b as char);
        } else {
            out.push_str(&format!("~{b:02X}"));
        }
    }
    out
}

pub fn page_file_name(page_index: u32) -> String {
    format!("page_{page_index:04}.json")
}

/// Run directory name when none is configured.
pub fn default_run_name() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("run_{secs}")
}

/// Create/truncate `path` and write `value` as pretty JSON.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_directory(parent)?;
        }
    }
    let file = File::create(path).map_err(|e| StoreError::io(path, e))?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, value)?;
    out.write_all(b"\n").map_err(|e| StoreError::io(path, e))?;
    out.flush().map_err(|e| StoreError::io(path, e))?;
    Ok(())
}

/// Append `value` as one compact JSON line.
pub fn append_json_line<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let mut line = serde_json::to_vec(value)?;
    line.push(b'\n');
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| StoreError::io(path, e))?;
    file.write_all(&line).map_err(|e| StoreError::io(path, e))
}

pub fn run_dir(root: &Path, run_name: &str) -> PathBuf {
    root.join(sanitize_segment(run_name, "run"))
}
