/// Data layer: core types, loading, normalization, fills and filtering.
///
/// Architecture:
/// ```text
///  .xlsx / .xls / .csv
///        │
///        ├──────────────────┐
///        ▼                  ▼
///   ┌──────────┐      ┌──────────┐
///   │  loader   │      │  styles   │  cell fills → ColorMap
///   └──────────┘      └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ normalize  │  time column, decimal commas
///   └───────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  per-column predicates → visible row indices
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
pub mod normalize;
pub mod styles;

use std::path::Path;

use anyhow::{Context, Result};

use crate::color::ColorMap;
use crate::config::DatasetProfile;
use model::Table;
use normalize::NormalizeReport;

/// A table ready for display, with its fills and provenance.
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub table: Table,
    pub color_map: ColorMap,
    pub source_filename: String,
}

/// Read a sheet, normalize it for `profile` and collect its cell fills.
///
/// Only reading the values can fail; missing fills just leave the table
/// unstyled.
pub fn load_dataset(
    path: &Path,
    sheet: Option<&str>,
    profile: &DatasetProfile,
) -> Result<(LoadedDataset, NormalizeReport)> {
    let mut table = loader::load_file(path, sheet)
        .with_context(|| format!("loading {}", path.display()))?;
    let report = normalize::normalize(&mut table, profile);
    let color_map = read_fills(path, sheet);

    let source_filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    log::info!(
        "Loaded {} rows x {} columns from {source_filename} ({} filled cells)",
        table.len(),
        table.columns.len(),
        color_map.len()
    );

    Ok((
        LoadedDataset {
            table,
            color_map,
            source_filename,
        },
        report,
    ))
}

fn read_fills(path: &Path, sheet: Option<&str>) -> ColorMap {
    if !loader::is_ooxml(path) {
        return ColorMap::new();
    }
    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => match loader::sheet_names(path)
            .and_then(|names| loader::resolve_sheet_name(&names, None))
        {
            Ok(name) => name,
            Err(e) => {
                log::warn!("No fills read: {e}");
                return ColorMap::new();
            }
        },
    };
    styles::extract_fill_colors(path, &sheet_name).unwrap_or_else(|e| {
        log::warn!("Ignoring cell fills of '{sheet_name}': {e}");
        ColorMap::new()
    })
}
