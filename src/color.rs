use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use eframe::egui::Color32;
use palette::color_difference::Wcag21RelativeContrast;
use palette::Srgb;
use serde::{Deserialize, Serialize};

use crate::data::model::Table;

// ---------------------------------------------------------------------------
// CssColor – a background color string as stored in the workbook
// ---------------------------------------------------------------------------

/// A CSS-style color string, normally `#RRGGBB`. Workbooks occasionally
/// carry odd values; those are kept verbatim and simply fail to render.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CssColor(String);

impl CssColor {
    pub fn new(value: impl Into<String>) -> Self {
        CssColor(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The egui color for this string, `None` when it is not valid hex.
    pub fn to_color32(&self) -> Option<Color32> {
        to_color32(&self.0)
    }
}

impl fmt::Display for CssColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Relative luminance at which black and white text contrast equally.
const EQUAL_CONTRAST_LUMINANCE: f32 = 0.179;

/// Parse `#RRGGBB` / `#RGB` into an opaque egui color.
pub fn to_color32(css: &str) -> Option<Color32> {
    let rgb = Srgb::<u8>::from_str(css.trim()).ok()?;
    Some(Color32::from_rgb(rgb.red, rgb.green, rgb.blue))
}

/// Pick a readable text color for a filled cell. Dark text goes on
/// backgrounds whose relative luminance is above the point where black and
/// white text have equal contrast.
pub fn text_color_for(background: Color32) -> Color32 {
    let rgb: Srgb<f32> = Srgb::new(background.r(), background.g(), background.b()).into_format();
    if rgb.relative_luminance().luma > EQUAL_CONTRAST_LUMINANCE {
        Color32::from_gray(20)
    } else {
        Color32::from_gray(235)
    }
}

// ---------------------------------------------------------------------------
// ColorMap: sheet position → background color
// ---------------------------------------------------------------------------

/// One serialized color map entry, 1-based sheet coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillEntry {
    pub row: u32,
    pub col: u32,
    pub color: CssColor,
}

/// Sparse map of cell background colors, keyed by 1-based sheet
/// coordinates. Built once per load and read-only afterwards; a missing
/// entry means the cell has no fill.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<FillEntry>", into = "Vec<FillEntry>")]
pub struct ColorMap {
    mapping: HashMap<(u32, u32), CssColor>,
}

impl ColorMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the fill of a cell. Cells without a fill are never inserted.
    pub fn insert(&mut self, row: u32, col: u32, color: CssColor) {
        self.mapping.insert((row, col), color);
    }

    /// Look up a cell by 1-based sheet coordinates.
    pub fn color_at(&self, row: u32, col: u32) -> Option<&CssColor> {
        self.mapping.get(&(row, col))
    }

    /// Look up the fill of a table cell. Data row `r` sits two rows below
    /// the header origin (1-based rows plus the header itself), column `c`
    /// one column right of it (1-based columns).
    pub fn color_for_cell(&self, table: &Table, row: usize, col: usize) -> Option<&CssColor> {
        let (Ok(r), Ok(c)) = (u32::try_from(row), u32::try_from(col)) else {
            return None;
        };
        let sheet_row = table.origin.row.checked_add(r)?.checked_add(2)?;
        let sheet_col = table.origin.col.checked_add(c)?.checked_add(1)?;
        self.color_at(sheet_row, sheet_col)
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }
}

impl From<Vec<FillEntry>> for ColorMap {
    fn from(entries: Vec<FillEntry>) -> Self {
        ColorMap {
            mapping: entries
                .into_iter()
                .map(|e| ((e.row, e.col), e.color))
                .collect(),
        }
    }
}

impl From<ColorMap> for Vec<FillEntry> {
    fn from(map: ColorMap) -> Self {
        let mut entries: Vec<FillEntry> = map
            .mapping
            .into_iter()
            .map(|((row, col), color)| FillEntry { row, col, color })
            .collect();
        entries.sort_by_key(|e| (e.row, e.col));
        entries
    }
}
