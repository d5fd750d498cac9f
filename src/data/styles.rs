use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use crate::color::{ColorMap, CssColor};
use crate::error::StyleError;

/// The "no explicit fill" value a workbook stores for unfilled cells.
pub const NO_FILL_SENTINEL: &str = "00000000";

/// Upper bound on the buffer reserved up front for a zip part.
const MAX_PRESIZE: u64 = 1 << 20;

/// Legacy 64-entry indexed palette (`<fgColor indexed="N"/>`).
const INDEXED_PALETTE: [u32; 64] = [
    0x000000, 0xFFFFFF, 0xFF0000, 0x00FF00, 0x0000FF, 0xFFFF00, 0xFF00FF, 0x00FFFF, //
    0x000000, 0xFFFFFF, 0xFF0000, 0x00FF00, 0x0000FF, 0xFFFF00, 0xFF00FF, 0x00FFFF, //
    0x800000, 0x008000, 0x000080, 0x808000, 0x800080, 0x008080, 0xC0C0C0, 0x808080, //
    0x9999FF, 0x993366, 0xFFFFCC, 0xCCFFFF, 0x660066, 0xFF8080, 0x0066CC, 0xCCCCFF, //
    0x000080, 0xFF00FF, 0xFFFF00, 0x00FFFF, 0x800080, 0x800000, 0x008080, 0x0000FF, //
    0x00CCFF, 0xCCFFFF, 0xCCFFCC, 0xFFFF99, 0x99CCFF, 0xFF99CC, 0xCC99FF, 0xFFCC99, //
    0x3366FF, 0x33CCCC, 0x99CC00, 0xFFCC00, 0xFF9900, 0xFF6600, 0x666699, 0x969696, //
    0x003366, 0x339966, 0x003300, 0x333300, 0x993300, 0x993366, 0x333399, 0x333333, //
];

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Read the background fills of one worksheet of an `.xlsx` / `.xlsm` file.
///
/// Every cell whose style resolves to a colored pattern fill gets an entry
/// keyed by its 1-based (row, column); unfilled cells are left out.
pub fn extract_fill_colors(path: &Path, sheet: &str) -> Result<ColorMap, StyleError> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;

    let sheet_part = sheet_part_path(&mut archive, sheet)?;
    let xf_fills = match read_part(&mut archive, "xl/styles.xml") {
        Ok(xml) => parse_styles(&xml)?,
        // A workbook without a stylesheet has no fills.
        Err(StyleError::MissingPart(_)) => return Ok(ColorMap::new()),
        Err(e) => return Err(e),
    };

    let part = archive
        .by_name(&sheet_part)
        .map_err(|_| StyleError::MissingPart(sheet_part.clone()))?;
    let map = collect_cell_fills(BufReader::new(part), &xf_fills)
        .map_err(|source| StyleError::Xml { part: sheet_part.clone(), source })?;

    log::debug!("Sheet '{sheet}' ({sheet_part}): {} filled cells", map.len());
    Ok(map)
}

/// Normalize a stored ARGB hex string to a CSS color.
///
/// The all-zero sentinel means "no fill" and yields `None`. A leading
/// opaque `FF` alpha byte is dropped from 8-digit values; anything else is
/// passed through as-is behind a `#`.
pub fn normalize_argb(raw: &str) -> Option<CssColor> {
    let raw = raw.trim();
    if raw == NO_FILL_SENTINEL {
        return None;
    }
    let rgb = match raw.get(..2) {
        Some(alpha) if raw.len() == 8 && alpha.eq_ignore_ascii_case("FF") => &raw[2..],
        _ => raw,
    };
    Some(CssColor::new(format!("#{rgb}")))
}

/// CSS color for a legacy palette index. System colors (64, 65) have none.
pub fn indexed_color(index: u32) -> Option<CssColor> {
    INDEXED_PALETTE
        .get(index as usize)
        .map(|rgb| CssColor::new(format!("#{rgb:06X}")))
}

// ---------------------------------------------------------------------------
// Container helpers
// ---------------------------------------------------------------------------

fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Vec<u8>, StyleError> {
    let mut part = archive
        .by_name(name)
        .map_err(|_| StyleError::MissingPart(name.to_string()))?;
    let mut buf = Vec::with_capacity(part.size().min(MAX_PRESIZE) as usize);
    part.read_to_end(&mut buf)?;
    Ok(buf)
}

fn xml_err(part: &str) -> impl FnOnce(quick_xml::Error) -> StyleError + '_ {
    move |source| StyleError::Xml { part: part.to_string(), source }
}

/// Get a string attribute value from an XML element, matched on its local name.
fn attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(Cow::into_owned))
}

/// Locate the worksheet part for a sheet name via the workbook relationships.
fn sheet_part_path<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    sheet: &str,
) -> Result<String, StyleError> {
    let workbook = read_part(archive, "xl/workbook.xml")?;
    let rel_id = find_sheet_rel_id(&workbook, sheet)
        .map_err(xml_err("xl/workbook.xml"))?
        .ok_or_else(|| StyleError::MissingPart(format!("sheet '{sheet}' in xl/workbook.xml")))?;

    let rels = read_part(archive, "xl/_rels/workbook.xml.rels")?;
    let target = find_rel_target(&rels, &rel_id)
        .map_err(xml_err("xl/_rels/workbook.xml.rels"))?
        .ok_or_else(|| StyleError::MissingPart(format!("relationship {rel_id}")))?;

    Ok(resolve_target(&target))
}

fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target.trim_start_matches("./")),
    }
}

fn find_sheet_rel_id(xml: &[u8], sheet: &str) -> Result<Option<String>, quick_xml::Error> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                if attr(&e, b"name").as_deref() == Some(sheet) {
                    return Ok(attr(&e, b"id"));
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
        buf.clear();
    }
}

fn find_rel_target(xml: &[u8], rel_id: &str) -> Result<Option<String>, quick_xml::Error> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if attr(&e, b"Id").as_deref() == Some(rel_id) {
                    return Ok(attr(&e, b"Target"));
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
        buf.clear();
    }
}

// ---------------------------------------------------------------------------
// Stylesheet: fills and cell formats
// ---------------------------------------------------------------------------

/// A `<fill>` as far as background color is concerned.
#[derive(Debug, Default, Clone)]
struct PatternFill {
    pattern: Option<String>,
    fg_color: Option<CssColor>,
}

impl PatternFill {
    fn color(&self) -> Option<CssColor> {
        match self.pattern.as_deref() {
            Some("none") => None,
            _ => self.fg_color.clone(),
        }
    }
}

fn fg_color_of(e: &BytesStart) -> Option<CssColor> {
    if let Some(rgb) = attr(e, b"rgb") {
        return normalize_argb(&rgb);
    }
    if let Some(index) = attr(e, b"indexed") {
        return index.parse().ok().and_then(indexed_color);
    }
    // Theme and automatic colors need the theme part; treated as unfilled.
    None
}

/// Parse `xl/styles.xml` into the resolved fill color of every cell format
/// (`cellXfs` index → color).
fn parse_styles(xml: &[u8]) -> Result<Vec<Option<CssColor>>, StyleError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut fills: Vec<PatternFill> = Vec::new();
    let mut xf_fill_ids: Vec<usize> = Vec::new();
    let mut in_fills = false;
    let mut in_cell_xfs = false;
    let mut current: Option<PatternFill> = None;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(xml_err("xl/styles.xml"))?;
        let is_empty_tag = matches!(event, Event::Empty(_));
        match event {
            Event::Start(e) | Event::Empty(e) => {
                match e.local_name().as_ref() {
                    b"fills" => in_fills = !is_empty_tag,
                    b"cellXfs" => in_cell_xfs = !is_empty_tag,
                    b"fill" if in_fills => {
                        if is_empty_tag {
                            fills.push(PatternFill::default());
                        } else {
                            current = Some(PatternFill::default());
                        }
                    }
                    b"patternFill" => {
                        if let Some(fill) = current.as_mut() {
                            fill.pattern = attr(&e, b"patternType");
                        }
                    }
                    b"fgColor" => {
                        if let Some(fill) = current.as_mut() {
                            fill.fg_color = fg_color_of(&e);
                        }
                    }
                    b"xf" if in_cell_xfs => {
                        let fill_id = attr(&e, b"fillId")
                            .and_then(|v| v.parse().ok())
                            .unwrap_or(0);
                        xf_fill_ids.push(fill_id);
                    }
                    _ => {}
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"fills" => in_fills = false,
                b"cellXfs" => in_cell_xfs = false,
                b"fill" => {
                    if let Some(fill) = current.take() {
                        fills.push(fill);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(xf_fill_ids
        .into_iter()
        .map(|id| fills.get(id).and_then(PatternFill::color))
        .collect())
}

// ---------------------------------------------------------------------------
// Worksheet: per-cell style references
// ---------------------------------------------------------------------------

/// Split an A1 reference into 1-based (row, column).
pub fn parse_cell_ref(reference: &str) -> Option<(u32, u32)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() {
        return None;
    }
    let mut col: u32 = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let value = (ch.to_ascii_uppercase() as u8 - b'A' + 1) as u32;
        col = col.checked_mul(26)?.checked_add(value)?;
    }
    let row: u32 = digits.parse().ok()?;
    (row > 0).then_some((row, col))
}

fn collect_cell_fills<R: BufRead>(
    source: R,
    xf_fills: &[Option<CssColor>],
) -> Result<ColorMap, quick_xml::Error> {
    let mut reader = Reader::from_reader(source);
    let mut buf = Vec::new();
    let mut map = ColorMap::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                let style: usize = attr(&e, b"s").and_then(|s| s.parse().ok()).unwrap_or(0);
                let color = xf_fills.get(style).cloned().flatten();
                let position = attr(&e, b"r").as_deref().and_then(parse_cell_ref);
                if let (Some(color), Some((row, col))) = (color, position) {
                    map.insert(row, col, color);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(map)
}
