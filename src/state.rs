use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::{DatasetProfile, ViewerConfig};
use crate::data::filter::{available_kinds, filtered_indices, ColumnFilter, FilterKind, FilterState};
use crate::data::{load_dataset, loader, LoadedDataset};
use crate::export;
use crate::store::{Snapshot, SnapshotStore};

// ---------------------------------------------------------------------------
// Notices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// A message for the user about the last thing that happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-dataset session
// ---------------------------------------------------------------------------

/// A loaded dataset together with the user's current filters.
#[derive(Debug, Clone)]
pub struct DatasetSession {
    pub data: LoadedDataset,
    /// Columns that currently show a filter widget, in selection order.
    pub filter_columns: Vec<String>,
    pub filters: FilterState,
    /// Indices of rows passing the current filters (cached).
    pub visible_indices: Vec<usize>,
}

impl DatasetSession {
    fn new(data: LoadedDataset, max_filter_columns: usize) -> Self {
        let filter_columns = data
            .table
            .columns
            .iter()
            .take(max_filter_columns)
            .cloned()
            .collect();
        let visible_indices = (0..data.table.len()).collect();
        Self {
            data,
            filter_columns,
            filters: FilterState::new(),
            visible_indices,
        }
    }

    /// Recompute `visible_indices` after a filter change.
    pub fn refilter(&mut self) {
        self.visible_indices = filtered_indices(&self.data.table, &self.filters);
    }
}

/// A workbook waiting for the user to pick one of its sheets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSheetChoice {
    pub path: PathBuf,
    pub sheets: Vec<String>,
    pub selected: usize,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: ViewerConfig,
    pub store: SnapshotStore,

    /// Index into `config.datasets` of the dataset on screen.
    active: usize,

    /// One slot per dataset profile.
    sessions: Vec<Option<DatasetSession>>,

    /// Whether the saved snapshot of a dataset was already looked for.
    restore_attempted: Vec<bool>,

    pub pending_sheet: Option<PendingSheetChoice>,

    /// Status / error message shown in the UI.
    pub notice: Option<Notice>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ViewerConfig::default())
    }
}

impl AppState {
    pub fn new(config: ViewerConfig) -> Self {
        let n = config.datasets.len();
        let store = SnapshotStore::new(config.snapshot_dir.clone());
        Self {
            config,
            store,
            active: 0,
            sessions: vec![None; n],
            restore_attempted: vec![false; n],
            pending_sheet: None,
            notice: None,
        }
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn profile(&self) -> &DatasetProfile {
        &self.config.datasets[self.active]
    }

    pub fn session(&self) -> Option<&DatasetSession> {
        self.sessions.get(self.active).and_then(Option::as_ref)
    }

    pub fn session_mut(&mut self) -> Option<&mut DatasetSession> {
        self.sessions.get_mut(self.active).and_then(Option::as_mut)
    }

    /// Switch the dataset on screen; restores its snapshot on first visit.
    pub fn select_dataset(&mut self, index: usize) {
        if index >= self.config.datasets.len() || index == self.active {
            return;
        }
        self.active = index;
        self.pending_sheet = None;
        self.notice = None;
        self.ensure_restored();
    }

    /// Load the saved snapshot of the active dataset the first time it is
    /// shown without data.
    pub fn ensure_restored(&mut self) {
        if self.session().is_some() || self.restore_attempted[self.active] {
            return;
        }
        self.restore_attempted[self.active] = true;

        let key = self.profile().key.clone();
        match self.store.load(&key) {
            Some(snapshot) => {
                log::info!(
                    "Restored '{key}' from {} ({} rows, saved {})",
                    snapshot.source_filename,
                    snapshot.table.len(),
                    snapshot.saved_at
                );
                let message =
                    format!("Data restored from saved file ({})", snapshot.source_filename);
                let data = LoadedDataset {
                    table: snapshot.table,
                    color_map: snapshot.color_map,
                    source_filename: snapshot.source_filename,
                };
                let session = DatasetSession::new(data, self.config.max_filter_columns);
                self.sessions[self.active] = Some(session);
                self.notice = Some(Notice::new(NoticeLevel::Info, message));
            }
            None => {
                self.notice = Some(Notice::new(
                    NoticeLevel::Info,
                    "No data loaded. Open a spreadsheet to get started.",
                ));
            }
        }
    }

    /// Start loading a user-picked file. Workbooks with several sheets wait
    /// for a sheet choice unless the dataset names its sheet.
    pub fn open_workbook(&mut self, path: &Path) {
        self.pending_sheet = None;
        if let Some(sheet) = self.profile().sheet.clone() {
            self.load_workbook(path, Some(&sheet));
            return;
        }
        if loader::extension_of(path) == "csv" {
            self.load_workbook(path, None);
            return;
        }
        match loader::sheet_names(path) {
            Ok(sheets) if sheets.len() > 1 => {
                log::debug!("{} has {} sheets, asking", path.display(), sheets.len());
                self.pending_sheet = Some(PendingSheetChoice {
                    path: path.to_path_buf(),
                    sheets,
                    selected: 0,
                });
            }
            Ok(_) => {
                self.load_workbook(path, None);
            }
            Err(e) => {
                let e = anyhow::Error::new(e).context(format!("opening {}", path.display()));
                self.report_load_failure(e);
            }
        }
    }

    /// Load the sheet the user picked for the pending workbook.
    pub fn confirm_sheet_choice(&mut self) {
        if let Some(choice) = self.pending_sheet.take() {
            let sheet = choice.sheets.get(choice.selected).cloned();
            self.load_workbook(&choice.path, sheet.as_deref());
        }
    }

    /// Replace the active dataset with a sheet of `path` and persist it.
    /// On failure the previous data stays on screen.
    pub fn load_workbook(&mut self, path: &Path, sheet: Option<&str>) -> bool {
        let profile = self.profile().clone();
        let (data, report) = match load_dataset(path, sheet, &profile) {
            Ok(loaded) => loaded,
            Err(e) => {
                self.report_load_failure(e);
                return false;
            }
        };

        let snapshot = Snapshot {
            table: data.table.clone(),
            color_map: data.color_map.clone(),
            source_filename: data.source_filename.clone(),
            saved_at: chrono::Utc::now(),
        };
        let saved = self.store.save(&profile.key, &snapshot);

        let rows = data.table.len();
        let session = DatasetSession::new(data, self.config.max_filter_columns);
        self.sessions[self.active] = Some(session);
        self.restore_attempted[self.active] = true;

        self.notice = Some(match (saved, report.skipped.is_empty()) {
            (Err(e), _) => {
                log::warn!("Snapshot not saved: {e}");
                Notice::new(
                    NoticeLevel::Warning,
                    format!("File loaded ({rows} rows) but not saved: {e}"),
                )
            }
            (Ok(()), false) => {
                let names: Vec<&str> =
                    report.skipped.iter().map(|(name, _)| name.as_str()).collect();
                Notice::new(
                    NoticeLevel::Warning,
                    format!("File loaded ({rows} rows); left unformatted: {}", names.join(", ")),
                )
            }
            (Ok(()), true) => Notice::new(
                NoticeLevel::Success,
                format!("File loaded successfully ({rows} rows)"),
            ),
        });
        true
    }

    fn report_load_failure(&mut self, e: anyhow::Error) {
        log::error!("Failed to load file: {e:#}");
        let message = format!("Error while loading the file: {e:#}");
        self.notice = Some(Notice::new(NoticeLevel::Error, message));
    }

    /// Drop the active dataset and its snapshot.
    pub fn forget_dataset(&mut self) -> Result<()> {
        let key = self.profile().key.clone();
        self.store
            .clear(&key)
            .with_context(|| format!("removing snapshot '{key}'"))?;
        self.sessions[self.active] = None;
        self.notice = Some(Notice::new(NoticeLevel::Info, "Saved data removed."));
        Ok(())
    }

    // -- Filters --

    /// Choose which columns get filter widgets (at most the configured
    /// maximum). Filters on deselected columns are dropped.
    pub fn set_filter_columns(&mut self, columns: Vec<String>) {
        let max = self.config.max_filter_columns;
        let Some(session) = self.session_mut() else {
            return;
        };
        let mut chosen: Vec<String> = Vec::new();
        for column in columns {
            if chosen.len() == max {
                break;
            }
            if session.data.table.column_index(&column).is_some() && !chosen.contains(&column) {
                chosen.push(column);
            }
        }
        session.filters.retain(|name, _| chosen.contains(name));
        session.filter_columns = chosen;
        session.refilter();
    }

    /// Add or remove a column from the filter selection.
    pub fn toggle_filter_column(&mut self, column: &str) {
        let Some(session) = self.session() else {
            return;
        };
        let mut columns = session.filter_columns.clone();
        if let Some(pos) = columns.iter().position(|c| c == column) {
            columns.remove(pos);
        } else {
            columns.push(column.to_string());
        }
        self.set_filter_columns(columns);
    }

    /// Filter kinds the column offers, preferred first.
    pub fn filter_kinds(&self, column: &str) -> Vec<FilterKind> {
        let Some(session) = self.session() else {
            return Vec::new();
        };
        let table = &session.data.table;
        match table.column_index(column) {
            Some(col) => {
                available_kinds(table, col, self.profile(), self.config.categorical_threshold)
            }
            None => Vec::new(),
        }
    }

    /// Set a column's filter and recompute the visible rows.
    pub fn set_filter(&mut self, column: &str, filter: ColumnFilter) {
        if let Some(session) = self.session_mut() {
            if session.filter_columns.iter().any(|c| c == column) {
                session.filters.insert(column.to_string(), filter);
                session.refilter();
            }
        }
    }

    /// Switch a column to another kind of filter, starting unconstrained.
    pub fn set_filter_kind(&mut self, column: &str, kind: FilterKind) {
        let filter = match self.session() {
            Some(session) => match session.data.table.column_index(column) {
                Some(col) => ColumnFilter::unconstrained(kind, &session.data.table, col),
                None => return,
            },
            None => return,
        };
        self.set_filter(column, filter);
    }

    pub fn clear_filter(&mut self, column: &str) {
        if let Some(session) = self.session_mut() {
            session.filters.remove(column);
            session.refilter();
        }
    }

    /// Drop every filter; the column selection stays.
    pub fn reset_filters(&mut self) {
        if let Some(session) = self.session_mut() {
            session.filters.clear();
            session.refilter();
        }
    }

    /// (visible rows, total rows) of the active dataset.
    pub fn row_counts(&self) -> Option<(usize, usize)> {
        self.session()
            .map(|s| (s.visible_indices.len(), s.data.table.len()))
    }

    // -- Export --

    /// The filtered view as CSV text.
    pub fn filtered_csv(&self) -> Result<String> {
        let session = self.session().context("no dataset loaded")?;
        Ok(export::to_csv(&session.data.table, &session.visible_indices)?)
    }

    /// Write the filtered view to `path`.
    pub fn export_csv(&mut self, path: &Path) -> Result<()> {
        let session = self.session().context("no dataset loaded")?;
        export::write_csv(path, &session.data.table, &session.visible_indices)
            .with_context(|| format!("exporting to {}", path.display()))?;
        let rows = session.visible_indices.len();
        log::info!("Exported {rows} rows to {}", path.display());
        self.notice = Some(Notice::new(
            NoticeLevel::Success,
            format!("Exported {rows} rows to {}", path.display()),
        ));
        Ok(())
    }

    /// HTML link carrying the filtered view as a base64 `data:` URI.
    pub fn download_link(&self) -> Result<String> {
        let csv = self.filtered_csv()?;
        Ok(export::download_link(
            &csv,
            &self.profile().export_filename,
            "Download the filtered data as CSV",
        ))
    }
}
