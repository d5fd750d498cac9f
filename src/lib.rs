//! Spreadsheet viewer for betting schedules: loads a sheet with its cell
//! fills, filters it per column and exports the filtered view as CSV.

pub mod app;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod state;
pub mod store;
pub mod ui;
