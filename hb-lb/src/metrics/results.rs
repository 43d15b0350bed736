//! Flat race result table
//!
//! One row per pilot per valid race, laid out as the spreadsheet export
//! expects: 12 summary columns followed by lap slots 0 through 30.

use super::lap_stats::{LapStats, UNSET_LAP_TIME, UNSET_RACE_TIME};
use crate::normalize::Lap;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use tracing::warn;

/// Lap slots 0..=30
pub const LAP_SLOTS: usize = 31;

const SUMMARY_COLUMNS: [&str; 12] = [
    "Event",
    "Race",
    "Date",
    "Time",
    "Pilot",
    "Position",
    "Laps",
    "Total Time",
    "Race Time",
    "Best Lap",
    "Best 2 Laps",
    "Best 3 Laps",
];

/// Cells per row
pub const ROW_WIDTH: usize = SUMMARY_COLUMNS.len() + LAP_SLOTS;

/// Column labels of the result table
pub fn header() -> Vec<String> {
    SUMMARY_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain((0..LAP_SLOTS).map(|slot| format!("Lap {}", slot)))
        .collect()
}

/// One exported cell; blanks serialize as `""`
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Blank,
}

impl Cell {
    fn number(value: Option<f64>) -> Cell {
        value.map(Cell::Number).unwrap_or(Cell::Blank)
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Text(text) => serializer.serialize_str(text),
            Cell::Number(value) => serializer.serialize_f64(*value),
            Cell::Blank => serializer.serialize_str(""),
        }
    }
}

/// Result of one pilot in one race
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub event_name: String,
    pub race_name: String,
    /// Race start as spreadsheet serial days
    pub serial: Option<f64>,
    pub pilot_name: String,
    pub position: Option<i32>,
    pub lap_count: usize,
    pub total_time: Option<f64>,
    pub race_time: f64,
    pub best_lap: f64,
    pub consecutive_2: f64,
    pub consecutive_3: f64,
    /// Lap time by lap number
    pub lap_times: [Option<f64>; LAP_SLOTS],
}

impl ResultRow {
    /// Build a row from a pilot's laps, filling sentinels for unmet formulas
    pub fn from_stats(
        event_name: &str,
        race_name: &str,
        serial: Option<f64>,
        pilot_name: &str,
        position: Option<i32>,
        stats: &LapStats,
        laps: &[Lap],
    ) -> Self {
        let mut lap_times = [None; LAP_SLOTS];
        for lap in laps {
            if let Ok(slot) = usize::try_from(lap.number) {
                if slot < LAP_SLOTS {
                    lap_times[slot] = Some(lap.seconds);
                }
            }
        }

        Self {
            event_name: event_name.to_string(),
            race_name: race_name.to_string(),
            serial,
            pilot_name: pilot_name.to_string(),
            position,
            lap_count: stats.lap_count,
            total_time: stats.total_time,
            race_time: stats.race_time.unwrap_or(UNSET_RACE_TIME),
            best_lap: stats.best_lap.unwrap_or(UNSET_LAP_TIME),
            consecutive_2: stats.consecutive_2.unwrap_or(UNSET_LAP_TIME),
            consecutive_3: stats.consecutive_3.unwrap_or(UNSET_LAP_TIME),
            lap_times,
        }
    }

    pub fn to_cells(&self) -> Vec<Cell> {
        let mut cells = Vec::with_capacity(ROW_WIDTH);
        cells.push(Cell::Text(self.event_name.clone()));
        cells.push(Cell::Text(self.race_name.clone()));
        // Date and time columns share the serial value
        cells.push(Cell::number(self.serial));
        cells.push(Cell::number(self.serial));
        cells.push(Cell::Text(self.pilot_name.clone()));
        cells.push(Cell::number(self.position.map(f64::from)));
        cells.push(Cell::Number(self.lap_count as f64));
        cells.push(Cell::number(self.total_time));
        cells.push(Cell::Number(self.race_time));
        cells.push(Cell::Number(self.best_lap));
        cells.push(Cell::Number(self.consecutive_2));
        cells.push(Cell::Number(self.consecutive_3));
        cells.extend(self.lap_times.iter().map(|t| Cell::number(*t)));
        cells
    }
}

/// Sort rows by race start; rows without a start go last, ties keep order
pub fn sort_rows(rows: &mut [ResultRow]) {
    rows.sort_by(|a, b| match (a.serial, b.serial) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// Sanitized result table ready for export
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl ResultTable {
    pub fn from_rows(rows: &[ResultRow]) -> Self {
        Self {
            header: header(),
            rows: sanitize(rows.iter().map(ResultRow::to_cells).collect()),
        }
    }
}

/// Replace every non-finite number with a blank
///
/// Only the offending cells change; each replacement is logged with its row
/// and column.
pub fn sanitize(rows: Vec<Vec<Cell>>) -> Vec<Vec<Cell>> {
    let labels = header();
    rows.into_iter()
        .enumerate()
        .map(|(row_index, row)| {
            row.into_iter()
                .enumerate()
                .map(|(col_index, cell)| match cell {
                    Cell::Number(value) if !value.is_finite() => {
                        warn!(
                            "Result row {} column {} ({}) holds {}, exporting blank",
                            row_index,
                            col_index,
                            labels.get(col_index).map(String::as_str).unwrap_or("?"),
                            value
                        );
                        Cell::Blank
                    }
                    other => other,
                })
                .collect()
        })
        .collect()
}
