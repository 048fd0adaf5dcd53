use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::Serialize;
use warden_core::{AppError, AppResult};

use crate::LoginEvent;

/// Longest trailing window accepted for heatmaps and anomaly scans.
pub const MAX_HEATMAP_DAYS: u32 = 365;

/// Cells at or below this count are reported as quiet by default.
pub const DEFAULT_QUIET_THRESHOLD: u32 = 1;

const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Validates a trailing analytics window in days.
pub fn validate_heatmap_days(days: u32) -> AppResult<()> {
    if days == 0 || days > MAX_HEATMAP_DAYS {
        return Err(AppError::Validation(format!(
            "days must be between 1 and {MAX_HEATMAP_DAYS}, got {days}"
        )));
    }

    Ok(())
}

/// Returns the English day name for a `0 = Sunday` index.
#[must_use]
pub fn day_name(day: usize) -> &'static str {
    DAY_NAMES.get(day).copied().unwrap_or("Unknown")
}

/// One day/hour cell of the heatmap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeatmapSlot {
    /// Day of week, `0 = Sunday`.
    pub day: usize,
    /// Day name.
    pub day_name: &'static str,
    /// Hour of day in UTC.
    pub hour: usize,
    /// Logins in the cell.
    pub count: u32,
}

impl HeatmapSlot {
    pub(crate) fn new(day: usize, hour: usize, count: u32) -> Self {
        Self {
            day,
            day_name: day_name(day),
            hour,
            count,
        }
    }
}

/// Busiest cells of a heatmap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeakActivity {
    /// Highest cell count.
    pub max_logins: u32,
    /// Every cell equal to the maximum; empty without activity.
    pub peak_times: Vec<HeatmapSlot>,
    /// Human readable summary.
    pub peak_description: String,
}

/// Login counts indexed `[day_of_week][hour_of_day]` with `0 = Sunday`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HeatmapMatrix {
    cells: [[u32; 24]; 7],
}

impl HeatmapMatrix {
    /// Creates an all-zero matrix.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a matrix from login events.
    #[must_use]
    pub fn from_logins<'a>(events: impl IntoIterator<Item = &'a LoginEvent>) -> Self {
        let mut matrix = Self::new();
        for event in events {
            matrix.record(event.occurred_at);
        }

        matrix
    }

    /// Counts one login at the given instant.
    pub fn record(&mut self, occurred_at: DateTime<Utc>) {
        let day = occurred_at.weekday().num_days_from_sunday() as usize;
        let hour = occurred_at.hour() as usize;
        if let Some(cell) = self.cells.get_mut(day).and_then(|row| row.get_mut(hour)) {
            *cell = cell.saturating_add(1);
        }
    }

    /// Count for one cell; out-of-range indexes read as zero.
    #[must_use]
    pub fn get(&self, day: usize, hour: usize) -> u32 {
        self.cells
            .get(day)
            .and_then(|row| row.get(hour))
            .copied()
            .unwrap_or(0)
    }

    /// Raw rows.
    #[must_use]
    pub fn rows(&self) -> &[[u32; 24]; 7] {
        &self.cells
    }

    /// Sum of all cells.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.slots().map(|(_, _, count)| u64::from(count)).sum()
    }

    /// Iterates `(day, hour, count)` over all 168 cells.
    pub fn slots(&self) -> impl Iterator<Item = (usize, usize, u32)> + '_ {
        self.cells.iter().enumerate().flat_map(|(day, row)| {
            row.iter()
                .enumerate()
                .map(move |(hour, count)| (day, hour, *count))
        })
    }

    /// Finds the maximum cell and reports every tie.
    #[must_use]
    pub fn peak_activity(&self) -> PeakActivity {
        let max_logins = self.slots().map(|(_, _, count)| count).max().unwrap_or(0);
        if max_logins == 0 {
            return PeakActivity {
                max_logins: 0,
                peak_times: Vec::new(),
                peak_description: "No login activity recorded".to_owned(),
            };
        }

        let peak_times: Vec<HeatmapSlot> = self
            .slots()
            .filter(|(_, _, count)| *count == max_logins)
            .map(|(day, hour, count)| HeatmapSlot::new(day, hour, count))
            .collect();

        let slots = peak_times
            .iter()
            .map(|slot| format!("{} {:02}:00", slot.day_name, slot.hour))
            .collect::<Vec<_>>()
            .join(", ");

        PeakActivity {
            max_logins,
            peak_description: format!("Peak activity: {slots} ({max_logins} logins)"),
            peak_times,
        }
    }

    /// Lists cells at or below `threshold`.
    #[must_use]
    pub fn quiet_periods(&self, threshold: u32) -> Vec<HeatmapSlot> {
        self.slots()
            .filter(|(_, _, count)| *count <= threshold)
            .map(|(day, hour, count)| HeatmapSlot::new(day, hour, count))
            .collect()
    }

    /// Mean count over cells that saw any activity.
    #[must_use]
    pub fn active_cell_mean(&self) -> f64 {
        let (cells, total) = self
            .slots()
            .filter(|(_, _, count)| *count > 0)
            .fold((0_u32, 0_u64), |(cells, total), (_, _, count)| {
                (cells + 1, total + u64::from(count))
            });

        if cells == 0 {
            return 0.0;
        }

        total as f64 / f64::from(cells)
    }
}
