//! Week-grid timeline computation.
//!
//! Maps a task's `[start_date, due_date]` interval onto a fixed grid of
//! 12 months × 5 weeks = 60 boolean cells. The grid is an approximation of
//! calendar weeks: each day lands in `ceil((day_of_month + offset) / 7)`
//! where `offset` is the Sunday-based weekday of the 1st of that month,
//! capped at week 5. Rendering and export both zip the resulting sequence
//! positionally against header columns, so the order is fixed: month-major,
//! week-minor, both 1-indexed.

use chrono::{Datelike, NaiveDate};

use crate::task::WeekCell;

/// Months in the grid.
pub const MONTHS: u32 = 12;
/// Week slots per month.
pub const WEEKS_PER_MONTH: u32 = 5;
/// Total cells per timeline.
pub const CELLS: usize = (MONTHS * WEEKS_PER_MONTH) as usize;

/// Compute the 60-cell activity grid for a date range.
///
/// Walks every day from `start` to `due` inclusive and marks the week slot
/// it falls in. An inverted range yields an all-inactive grid; a range of a
/// year or more fills the whole grid without walking it.
pub fn calculate_timeline(start: NaiveDate, due: NaiveDate) -> Vec<WeekCell> {
    let mut active = [[false; WEEKS_PER_MONTH as usize]; MONTHS as usize];

    if due >= start {
        if (due - start).num_days() >= 366 {
            active = [[true; WEEKS_PER_MONTH as usize]; MONTHS as usize];
        } else {
            let mut day = start;
            loop {
                let slot = week_of_month(day);
                active[day.month0() as usize][(slot - 1) as usize] = true;
                if day == due {
                    break;
                }
                match day.succ_opt() {
                    Some(next) => day = next,
                    None => break,
                }
            }
        }
    }

    let mut cells = Vec::with_capacity(CELLS);
    for month in 1..=MONTHS {
        for week in 1..=WEEKS_PER_MONTH {
            cells.push(WeekCell {
                month,
                week,
                is_active: active[(month - 1) as usize][(week - 1) as usize],
            });
        }
    }
    cells
}

/// Week-of-month slot (1..=5) for a date, aligned to Sunday-started weeks.
fn week_of_month(day: NaiveDate) -> u32 {
    let offset = day.with_day(1).map_or(0, |d| d.weekday().num_days_from_sunday());
    ((day.day() + offset).div_ceil(7)).min(WEEKS_PER_MONTH)
}
