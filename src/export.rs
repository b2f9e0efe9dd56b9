//! Spreadsheet export of the task list.
//!
//! Produces one worksheet with a bold header row and one data row per
//! top-level task: seven leading columns (category, description, responsible,
//! status, stage, start date, due date) followed by the 60 timeline columns.
//! The timeline columns are emitted in the calculator's exact slot order
//! (month-major, week-minor) — rendering and export zip positionally, so any
//! drift here silently misaligns the highlighted cells in the file.

use std::path::Path;

use chrono::Local;
use rust_xlsxwriter::{Color, Format, Workbook, XlsxError};

use crate::fields::format_status;
use crate::task::TaskWithTimeline;
use crate::timeline::{MONTHS, WEEKS_PER_MONTH};

/// Leading column labels, ahead of the 60 timeline columns.
pub const LEAD_HEADERS: [&str; 7] = [
    "CATEGORIA",
    "O QUE",
    "QUEM",
    "STATUS",
    "ETAPA",
    "DATA DE INÍCIO",
    "DATA PREVISTA",
];

/// Marker written into active timeline cells.
pub const ACTIVE_MARK: &str = "X";

/// English three-letter month abbreviation, 1-indexed.
pub fn month_abbrev(month: u32) -> &'static str {
    const NAMES: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    NAMES[(month - 1) as usize]
}

/// The full header row: leading labels plus `"<Month> - S<week>"` for every
/// slot, in the calculator's order.
pub fn header_row() -> Vec<String> {
    let mut headers: Vec<String> = LEAD_HEADERS.iter().map(|h| (*h).to_string()).collect();
    for month in 1..=MONTHS {
        for week in 1..=WEEKS_PER_MONTH {
            headers.push(format!("{} - S{}", month_abbrev(month), week));
        }
    }
    headers
}

/// Default export file name, dated with the current local day.
pub fn default_file_name() -> String {
    format!(
        "planejamento_eventos_{}.xlsx",
        Local::now().format("%d-%m-%Y")
    )
}

/// Write the workbook: one row per top-level task, dates as `dd/MM/yyyy`,
/// active cells marked with [`ACTIVE_MARK`].
pub fn export_xlsx(tasks: &[TaskWithTimeline<'_>], path: &Path) -> Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Planejamento de Eventos")?;

    let header_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xD3D3D3));

    let headers = header_row();
    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, header, &header_format)?;
        let width = if header.contains("DATA") {
            15.0
        } else if *header == "O QUE" {
            30.0
        } else {
            12.0
        };
        worksheet.set_column_width(col as u16, width)?;
    }

    for (i, entry) in tasks.iter().enumerate() {
        let row = (i + 1) as u32;
        let task = entry.task;
        worksheet.write_string(row, 0, &task.category)?;
        worksheet.write_string(row, 1, &task.description)?;
        worksheet.write_string(row, 2, &task.responsible)?;
        worksheet.write_string(row, 3, format_status(task.status))?;
        worksheet.write_string(row, 4, &task.stage)?;
        worksheet.write_string(row, 5, &task.start_date.format("%d/%m/%Y").to_string())?;
        worksheet.write_string(row, 6, &task.due_date.format("%d/%m/%Y").to_string())?;

        for (j, cell) in entry.timeline.iter().enumerate() {
            let col = (LEAD_HEADERS.len() + j) as u16;
            let mark = if cell.is_active { ACTIVE_MARK } else { "" };
            worksheet.write_string(row, col, mark)?;
        }
    }

    workbook.save(path)?;
    Ok(())
}
