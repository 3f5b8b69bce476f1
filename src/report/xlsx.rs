//! Spreadsheet serialization for competition reports

use super::{Report, SheetRow, COLUMNS};
use crate::Result;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::path::{Path, PathBuf};

fn build_workbook(report: &Report) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    for sheet in &report.sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name)?;

        for (col, title) in COLUMNS.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, *title, &header)?;
        }
        worksheet.set_column_width(1, 28)?;
        worksheet.set_column_width(2, 24)?;

        for (idx, row) in sheet.rows.iter().enumerate() {
            write_row(worksheet, idx as u32 + 1, row)?;
        }
    }

    Ok(workbook)
}

fn write_row(worksheet: &mut Worksheet, r: u32, row: &SheetRow) -> Result<()> {
    let numbers = [
        (0, row.event_order.map(f64::from)),
        (3, row.placement.map(f64::from)),
        (4, row.field_size.map(f64::from)),
        (5, row.points),
    ];
    for (col, value) in numbers {
        match value {
            Some(n) => worksheet.write_number(r, col, n)?,
            None => worksheet.write_string(r, col, "")?,
        };
    }

    worksheet.write_string(r, 1, row.event_name.as_deref().unwrap_or(""))?;
    worksheet.write_string(r, 2, row.skater_name.as_deref().unwrap_or(""))?;
    Ok(())
}

/// Serialize a report to xlsx bytes
pub fn to_xlsx_bytes(report: &Report) -> Result<Vec<u8>> {
    let mut workbook = build_workbook(report)?;
    Ok(workbook.save_to_buffer()?)
}

/// Write a report into `dir` under its own filename
pub fn write_xlsx<P: AsRef<Path>>(report: &Report, dir: P) -> Result<PathBuf> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let path = dir.join(report.filename.replace(['/', '\\'], "_"));

    let mut workbook = build_workbook(report)?;
    workbook.save(&path)?;
    log::info!("Wrote report to {}", path.display());
    Ok(path)
}
