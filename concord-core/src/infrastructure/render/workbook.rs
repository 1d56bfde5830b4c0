// concord-core/src/infrastructure/render/workbook.rs
//
// Color-coded xlsx report: a summary sheet, one row per finding, and the lineage index.

use rust_xlsxwriter::{Color, Format, Workbook, Worksheet, XlsxError};

use super::{lineage_text, severity_color};
use crate::domain::finding::{Outcome, Severity};
use crate::domain::report::Report;
use crate::error::ConcordError;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::renderer::{OutputFormat, ReportRenderer};

pub struct WorkbookRenderer;

struct Styles {
    header: Format,
    error: Format,
    warning: Format,
    pass: Format,
}

impl Styles {
    fn new() -> Self {
        let fill = |severity| Format::new().set_background_color(Color::RGB(severity_color(severity)));
        Self {
            header: Format::new().set_bold(),
            error: fill(Severity::Error),
            warning: fill(Severity::Warning),
            pass: fill(Severity::Pass),
        }
    }

    fn severity(&self, severity: Severity) -> &Format {
        match severity {
            Severity::Error => &self.error,
            Severity::Warning => &self.warning,
            Severity::Pass => &self.pass,
        }
    }

    fn outcome(&self, outcome: Outcome) -> &Format {
        match outcome {
            Outcome::Failed => &self.error,
            Outcome::Warned => &self.warning,
            Outcome::Passed => &self.pass,
        }
    }
}

fn write_header(sheet: &mut Worksheet, titles: &[&str], styles: &Styles) -> Result<(), XlsxError> {
    for (col, title) in titles.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, &styles.header)?;
    }
    Ok(())
}

fn summary_sheet(workbook: &mut Workbook, report: &Report, styles: &Styles) -> Result<(), XlsxError> {
    let sheet = workbook.add_worksheet().set_name("Summary")?;
    write_header(
        sheet,
        &["sequence", "command", "timestamp", "inputs", "errors", "warnings", "passes", "outcome"],
        styles,
    )?;

    let mut row = 1u32;
    for command in &report.commands {
        sheet.write_number(row, 0, command.sequence as f64)?;
        sheet.write_string(row, 1, command.command.as_str())?;
        sheet.write_string(row, 2, command.timestamp.to_rfc3339())?;
        sheet.write_string(row, 3, command.inputs.join(", "))?;
        sheet.write_number(row, 4, command.counts.errors as f64)?;
        sheet.write_number(row, 5, command.counts.warnings as f64)?;
        sheet.write_number(row, 6, command.counts.passes as f64)?;
        sheet.write_string_with_format(row, 7, command.outcome.as_str(), styles.outcome(command.outcome))?;
        row += 1;
    }

    row += 1;
    sheet.write_string_with_format(row, 0, "session", &styles.header)?;
    sheet.write_string(row, 1, report.session_id.as_str())?;
    sheet.write_number(row, 4, report.summary.errors as f64)?;
    sheet.write_number(row, 5, report.summary.warnings as f64)?;
    sheet.write_number(row, 6, report.summary.passes as f64)?;
    sheet.write_string_with_format(row, 7, report.outcome.as_str(), styles.outcome(report.outcome))?;

    for rollup in &report.sources {
        row += 1;
        sheet.write_string(row, 0, "source")?;
        sheet.write_string(row, 1, rollup.source.as_str())?;
        sheet.write_number(row, 4, rollup.counts.errors as f64)?;
        sheet.write_number(row, 5, rollup.counts.warnings as f64)?;
        sheet.write_number(row, 6, rollup.counts.passes as f64)?;
        sheet.write_string_with_format(row, 7, rollup.outcome.as_str(), styles.outcome(rollup.outcome))?;
    }

    sheet.set_column_width(1, 30)?;
    sheet.set_column_width(2, 28)?;
    sheet.set_column_width(3, 40)?;
    Ok(())
}

fn findings_sheet(workbook: &mut Workbook, report: &Report, styles: &Styles) -> Result<(), XlsxError> {
    let sheet = workbook.add_worksheet().set_name("Findings")?;
    write_header(
        sheet,
        &["id", "command", "severity", "rule", "kind", "source", "row", "column", "message", "lineage"],
        styles,
    )?;

    for (i, (command, reported)) in report.findings().enumerate() {
        let row = i as u32 + 1;
        let f = &reported.finding;
        let fill = styles.severity(f.severity());
        sheet.write_string(row, 0, reported.id.as_str())?;
        sheet.write_string(row, 1, command.command.as_str())?;
        sheet.write_string_with_format(row, 2, f.severity().as_str(), fill)?;
        sheet.write_string(row, 3, f.rule().name.as_str())?;
        sheet.write_string(row, 4, f.rule().kind.as_str())?;
        sheet.write_string(row, 5, f.source())?;
        if let Some(r) = f.row() {
            sheet.write_number(row, 6, r as f64)?;
        }
        if let Some(column) = f.column() {
            sheet.write_string(row, 7, column)?;
        }
        sheet.write_string(row, 8, f.message())?;
        sheet.write_string(row, 9, lineage_text(f.lineage()))?;
    }

    sheet.set_column_width(3, 28)?;
    sheet.set_column_width(5, 30)?;
    sheet.set_column_width(8, 60)?;
    sheet.set_column_width(9, 60)?;
    Ok(())
}

fn lineage_sheet(workbook: &mut Workbook, report: &Report, styles: &Styles) -> Result<(), XlsxError> {
    let sheet = workbook.add_worksheet().set_name("Lineage")?;
    write_header(sheet, &["source", "row", "column", "findings"], styles)?;

    for (i, entry) in report.lineage_index.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, entry.location.source.as_str())?;
        if let Some(r) = entry.location.row {
            sheet.write_number(row, 1, r as f64)?;
        }
        if let Some(column) = &entry.location.column {
            sheet.write_string(row, 2, column.as_str())?;
        }
        let ids: Vec<&str> = entry.findings.iter().map(|id| id.as_str()).collect();
        sheet.write_string(row, 3, ids.join(", "))?;
    }
    sheet.set_column_width(0, 30)?;
    Ok(())
}

impl ReportRenderer for WorkbookRenderer {
    fn render(&self, report: &Report) -> Result<Vec<u8>, ConcordError> {
        let styles = Styles::new();
        let mut workbook = Workbook::new();
        summary_sheet(&mut workbook, report, &styles).map_err(InfrastructureError::WorkbookError)?;
        findings_sheet(&mut workbook, report, &styles).map_err(InfrastructureError::WorkbookError)?;
        lineage_sheet(&mut workbook, report, &styles).map_err(InfrastructureError::WorkbookError)?;
        Ok(workbook
            .save_to_buffer()
            .map_err(InfrastructureError::WorkbookError)?)
    }

    fn format(&self) -> OutputFormat {
        OutputFormat::Workbook
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::infrastructure::render::fixtures;
    use anyhow::Result;
    use calamine::{Data, Reader, Xlsx, open_workbook_from_rs};
    use std::io::Cursor;

    #[test]
    fn test_workbook_has_three_sheets_and_every_finding() -> Result<()> {
        let bytes = WorkbookRenderer.render(&fixtures::report())?;

        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;
        assert_eq!(workbook.sheet_names(), vec!["Summary", "Findings", "Lineage"]);

        let findings = workbook.worksheet_range("Findings")?;
        assert_eq!(findings.height(), 3);
        assert_eq!(
            findings.get_value((1, 0)),
            Some(&Data::String("C1-F1".to_string()))
        );
        assert_eq!(
            findings.get_value((1, 2)),
            Some(&Data::String("error".to_string()))
        );
        Ok(())
    }
}
