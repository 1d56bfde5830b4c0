// concord-core/src/infrastructure/render/delimited.rs

use super::lineage_text;
use crate::domain::report::Report;
use crate::error::ConcordError;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::renderer::{OutputFormat, ReportRenderer};

const HEADER: [&str; 11] = [
    "id", "sequence", "command", "severity", "rule", "kind", "source", "row", "column",
    "message", "lineage",
];

/// One line per finding, in ledger order.
pub struct DelimitedRenderer;

impl ReportRenderer for DelimitedRenderer {
    fn render(&self, report: &Report) -> Result<Vec<u8>, ConcordError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(HEADER)
            .map_err(InfrastructureError::CsvError)?;

        for (command, reported) in report.findings() {
            let f = &reported.finding;
            writer
                .write_record([
                    reported.id.to_string(),
                    command.sequence.to_string(),
                    command.command.to_string(),
                    f.severity().to_string(),
                    f.rule().name.clone(),
                    f.rule().kind.to_string(),
                    f.source().to_string(),
                    f.row().map(|r| r.to_string()).unwrap_or_default(),
                    f.column().unwrap_or_default().to_string(),
                    f.message().to_string(),
                    lineage_text(f.lineage()),
                ])
                .map_err(InfrastructureError::CsvError)?;
        }

        writer
            .into_inner()
            .map_err(|e| InfrastructureError::Io(e.into_error()).into())
    }

    fn format(&self) -> OutputFormat {
        OutputFormat::Delimited
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::infrastructure::render::fixtures;
    use anyhow::Result;

    #[test]
    fn test_one_line_per_finding() -> Result<()> {
        let bytes = DelimitedRenderer.render(&fixtures::report())?;
        let text = String::from_utf8(bytes)?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("id,sequence,command,severity"));
        assert_eq!(
            lines[1],
            "C1-F1,1,validate,error,type:qty,type,orders.csv,1,qty,'abc' is not an integer,\"orders.csv:1[qty]=\"\"abc\"\"\""
        );
        Ok(())
    }
}
