// concord-core/src/infrastructure/render/mod.rs
//
// Report renderers. Severity colors live here and nowhere else.

pub mod delimited;
pub mod hypertext;
pub mod workbook;

use crate::domain::finding::{LineageEntry, Severity};
use crate::domain::report::Report;
use crate::error::ConcordError;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::renderer::{OutputFormat, ReportRenderer};

pub use delimited::DelimitedRenderer;
pub use hypertext::HypertextRenderer;
pub use workbook::WorkbookRenderer;

pub fn renderer_for(format: OutputFormat) -> Box<dyn ReportRenderer> {
    match format {
        OutputFormat::Workbook => Box::new(WorkbookRenderer),
        OutputFormat::Delimited => Box::new(DelimitedRenderer),
        OutputFormat::Hypertext => Box::new(HypertextRenderer::new()),
        OutputFormat::Json => Box::new(JsonRenderer),
    }
}

pub struct JsonRenderer;

impl ReportRenderer for JsonRenderer {
    fn render(&self, report: &Report) -> Result<Vec<u8>, ConcordError> {
        let mut bytes =
            serde_json::to_vec_pretty(report).map_err(InfrastructureError::JsonError)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    fn format(&self) -> OutputFormat {
        OutputFormat::Json
    }
}

/// Fill colors (RGB): red for Error, amber for Warning, green for Pass.
pub(crate) fn severity_color(severity: Severity) -> u32 {
    match severity {
        Severity::Error => 0xFFC7CE,
        Severity::Warning => 0xFFEB9C,
        Severity::Pass => 0xC6EFCE,
    }
}

/// `source:row[column]=value` entries joined with `; `.
pub(crate) fn lineage_text(lineage: &[LineageEntry]) -> String {
    lineage
        .iter()
        .map(|l| {
            let mut text = l.source.clone();
            if let Some(row) = l.row {
                text.push_str(&format!(":{}", row));
            }
            if let Some(column) = &l.column {
                text.push_str(&format!("[{}]", column));
            }
            if let Some(value) = &l.value {
                text.push_str(&format!("={:?}", value));
            }
            text
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::domain::finding::{CheckKind, Finding, LineageEntry, RuleRef, Severity};
    use crate::domain::report::{Report, aggregate};
    use crate::domain::session::{CommandName, CommandRecord, SessionLedger};

    pub fn report() -> Report {
        let mut ledger = SessionLedger::new();
        ledger.append(
            CommandRecord::new(CommandName::Validate, vec!["orders.csv".to_string()])
                .with_parameter("rules", "rules.yaml")
                .with_findings(vec![
                    Finding::new(Severity::Error, RuleRef::new("type:qty", CheckKind::Type), "orders.csv")
                        .at_row(1)
                        .on_column("qty")
                        .with_message("'abc' is not an integer")
                        .with_lineage(LineageEntry::cell("orders.csv", 1, "qty").with_value("abc")),
                    Finding::new(Severity::Pass, RuleRef::new("type:qty", CheckKind::Type), "orders.csv")
                        .at_row(2)
                        .on_column("qty")
                        .with_message("<ok> & fine")
                        .with_lineage(LineageEntry::cell("orders.csv", 2, "qty").with_value("7")),
                ]),
        );
        aggregate(&ledger)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_json_roundtrips() -> Result<()> {
        let report = fixtures::report();
        let bytes = renderer_for(OutputFormat::Json).render(&report)?;
        let parsed: Report = serde_json::from_slice(&bytes)?;
        assert_eq!(parsed, report);
        Ok(())
    }

    #[test]
    fn test_lineage_text() {
        let lineage = vec![
            LineageEntry::cell("a.csv", 3, "name").with_value("Acme"),
            LineageEntry::row("b.csv", 0),
        ];
        assert_eq!(lineage_text(&lineage), "a.csv:3[name]=\"Acme\"; b.csv:0");
    }

    #[test]
    fn test_every_format_has_a_renderer() {
        for format in [
            OutputFormat::Workbook,
            OutputFormat::Delimited,
            OutputFormat::Hypertext,
            OutputFormat::Json,
        ] {
            assert_eq!(renderer_for(format).format(), format);
        }
    }
}
