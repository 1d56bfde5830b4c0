// concord-core/src/infrastructure/render/hypertext.rs

use minijinja::{Environment, context};

use super::severity_color;
use crate::domain::finding::Severity;
use crate::domain::report::Report;
use crate::error::ConcordError;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::renderer::{OutputFormat, ReportRenderer};

// `.html` template names are auto-escaped by minijinja.
const TEMPLATE_NAME: &str = "report.html";

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Concord report {{ report.session_id }}</title>
<style>
body { font-family: sans-serif; margin: 2em; }
table { border-collapse: collapse; margin-bottom: 2em; }
th, td { border: 1px solid #ccc; padding: 4px 8px; text-align: left; vertical-align: top; }
th { background: #eee; }
{% for sev in severities %}.{{ sev.name }} { background: #{{ sev.color }}; }
{% endfor %}</style>
</head>
<body>
<h1>Session {{ report.session_id }}</h1>
<p class="{{ report.outcome | outcome_class }}">Outcome: <strong>{{ report.outcome }}</strong>
({{ report.summary.errors }} errors, {{ report.summary.warnings }} warnings, {{ report.summary.passes }} passes)</p>

<h2>Sources</h2>
<table>
<tr><th>source</th><th>errors</th><th>warnings</th><th>passes</th><th>outcome</th></tr>
{% for s in report.sources %}<tr><td>{{ s.source }}</td><td>{{ s.counts.errors }}</td><td>{{ s.counts.warnings }}</td><td>{{ s.counts.passes }}</td><td class="{{ s.outcome | outcome_class }}">{{ s.outcome }}</td></tr>
{% endfor %}</table>

{% for c in report.commands %}<h2>#{{ c.sequence }} {{ c.command }}</h2>
<p>{{ c.timestamp }} · inputs: {{ c.inputs | join(", ") }}{% for key, value in c.parameters | items %} · {{ key }}={{ value }}{% endfor %}</p>
{% for a in c.artifacts %}<p>Artifact: {{ a.name }} → {{ a.path }} ({{ a.rows }} rows, {{ a.columns }} columns)</p>
{% endfor %}<table>
<tr><th>id</th><th>severity</th><th>rule</th><th>source</th><th>row</th><th>column</th><th>message</th></tr>
{% for f in c.findings %}<tr class="{{ f.finding.severity }}"><td>{{ f.id }}</td><td>{{ f.finding.severity }}</td><td>{{ f.finding.rule.name }}</td><td>{{ f.finding.source }}</td><td>{{ f.finding.row if f.finding.row is not none }}</td><td>{{ f.finding.column if f.finding.column is not none }}</td><td>{{ f.finding.message }}</td></tr>
{% endfor %}</table>
{% endfor %}
<h2>Lineage</h2>
<table>
<tr><th>source</th><th>row</th><th>column</th><th>findings</th></tr>
{% for e in report.lineage_index %}<tr><td>{{ e.location.source }}</td><td>{{ e.location.row if e.location.row is not none }}</td><td>{{ e.location.column if e.location.column is not none }}</td><td>{{ e.findings | join(", ") }}</td></tr>
{% endfor %}</table>
</body>
</html>
"#;

pub struct HypertextRenderer {
    env: Environment<'static>,
}

impl HypertextRenderer {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_filter("outcome_class", |outcome: &str| -> String {
            match outcome {
                "failed" => Severity::Error.as_str().to_string(),
                "warned" => Severity::Warning.as_str().to_string(),
                _ => Severity::Pass.as_str().to_string(),
            }
        });
        Self { env }
    }
}

impl Default for HypertextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportRenderer for HypertextRenderer {
    fn render(&self, report: &Report) -> Result<Vec<u8>, ConcordError> {
        let severities: Vec<_> = [Severity::Error, Severity::Warning, Severity::Pass]
            .into_iter()
            .map(|s| context! { name => s.as_str(), color => format!("{:06X}", severity_color(s)) })
            .collect();

        let html = self
            .env
            .render_named_str(TEMPLATE_NAME, TEMPLATE, context! { report, severities })
            .map_err(InfrastructureError::TemplateError)?;
        Ok(html.into_bytes())
    }

    fn format(&self) -> OutputFormat {
        OutputFormat::Hypertext
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::infrastructure::render::fixtures;
    use anyhow::Result;

    #[test]
    fn test_html_escapes_and_colors() -> Result<()> {
        let bytes = HypertextRenderer::new().render(&fixtures::report())?;
        let html = String::from_utf8(bytes)?;

        assert!(html.contains(".error { background: #FFC7CE; }"));
        assert!(html.contains("<tr class=\"error\"><td>C1-F1</td>"));
        assert!(html.contains("&lt;ok&gt; &amp; fine"));
        assert!(!html.contains("<ok>"));
        assert!(html.contains("<td>orders.csv</td><td>1</td><td>qty</td><td>C1-F1</td>"));
        Ok(())
    }
}
