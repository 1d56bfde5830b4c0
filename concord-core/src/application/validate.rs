// concord-core/src/application/validate.rs

use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::CommandReceipt;
use crate::domain::configuration::EngineSettings;
use crate::domain::dataset::Dataset;
use crate::domain::finding::Finding;
use crate::domain::rules::{EvaluationPlan, References, Rule, RuleEngine};
use crate::domain::session::{CommandName, CommandRecord, SessionLedger};
use crate::error::ConcordError;
use crate::infrastructure::config::load_rule_set;
use crate::ports::loader::DatasetLoader;

#[derive(Debug, Clone)]
pub struct ValidateRequest {
    pub file: PathBuf,
    pub rules: PathBuf,
}

/// Reference paths are relative to the rule document that names them.
fn resolve_reference(rules_path: &Path, reference: &str) -> PathBuf {
    let candidate = PathBuf::from(reference);
    if candidate.is_absolute() {
        return candidate;
    }
    match rules_path.parent() {
        Some(dir) => dir.join(candidate),
        None => candidate,
    }
}

async fn load_references(
    loader: &dyn DatasetLoader,
    rules_path: &Path,
    rules: &[Rule],
) -> Result<References, ConcordError> {
    let mut references = References::new();
    for rule in rules {
        let Rule::ReferentialIntegrity(r) = rule else {
            continue;
        };
        if references.contains_key(&r.reference) {
            continue;
        }
        let path = resolve_reference(rules_path, &r.reference);
        debug!(reference = %r.reference, path = %path.display(), "Loading reference dataset");
        let dataset = loader.load(&path).await?;
        references.insert(r.reference.clone(), Arc::new(dataset));
    }
    Ok(references)
}

/// Runs the check pass over every chunk. Large datasets go to blocking workers;
/// `buffered` yields chunk results in submission order.
pub async fn evaluate_plan(
    plan: EvaluationPlan,
    settings: &EngineSettings,
) -> Result<Vec<Finding>, ConcordError> {
    let chunks = plan.chunks();

    if plan.dataset().len() < settings.parallel_threshold {
        let results = chunks.into_iter().map(|range| plan.check_rows(range)).collect();
        return Ok(plan.finish(results));
    }

    let workers = settings.workers.max(1);
    info!(chunks = chunks.len(), workers, "⚡ Evaluating in parallel");
    let plan = Arc::new(plan);
    let results: Vec<Vec<Finding>> = stream::iter(chunks.into_iter().map(|range| {
        let plan = Arc::clone(&plan);
        tokio::task::spawn_blocking(move || plan.check_rows(range))
    }))
    .buffered(workers)
    .try_collect()
    .await
    .map_err(|e| ConcordError::InternalError(format!("validation worker failed: {}", e)))?;

    Ok(plan.finish(results))
}

/// Validates one dataset against a rule document and records the findings.
#[instrument(skip_all, fields(file = %request.file.display(), rules = %request.rules.display()))]
pub async fn run_validate(
    request: &ValidateRequest,
    loader: &dyn DatasetLoader,
    settings: &EngineSettings,
    ledger: &mut SessionLedger,
) -> Result<CommandReceipt, ConcordError> {
    let document = load_rule_set(&request.rules)?;
    let dataset: Arc<Dataset> = Arc::new(loader.load(&request.file).await?);
    let references = load_references(loader, &request.rules, &document.rules).await?;

    let engine = RuleEngine::new(settings.clone());
    let plan = engine.prepare(dataset, &document.rules, &references)?;
    let findings = evaluate_plan(plan, settings).await?;

    let mut inputs = vec![request.file.display().to_string()];
    let mut reference_names: Vec<&String> = references.keys().collect();
    reference_names.sort();
    inputs.extend(reference_names.into_iter().cloned());

    let mut record = CommandRecord::new(CommandName::Validate, inputs)
        .with_parameter("rules", request.rules.display())
        .with_parameter("rule_count", document.rules.len());
    if let Some(name) = &document.name {
        record = record.with_parameter("rule_set", name);
    }

    let sequence = ledger.append(record.with_findings(findings));
    let receipt = ledger
        .last()
        .map(CommandReceipt::of)
        .ok_or_else(|| ConcordError::InternalError("ledger lost the validate record".into()))?;
    info!(sequence, findings = receipt.counts.total(), "✅ Validation recorded");
    Ok(receipt)
}
