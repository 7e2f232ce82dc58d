//! Bulk ingestion handler.
//!
//! A payload goes through four stages:
//!
//! 1. parse every line (all-or-nothing)
//! 2. resolve the collection schema
//! 3. validate every document, stopping at the first violation
//! 4. insert, then resolve reported conflicts with the requested
//!    [`DuplicatePolicy`]
//!
//! Stages 1-3 never touch the backend. Writes made in stage 4 are not rolled
//! back when a later document conflicts or fails.

use std::sync::Arc;

use docgate_core::{
    Backend, BackendResult, BatchOutcome, Document, DuplicatePolicy, Error, Result, WriteOutcome,
};
use docgate_schema::ValidationOutcome;
use tracing::debug;

use crate::executor::Services;
use crate::ingest::{parse_payload, submission, ParsedLine};
use crate::Output;

/// A submitted document the backend reported as already existing.
struct Conflict<'a> {
    line: &'a ParsedLine<'a>,
    document: Document,
    message: String,
}

type WriteFn = fn(&dyn Backend, &str, &[Document]) -> BackendResult<Vec<WriteOutcome>>;

/// Handle SaveDocuments command.
pub fn save_documents(
    s: &Arc<Services>,
    collection: String,
    payload: String,
    on_duplicate: DuplicatePolicy,
    display_errors: bool,
) -> Result<Output> {
    let parsed = parse_payload(&payload)?;

    let schema = s
        .schemas
        .schema_for(&collection)
        .ok_or_else(|| Error::SchemaNotFound {
            collection: collection.clone(),
        })?;

    for line in &parsed.lines {
        let instance = serde_json::Value::Object(line.document.clone());
        if let ValidationOutcome::Invalid(violation) = schema.validate(&instance) {
            debug!(collection = %collection, line = line.line, "document failed validation");
            return Err(violation.into());
        }
    }

    let mut outcome = BatchOutcome::new(display_errors);
    outcome.empty = parsed.empty;
    if parsed.lines.is_empty() {
        return Ok(Output::Batch(outcome));
    }

    let submitted: Vec<Document> = parsed
        .lines
        .iter()
        .map(|line| submission(schema.kind(), &line.document))
        .collect();
    let reported = s.backend.insert(&collection, &submitted)?;
    check_len(&reported, submitted.len())?;

    let mut conflicts = Vec::new();
    for ((line, document), result) in parsed.lines.iter().zip(submitted).zip(reported) {
        match result {
            WriteOutcome::Created => outcome.created += 1,
            WriteOutcome::Updated => outcome.updated += 1,
            WriteOutcome::Failed { message } => outcome.record_error(line.line, &message, line.raw),
            WriteOutcome::Conflict { message } => conflicts.push(Conflict {
                line,
                document,
                message,
            }),
        }
    }

    if !conflicts.is_empty() {
        resolve_conflicts(s, &collection, on_duplicate, conflicts, &mut outcome)?;
    }

    debug!(
        collection = %collection,
        policy = %on_duplicate,
        created = outcome.created,
        updated = outcome.updated,
        ignored = outcome.ignored,
        errors = outcome.errors,
        empty = outcome.empty,
        "saved documents"
    );
    Ok(Output::Batch(outcome))
}

fn resolve_conflicts(
    s: &Arc<Services>,
    collection: &str,
    policy: DuplicatePolicy,
    conflicts: Vec<Conflict<'_>>,
    outcome: &mut BatchOutcome,
) -> Result<()> {
    match policy {
        DuplicatePolicy::Error => {
            on_error(conflicts, outcome);
            Ok(())
        }
        DuplicatePolicy::Ignore => {
            on_ignore(conflicts, outcome);
            Ok(())
        }
        DuplicatePolicy::Update => {
            on_overwrite(s, collection, conflicts, outcome, |b, c, d| b.update(c, d))
        }
        DuplicatePolicy::Replace => {
            on_overwrite(s, collection, conflicts, outcome, |b, c, d| b.replace(c, d))
        }
    }
}

fn on_error(conflicts: Vec<Conflict<'_>>, outcome: &mut BatchOutcome) {
    for conflict in conflicts {
        outcome.record_error(conflict.line.line, &conflict.message, conflict.line.raw);
    }
}

fn on_ignore(conflicts: Vec<Conflict<'_>>, outcome: &mut BatchOutcome) {
    outcome.ignored += conflicts.len() as u64;
}

fn on_overwrite(
    s: &Arc<Services>,
    collection: &str,
    conflicts: Vec<Conflict<'_>>,
    outcome: &mut BatchOutcome,
    write: WriteFn,
) -> Result<()> {
    let (lines, documents): (Vec<&ParsedLine<'_>>, Vec<Document>) = conflicts
        .into_iter()
        .map(|c| (c.line, c.document))
        .unzip();
    let reported = write(s.backend.as_ref(), collection, &documents)?;
    check_len(&reported, documents.len())?;

    for (line, result) in lines.into_iter().zip(reported) {
        match result {
            WriteOutcome::Updated => outcome.updated += 1,
            WriteOutcome::Created => outcome.created += 1,
            WriteOutcome::Conflict { message } | WriteOutcome::Failed { message } => {
                outcome.record_error(line.line, &message, line.raw)
            }
        }
    }
    Ok(())
}

fn check_len(reported: &[WriteOutcome], submitted: usize) -> Result<()> {
    if reported.len() != submitted {
        return Err(Error::Internal {
            reason: format!(
                "backend reported {} outcomes for {} documents",
                reported.len(),
                submitted
            ),
        });
    }
    Ok(())
}
