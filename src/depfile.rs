//! Depfile rendering for recorded dependency sets
//!
//! Two consumers matter: build systems ingesting a JSON record, and
//! Make-style tools expecting `outputs: inputs` depfile syntax.

use anyhow::Result;
use serde::Serialize;

use crate::sink::CollectedDeps;

/// JSON shape of the dependency record.
#[derive(Debug, Serialize)]
struct JsonRecord {
    inputs: Vec<String>,
    outputs: Vec<String>,
}

/// Render the record as pretty-printed JSON.
pub fn to_json(deps: &CollectedDeps) -> Result<String> {
    let record = JsonRecord {
        inputs: deps.inputs.iter().map(|p| p.display().to_string()).collect(),
        outputs: deps.outputs.iter().map(|p| p.display().to_string()).collect(),
    };
    Ok(serde_json::to_string_pretty(&record)?)
}

/// Render the record as a Makefile-style depfile: every output depends on
/// every input. Empty when the step produced no outputs.
pub fn to_makefile(deps: &CollectedDeps) -> String {
    if deps.outputs.is_empty() {
        return String::new();
    }
    let outputs: Vec<String> = deps
        .outputs
        .iter()
        .map(|p| escape_make(&p.display().to_string()))
        .collect();
    let inputs: Vec<String> = deps
        .inputs
        .iter()
        .map(|p| escape_make(&p.display().to_string()))
        .collect();
    format!("{}: {}\n", outputs.join(" "), inputs.join(" "))
}

/// Escape characters Make treats specially inside a depfile path.
fn escape_make(path: &str) -> String {
    let mut escaped = String::with_capacity(path.len());
    for c in path.chars() {
        match c {
            ' ' => escaped.push_str("\\ "),
            '#' => escaped.push_str("\\#"),
            '$' => escaped.push_str("$$"),
            _ => escaped.push(c),
        }
    }
    escaped
}
