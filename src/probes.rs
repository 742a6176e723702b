use std::io::Read;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::types::Probe;

/// Accepted top-level shapes of a probe file.
#[derive(Deserialize)]
#[serde(untagged)]
enum ProbeDocument {
    List(Vec<Probe>),
    Wrapped { probes: Vec<Probe> },
}

impl From<ProbeDocument> for Vec<Probe> {
    fn from(doc: ProbeDocument) -> Self {
        match doc {
            ProbeDocument::List(probes) | ProbeDocument::Wrapped { probes } => probes,
        }
    }
}

/// Load a probe batch from a JSON or YAML file, or JSON on stdin when `path` is `-`.
pub fn load_probes(path: &Path) -> anyhow::Result<Vec<Probe>> {
    if path == Path::new("-") {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read probes from stdin")?;
        return parse_json(&content).context("Failed to parse probes from stdin");
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read probe file: {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let probes = if is_yaml {
        parse_yaml(&content)
    } else {
        parse_json(&content)
    };
    probes.with_context(|| format!("Failed to parse probe file: {}", path.display()))
}

pub fn parse_json(content: &str) -> anyhow::Result<Vec<Probe>> {
    let doc: ProbeDocument = serde_json::from_str(content)?;
    Ok(doc.into())
}

pub fn parse_yaml(content: &str) -> anyhow::Result<Vec<Probe>> {
    let doc: ProbeDocument = serde_yaml::from_str(content)?;
    Ok(doc.into())
}
