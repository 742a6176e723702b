use std::fs;
use std::path::Path;

use anyhow::Context;

const HEADER: &str = "# Managed by nodefix\n";

/// Record `module` in a modules-load.d style file. Returns false if it was
/// already listed.
pub fn record_module(path: &Path, module: &str) -> anyhow::Result<bool> {
    let existing = read_existing(path)?;
    if existing.lines().any(|line| line.trim() == module) {
        return Ok(false);
    }

    let mut content = if existing.is_empty() { HEADER.to_string() } else { existing };
    if !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(module);
    content.push('\n');
    write(path, &content)?;
    Ok(true)
}

/// Record `name = value` in a sysctl.d style file, replacing any previous
/// entry for the same key. Returns false if the file already had it.
pub fn record_sysctl(path: &Path, name: &str, value: &str) -> anyhow::Result<bool> {
    let existing = read_existing(path)?;
    let entry = format!("{name} = {value}");

    let mut lines: Vec<String> = Vec::new();
    let mut replaced = false;
    for line in existing.lines() {
        match sysctl_entry(line) {
            Some((key, current)) if key == name => {
                if current == value && !replaced {
                    lines.push(line.to_string());
                    replaced = true;
                } else if !replaced {
                    lines.push(entry.clone());
                    replaced = true;
                }
                // duplicate keys after the first are dropped
            }
            _ => lines.push(line.to_string()),
        }
    }

    if !replaced {
        if lines.is_empty() {
            lines.push(HEADER.trim_end().to_string());
        }
        lines.push(entry);
    }

    let mut content = lines.join("\n");
    content.push('\n');
    if content == existing {
        return Ok(false);
    }
    write(path, &content)?;
    Ok(true)
}

fn sysctl_entry(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.starts_with('#') || line.starts_with(';') {
        return None;
    }
    let (key, value) = line.split_once('=')?;
    Some((key.trim(), value.trim()))
}

fn read_existing(path: &Path) -> anyhow::Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

fn write(path: &Path, content: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}
