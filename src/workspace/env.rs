// src/workspace/env.rs

//! Environment overlay from a workspace-local `.env` file.
//!
//! Precedence: the host environment wins; `.env` values only fill in keys the
//! host does not define.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, warn};

pub const ENV_FILE: &str = ".env";

/// Parse a `.env` file of `KEY=VALUE` lines. A missing file yields an empty
/// map.
///
/// Values are literal: surrounding quotes are stripped but `$VAR` is never
/// expanded. Blank lines, `#` comments and lines without `=` are skipped; an
/// `export ` prefix on the key is tolerated.
pub fn load_env_file(path: &Path) -> BTreeMap<String, String> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            warn!(path = ?path, error = %e, "failed to read env file; ignoring");
            return BTreeMap::new();
        }
    };

    let vars = parse_env(&contents);
    debug!(path = ?path, count = vars.len(), "loaded env overlay");
    vars
}

/// Parse `.env` contents; see [`load_env_file`].
pub fn parse_env(contents: &str) -> BTreeMap<String, String> {
    contents.lines().filter_map(parse_env_line).collect()
}

fn parse_env_line(raw: &str) -> Option<(String, String)> {
    let line = raw.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let Some((key, value)) = line.split_once('=') else {
        debug!(line = raw, "skipping env line without '='");
        return None;
    };

    let key = key.trim();
    let key = key.strip_prefix("export ").map(str::trim).unwrap_or(key);
    if key.is_empty() {
        return None;
    }
    let value = value.trim().trim_matches('"').trim_matches('\'');
    Some((key.to_string(), value.to_string()))
}

/// Keep only overlay entries whose key is not already set.
pub fn fill_missing(
    overlay: BTreeMap<String, String>,
    is_set: impl Fn(&str) -> bool,
) -> BTreeMap<String, String> {
    overlay
        .into_iter()
        .filter(|(key, _)| !is_set(key))
        .collect()
}

/// Variables from `<workspace>/.env` that must be added on top of the
/// inherited host environment.
pub fn overlay_for_workspace(workspace: &Path) -> BTreeMap<String, String> {
    let overlay = load_env_file(&workspace.join(ENV_FILE));
    fill_missing(overlay, |key| std::env::var_os(key).is_some())
}
