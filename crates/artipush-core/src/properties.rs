use std::collections::BTreeMap;
use std::path::Path;

/// Loads a `.artipush.env` file (shell-style `KEY=value` format).
///
/// CI jobs drop build identifiers and similar values here so that
/// `Artipush.toml` can reference them through `${env:VAR}`.
pub fn load_env_file(path: &Path) -> miette::Result<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();
    if !path.is_file() {
        return Ok(map);
    }
    let content =
        std::fs::read_to_string(path).map_err(artipush_util::errors::PublishError::Io)?;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = trimmed.split_once('=') {
            map.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    Ok(map)
}

/// Interpolate `${env:VAR}` references in a string.
///
/// Looks up values first from the provided `env_overrides` map (populated
/// from `.artipush.env`), then falls back to actual process environment variables.
/// Unknown variables become empty strings.
pub fn interpolate(input: &str, env_overrides: &BTreeMap<String, String>) -> String {
    const OPEN: &str = "${env:";
    let mut result = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find(OPEN) {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let key = &rest[start + OPEN.len()..start + len];
        result.push_str(&rest[..start]);
        match env_overrides.get(key) {
            Some(value) => result.push_str(value),
            None => match std::env::var(key) {
                Ok(value) => result.push_str(&value),
                Err(_) => tracing::debug!(key, "unset variable interpolated as empty"),
            },
        }
        // Substituted values are never rescanned.
        rest = &rest[start + len + 1..];
    }
    result.push_str(rest);
    result
}
