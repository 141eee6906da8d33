use std::fs;
use std::path::Path;

use crate::errors::{AppError, AppResult};
use crate::models::PermissionDoc;

pub fn to_policy_json(docs: &[PermissionDoc]) -> AppResult<String> {
    let mut out = serde_json::to_string_pretty(docs)?;
    out.push('\n');
    Ok(out)
}

pub fn from_policy_json(text: &str) -> AppResult<Vec<PermissionDoc>> {
    let de = &mut serde_json::Deserializer::from_str(text);
    let docs: Vec<PermissionDoc> = serde_path_to_error::deserialize(de)?;
    Ok(docs)
}

/// Writes the policy file, creating parent directories as needed.
pub fn write_policy(path: &Path, docs: &[PermissionDoc]) -> AppResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| AppError::io(parent, err))?;
    }
    let json = to_policy_json(docs)?;
    fs::write(path, json).map_err(|err| AppError::io(path, err))?;

    tracing::info!(path = %path.display(), permissions = docs.len(), "policy written");
    Ok(())
}

pub fn read_policy(path: &Path) -> AppResult<Vec<PermissionDoc>> {
    let text = fs::read_to_string(path).map_err(|err| AppError::io(path, err))?;
    from_policy_json(&text)
}
