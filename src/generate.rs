use std::collections::BTreeMap;

use crate::config::Config;
use crate::errors::AppResult;
use crate::grouping;
use crate::models::{Permission, PermissionDoc};
use crate::{policy, scanner};

#[derive(Debug, Default)]
pub struct GenerateReport {
    pub scanned: usize,
    pub parsed: usize,
    /// Failure counts keyed by `AppError::kind`
    pub skipped: BTreeMap<&'static str, usize>,
    pub docs: Vec<PermissionDoc>,
}

/// Parses every record, keeping the ones that succeed in their original order.
///
/// In strict mode the first failure is returned instead of being counted.
pub fn parse_all(
    perms: Vec<Permission>,
    strict: bool,
) -> AppResult<(Vec<Permission>, BTreeMap<&'static str, usize>)> {
    let mut ok = Vec::with_capacity(perms.len());
    let mut skipped = BTreeMap::new();

    for mut perm in perms {
        match perm.parse() {
            Ok(()) => ok.push(perm),
            Err(err) if !strict => {
                tracing::warn!(
                    filepath = %perm.filepath,
                    kind = err.kind(),
                    error = %err,
                    "skipping permission"
                );
                *skipped.entry(err.kind()).or_insert(0) += 1;
            }
            Err(err) => return Err(err),
        }
    }

    Ok((ok, skipped))
}

/// Scan, parse, merge and write the policy described by `config`.
pub fn run(config: &Config) -> AppResult<GenerateReport> {
    let scanned = scanner::scan_dir(&config.source_dir, &config.extensions)?;
    let total = scanned.len();

    let (parsed, skipped) = parse_all(scanned, config.strict)?;
    let parsed_count = parsed.len();

    let docs = grouping::merge(parsed, &config.default_host);
    policy::write_policy(&config.output, &docs)?;

    Ok(GenerateReport {
        scanned: total,
        parsed: parsed_count,
        skipped,
        docs,
    })
}
