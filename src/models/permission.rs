use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};

use crate::errors::{AppError, AppResult};
use crate::utils::unique_strings;

/// Role written into `authorized_roles` when the annotation names none.
pub const ANY_ROLE: &str = "*";

// =============================================================================
// PERMISSION DOCUMENT
// =============================================================================

/// One access rule as it appears in the generated policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDoc {
    pub id: i64,
    /// Host pattern, `*` once the merge stage has filled the default
    pub host: String,
    /// Route pattern with every path parameter collapsed to `*`
    pub path: String,
    /// Brace-wrapped method set, e.g. `{GET,POST}`
    pub method: String,
    #[serde(default)]
    pub authorized_roles: Vec<String>,
    #[serde(default)]
    pub forbidden_roles: Vec<String>,
    #[serde(default)]
    pub allow_anyone: bool,

    /// Working list, only meaningful while methods are being merged
    #[serde(skip)]
    pub methods: Vec<String>,
    /// `+acc_roles-deny_roles`
    #[serde(skip)]
    pub perm_key: String,
    #[serde(skip)]
    pub frags: Vec<String>,
    /// 0 whenever the key differs from the previous record's
    #[serde(skip)]
    pub same_frag_count_with_last: usize,
}

impl PermissionDoc {
    /// Splits `method` into its tokens, tolerating a missing brace on either side.
    pub fn get_methods_from_method_str(&self) -> Vec<String> {
        let s = self.method.strip_prefix('{').unwrap_or(&self.method);
        let s = s.strip_suffix('}').unwrap_or(s);
        s.split(',').map(String::from).collect()
    }

    pub fn set_method_from_methods(&mut self) {
        self.methods = unique_strings(std::mem::take(&mut self.methods), false);
        self.method = format!("{{{}}}", self.methods.join(","));
    }
}

// =============================================================================
// PERMISSION (parse-time record)
// =============================================================================

/// A permission together with the annotation text it was parsed from.
///
/// Serializes as its [`PermissionDoc`] only; provenance never reaches the policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Permission {
    pub doc: PermissionDoc,
    pub pkg: String,
    pub filepath: String,
    pub raw_router_line: String,
    pub raw_auth_roles_line: String,
    pub raw_forbidden_roles_line: String,
    pub tags: Vec<String>,
}

impl Permission {
    pub fn new(
        raw_router_line: impl Into<String>,
        raw_auth_roles_line: impl Into<String>,
        raw_forbidden_roles_line: impl Into<String>,
    ) -> Self {
        Self {
            raw_router_line: raw_router_line.into(),
            raw_auth_roles_line: raw_auth_roles_line.into(),
            raw_forbidden_roles_line: raw_forbidden_roles_line.into(),
            ..Self::default()
        }
    }

    pub fn with_source(mut self, pkg: impl Into<String>, filepath: impl Into<String>) -> Self {
        self.pkg = pkg.into();
        self.filepath = filepath.into();
        self
    }

    /// Fills path, method and both role lists from the raw annotation lines.
    ///
    /// Roles are only parsed once the router line has been accepted. The
    /// method is left as the bare upper-case token; the merge stage wraps it.
    pub fn parse(&mut self) -> AppResult<()> {
        if self.raw_router_line.trim().is_empty() {
            tracing::warn!(
                pkg = %self.pkg,
                filepath = %self.filepath,
                "empty permission raw router line"
            );
            return Err(AppError::EmptyRouterLine);
        }

        self.parse_router_line()?;

        self.doc.authorized_roles = parse_roles_line(&self.raw_auth_roles_line, ANY_ROLE);
        self.doc.forbidden_roles = parse_roles_line(&self.raw_forbidden_roles_line, "");

        Ok(())
    }

    fn parse_router_line(&mut self) -> AppResult<()> {
        let caps = router_pattern()
            .captures(&self.raw_router_line)
            .ok_or_else(|| AppError::unparsable_router_line(self.raw_router_line.as_str()))?;

        let (path, method) = match (caps.get(1), caps.get(2)) {
            (Some(path), Some(method)) => (path.as_str(), method.as_str()),
            _ => return Err(AppError::unparsable_router_line(self.raw_router_line.as_str())),
        };

        self.doc.path = path_param_pattern().replace_all(path, "*").into_owned();
        self.doc.method = method.to_uppercase();

        Ok(())
    }

    pub fn get_methods_from_method_str(&self) -> Vec<String> {
        self.doc.get_methods_from_method_str()
    }

    pub fn set_method_from_methods(&mut self) {
        self.doc.set_method_from_methods();
    }

    /// Document-only view of this record.
    pub fn to_doc(&self) -> PermissionDoc {
        self.doc.clone()
    }
}

impl From<Permission> for PermissionDoc {
    fn from(permission: Permission) -> Self {
        permission.doc
    }
}

impl Serialize for Permission {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.doc.serialize(serializer)
    }
}

// @Router       /admin/users [get]
fn router_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(/[0-9A-Za-z_./\-{}+:$]*)[[:blank:]]+\[([0-9A-Za-z_]+)\]")
            .expect("router pattern is valid")
    })
}

fn path_param_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{[^{]*\}").expect("path param pattern is valid"))
}

/// Splits a comma separated role line, dropping blank entries.
///
/// Falls back to `[default]` when nothing remains and `default` is non-empty.
pub fn parse_roles_line(line: &str, default: &str) -> Vec<String> {
    let mut roles: Vec<String> = line
        .split(',')
        .map(str::trim)
        .filter(|role| !role.is_empty())
        .map(String::from)
        .collect();

    if roles.is_empty() && !default.is_empty() {
        roles.push(default.to_string());
    }
    roles
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn empty_router_line_emits_warning() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .finish();

        let err = tracing::subscriber::with_default(subscriber, || {
            Permission::new("", "admin", "").parse().unwrap_err()
        });

        assert!(matches!(err, AppError::EmptyRouterLine));
        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("empty permission raw router line"), "logs: {output}");
    }

    #[test]
    fn roles_line_trims_and_drops_blanks() {
        assert_eq!(parse_roles_line("admin,, editor ", ANY_ROLE), vec!["admin", "editor"]);
        assert_eq!(parse_roles_line(" admin, editor ,", ""), vec!["admin", "editor"]);
    }

    #[test]
    fn roles_line_defaults() {
        assert_eq!(parse_roles_line("", ANY_ROLE), vec!["*"]);
        assert_eq!(parse_roles_line(" , ,", ANY_ROLE), vec!["*"]);
        assert!(parse_roles_line("", "").is_empty());
    }

    #[test]
    fn roles_line_keeps_duplicates_and_order() {
        assert_eq!(parse_roles_line("b,a,b", ""), vec!["b", "a", "b"]);
    }

    #[test]
    fn methods_from_method_str_variants() {
        let mut doc = PermissionDoc::default();

        doc.method = "{GET,POST}".into();
        assert_eq!(doc.get_methods_from_method_str(), vec!["GET", "POST"]);

        doc.method = "GET".into();
        assert_eq!(doc.get_methods_from_method_str(), vec!["GET"]);

        doc.method = "{}".into();
        assert_eq!(doc.get_methods_from_method_str(), vec![""]);
    }

    #[test]
    fn set_method_is_idempotent() {
        let mut doc = PermissionDoc {
            methods: vec!["GET".into(), "get".into(), "POST".into(), "GET".into()],
            ..PermissionDoc::default()
        };

        doc.set_method_from_methods();
        let first = doc.method.clone();
        doc.set_method_from_methods();

        assert_eq!(first, "{GET,get,POST}");
        assert_eq!(doc.method, first);
        assert_eq!(doc.methods, vec!["GET", "get", "POST"]);
    }

    #[test]
    fn path_params_collapse_to_wildcard() {
        let replaced = path_param_pattern().replace_all("/a/{x}/b/{y}{z}", "*");
        assert_eq!(replaced, "/a/*/b/**");
    }
}
