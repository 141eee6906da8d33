//! Source scanner
//!
//! Collects `@Router`, `@AuthRoles` and `@ForbiddenRoles` annotations from
//! `//` comment blocks and turns each router line into an unparsed
//! [`Permission`]. Parsing is left to the caller.

use std::fs;
use std::path::Path;

use walkdir::{DirEntry, WalkDir};

use crate::errors::{AppError, AppResult};
use crate::models::Permission;

pub const ROUTER_TAG: &str = "@Router";
pub const AUTH_ROLES_TAG: &str = "@AuthRoles";
pub const FORBIDDEN_ROLES_TAG: &str = "@ForbiddenRoles";

#[derive(Debug, Default)]
struct CommentBlock {
    routers: Vec<String>,
    auth_roles: Vec<String>,
    forbidden_roles: Vec<String>,
}

impl CommentBlock {
    fn push_line(&mut self, comment: &str) {
        if let Some(rest) = tag_value(comment, ROUTER_TAG) {
            self.routers.push(rest);
        } else if let Some(rest) = tag_value(comment, AUTH_ROLES_TAG) {
            self.auth_roles.push(rest);
        } else if let Some(rest) = tag_value(comment, FORBIDDEN_ROLES_TAG) {
            self.forbidden_roles.push(rest);
        }
    }

    fn drain_into(&mut self, pkg: &str, filepath: &str, out: &mut Vec<Permission>) {
        let block = std::mem::take(self);
        let auth = block.auth_roles.join(",");
        let forbidden = block.forbidden_roles.join(",");
        for router in block.routers {
            out.push(
                Permission::new(router, auth.as_str(), forbidden.as_str()).with_source(pkg, filepath),
            );
        }
    }
}

/// Returns the text following the first whole-word occurrence of `tag`.
fn tag_value(comment: &str, tag: &str) -> Option<String> {
    comment.match_indices(tag).find_map(|(idx, _)| {
        let before = comment[..idx].chars().next_back();
        if before.is_some_and(|c| !c.is_whitespace()) {
            return None;
        }
        let rest = &comment[idx + tag.len()..];
        match rest.chars().next() {
            None => Some(String::new()),
            Some(c) if c.is_whitespace() => Some(rest.trim().to_string()),
            Some(_) => None,
        }
    })
}

fn package_name(text: &str) -> Option<String> {
    text.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("package ")?;
        let name = rest.split_whitespace().next()?;
        Some(name.trim_end_matches(';').to_string())
    })
}

/// Extracts every annotated route in `text`.
///
/// `pkg_hint` is used when the file has no `package` declaration.
pub fn scan_source(pkg_hint: &str, filepath: &str, text: &str) -> Vec<Permission> {
    let pkg = package_name(text).unwrap_or_else(|| pkg_hint.to_string());
    let mut out = Vec::new();
    let mut block = CommentBlock::default();

    for line in text.lines() {
        match line.trim_start().strip_prefix("//") {
            Some(comment) => block.push_line(comment),
            None => block.drain_into(&pkg, filepath, &mut out),
        }
    }
    block.drain_into(&pkg, filepath, &mut out);

    out
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || name == "vendor" || name == "target"
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|ext| extensions.iter().any(|e| *e == ext))
}

/// Walks `root` in file-name order and scans every file with a matching extension.
pub fn scan_dir(root: &Path, extensions: &[String]) -> AppResult<Vec<Permission>> {
    let mut out = Vec::new();
    let mut files = 0usize;

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_skipped_dir(entry));

    for entry in walker {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(root).to_path_buf();
            let source = err
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "filesystem loop"));
            AppError::io(path, source)
        })?;

        if !entry.file_type().is_file() || !has_extension(entry.path(), extensions) {
            continue;
        }

        let path = entry.path();
        let text = fs::read_to_string(path).map_err(|err| AppError::io(path, err))?;
        let relative = path.strip_prefix(root).unwrap_or(path);
        let pkg_hint = relative
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let found = scan_source(&pkg_hint, &relative.to_string_lossy(), &text);
        tracing::debug!(file = %relative.display(), routes = found.len(), "scanned file");
        out.extend(found);
        files += 1;
    }

    tracing::info!(root = %root.display(), files, routes = out.len(), "scan complete");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HANDLER: &str = r#"package admin

// ListUsers godoc
// @Summary      List users
// @Router       /admin/users [get]
// @AuthRoles    admin, editor
// @ForbiddenRoles banned
func ListUsers(c *gin.Context) {}

// @Router /admin/users/{id} [delete]
func DeleteUser(c *gin.Context) {}
"#;

    #[test]
    fn collects_one_permission_per_router_line() {
        let perms = scan_source("fallback", "admin/users.go", HANDLER);
        assert_eq!(perms.len(), 2);

        assert_eq!(perms[0].raw_router_line, "/admin/users [get]");
        assert_eq!(perms[0].raw_auth_roles_line, "admin, editor");
        assert_eq!(perms[0].raw_forbidden_roles_line, "banned");
        assert_eq!(perms[0].pkg, "admin");
        assert_eq!(perms[0].filepath, "admin/users.go");

        assert_eq!(perms[1].raw_router_line, "/admin/users/{id} [delete]");
        assert_eq!(perms[1].raw_auth_roles_line, "");
        assert_eq!(perms[1].raw_forbidden_roles_line, "");
    }

    #[test]
    fn roles_are_scoped_to_their_block() {
        let text = "// @AuthRoles admin\nfunc a() {}\n// @Router /b [post]\n";
        let perms = scan_source("pkg", "b.go", text);
        assert_eq!(perms.len(), 1);
        assert_eq!(perms[0].raw_auth_roles_line, "");
        assert_eq!(perms[0].pkg, "pkg");
    }

    #[test]
    fn multiple_routers_share_roles() {
        let text = "// @Router /a [get]\n// @Router /a [post]\n// @AuthRoles ops\n// @AuthRoles dev\n";
        let perms = scan_source("p", "a.go", text);
        assert_eq!(perms.len(), 2);
        assert!(perms.iter().all(|p| p.raw_auth_roles_line == "ops,dev"));
    }

    #[test]
    fn tag_must_be_whole_word() {
        assert_eq!(tag_value(" @RouterX /a [get]", ROUTER_TAG), None);
        assert_eq!(tag_value(" @Router", ROUTER_TAG), Some(String::new()));
        assert_eq!(tag_value(" x@Router /a [get]", ROUTER_TAG), None);
    }

    #[test]
    fn tag_found_after_longer_tag_on_same_line() {
        assert_eq!(
            tag_value(" @RouterGroup x @Router /a [get]", ROUTER_TAG),
            Some("/a [get]".to_string())
        );

        let perms = scan_source("p", "a.go", "// @RouterGroup x @Router /a [get]\n");
        assert_eq!(perms.len(), 1);
        assert_eq!(perms[0].raw_router_line, "/a [get]");
    }
}
