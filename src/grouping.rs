//! Grouping and merge stage
//!
//! Runs over parsed permissions in scan order. Records sharing host, path and
//! role signature collapse into a single document whose method set is the
//! union of theirs.
//!
//! `perm_key`, `frags` and `same_frag_count_with_last` are filled for later
//! consumers of the records; merging itself only looks at the exact
//! `(host, path, perm_key)` triple.

use std::collections::HashMap;

use crate::models::{Permission, PermissionDoc};
use crate::utils::unique_strings;

fn role_signature(roles: &[String]) -> String {
    let mut roles = unique_strings(roles.to_vec(), false);
    roles.sort();
    roles.join(",")
}

/// `+acc_roles-deny_roles`, insensitive to role order and repetition.
pub fn perm_key(doc: &PermissionDoc) -> String {
    format!(
        "+{}-{}",
        role_signature(&doc.authorized_roles),
        role_signature(&doc.forbidden_roles)
    )
}

pub fn frags(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|frag| !frag.is_empty())
        .map(String::from)
        .collect()
}

fn shared_prefix_len(a: &[String], b: &[String]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Fills the fragment fields of every record, comparing each one with its predecessor.
pub fn assign_fragments(perms: &mut [Permission]) {
    let mut last: Option<(String, Vec<String>)> = None;

    for perm in perms.iter_mut() {
        let doc = &mut perm.doc;
        doc.perm_key = perm_key(doc);
        doc.frags = frags(&doc.path);
        doc.same_frag_count_with_last = match &last {
            Some((key, last_frags)) if *key == doc.perm_key => shared_prefix_len(last_frags, &doc.frags),
            _ => 0,
        };
        last = Some((doc.perm_key.clone(), doc.frags.clone()));
    }
}

/// Merges parsed permissions into policy documents, numbered from 1.
///
/// Every returned document carries the brace-wrapped method form.
pub fn merge(mut perms: Vec<Permission>, default_host: &str) -> Vec<PermissionDoc> {
    assign_fragments(&mut perms);

    let mut merged: Vec<PermissionDoc> = Vec::new();
    let mut index: HashMap<(String, String, String), usize> = HashMap::new();

    for perm in perms {
        let mut doc = PermissionDoc::from(perm);
        if doc.host.is_empty() {
            doc.host = default_host.to_string();
        }

        let key = (doc.host.clone(), doc.path.clone(), doc.perm_key.clone());
        match index.get(&key) {
            Some(&pos) => {
                let target = &mut merged[pos];
                let incoming = doc.get_methods_from_method_str();
                target.methods.extend(incoming);
                target.set_method_from_methods();
                target.allow_anyone |= doc.allow_anyone;
                tracing::debug!(path = %target.path, method = %target.method, "merged permission");
            }
            None => {
                doc.methods = doc.get_methods_from_method_str();
                doc.set_method_from_methods();
                index.insert(key, merged.len());
                merged.push(doc);
            }
        }
    }

    for (i, doc) in merged.iter_mut().enumerate() {
        doc.id = i as i64 + 1;
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(router: &str, auth: &str, forbidden: &str) -> Permission {
        let mut perm = Permission::new(router, auth, forbidden);
        perm.parse().unwrap();
        perm
    }

    #[test]
    fn perm_key_ignores_role_order() {
        let a = parsed("/a [get]", "editor,admin", "banned");
        let b = parsed("/a [get]", "admin, editor, admin", "banned");
        assert_eq!(perm_key(&a.doc), "+admin,editor-banned");
        assert_eq!(perm_key(&a.doc), perm_key(&b.doc));
    }

    #[test]
    fn frags_drop_empty_segments() {
        assert_eq!(frags("/admin//users/*/"), vec!["admin", "users", "*"]);
        assert!(frags("/").is_empty());
    }

    #[test]
    fn same_frag_count_resets_on_key_change() {
        let mut perms = vec![
            parsed("/admin/users [get]", "admin", ""),
            parsed("/admin/users/{id} [get]", "admin", ""),
            parsed("/admin/roles [get]", "admin", ""),
            parsed("/admin/roles/{id} [get]", "ops", ""),
        ];
        assign_fragments(&mut perms);

        let counts: Vec<usize> = perms.iter().map(|p| p.doc.same_frag_count_with_last).collect();
        assert_eq!(counts, vec![0, 2, 1, 0]);
        assert_eq!(perms[1].doc.frags, vec!["admin", "users", "*"]);
    }

    #[test]
    fn merge_unions_methods_for_same_route_and_roles() {
        let perms = vec![
            parsed("/admin/users [get]", "admin", ""),
            parsed("/admin/users [post]", "admin", ""),
            parsed("/admin/users [get]", "admin", ""),
            parsed("/admin/users [delete]", "root", ""),
        ];
        let docs = merge(perms, "*");

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, 1);
        assert_eq!(docs[0].host, "*");
        assert_eq!(docs[0].method, "{GET,POST}");
        assert_eq!(docs[1].id, 2);
        assert_eq!(docs[1].method, "{DELETE}");
        assert_eq!(docs[1].authorized_roles, vec!["root"]);
    }

    #[test]
    fn merge_keeps_explicit_host() {
        let mut perm = parsed("/a [get]", "", "");
        perm.doc.host = "api.example.com".into();
        let docs = merge(vec![perm], "*");
        assert_eq!(docs[0].host, "api.example.com");
    }
}
