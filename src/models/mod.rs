pub mod permission;

pub use permission::{parse_roles_line, Permission, PermissionDoc, ANY_ROLE};
