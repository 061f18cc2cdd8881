//! # Broadcaster RBAC (Role-Based Access Control)
//!
//! This crate provides the permission model for the broadcaster media
//! library: hierarchical roles with tri-state permissions, and users bound
//! to those roles.
//!
//! ## Overview
//!
//! The broadcaster-rbac crate handles:
//! - **Permission Sets**: Per-role explicit grants and denials
//! - **Roles**: Named nodes with parent roles referenced by id
//! - **Role Graph**: An arena of roles with cycle-safe resolution
//! - **Users**: Role snapshots with aggregate permission queries
//!
//! Everything here is pure and synchronous. Storage, binding
//! reconciliation and logging live in `broadcaster-access`.
//!
//! ## Architecture
//!
//! ```text
//! User ── roles (snapshot) ──┐
//!                            ▼
//! RoleGraph { RoleId → Role { permissions, parents: [RoleId] } }
//!                            │
//!                            ▼
//! PermissionResolver::permit(role, perm)
//!   explicit local state wins, else OR over parents
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use broadcaster_rbac::{Role, RoleGraph, User};
//!
//! let mut admin = Role::new("admin", []);
//! admin.assign("manage").unwrap();
//!
//! let mut editor = Role::new("editor", [admin.id]);
//! assert!(RoleGraph::from_roles([admin.clone(), editor.clone()])
//!     .resolver()
//!     .permit(&editor, "manage"));
//!
//! // Silence the inherited grant on the child only
//! editor.revoke("manage").unwrap();
//! let graph = RoleGraph::from_roles([admin.clone(), editor.clone()]);
//! assert!(!graph.resolver().permit(&editor, "manage"));
//! assert!(graph.resolver().permit(&admin, "manage"));
//!
//! let mut user = User::new("alice").unwrap();
//! user.add_role(&editor);
//! assert!(!user.has_permit(&graph, "manage"));
//! assert!(user.any_deny("manage"));
//! ```
//!
//! ## Decision Rules
//!
//! - Reads never fail; unknown roles and permissions resolve to `false`
//! - `deny` only looks at the role itself, never its ancestors
//! - Cycles in the parent graph end the branch as "not permitted"

pub mod error;
pub mod graph;
pub mod permissions;
pub mod roles;
pub mod users;

// Re-export main types for convenience
pub use error::{BoxError, RbacError, RbacResult};
pub use graph::{PermissionResolver, RoleGraph};
pub use permissions::{PermissionSet, PermissionState};
pub use roles::{Role, RoleId};
pub use users::{User, UserId};
