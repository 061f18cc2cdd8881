//! # Broadcaster Access
//!
//! This crate connects the broadcaster permission model to storage.
//!
//! ## Overview
//!
//! The broadcaster-access crate handles:
//! - **Persistence contract**: `RoleStore`, `UserStore` and `BindingStore`
//! - **Reconciliation**: Minimal insert/delete sets for user ↔ role bindings
//! - **Access service**: Role and user operations that reconcile bindings
//!   explicitly after every user save or delete
//! - **Memory backend**: An in-memory store for tests and tools
//! - **Configuration**: Missing-role and dangling-binding policies
//!
//! ## Architecture
//!
//! ```text
//! AccessService
//!   ├─ RoleStore ──────→ roles (unique names, parent ids)
//!   ├─ UserStore ──────→ user rows
//!   └─ BindingStore ───→ (user_id, role_id) rows
//!         ▲
//!         └─ AssociationReconciler: delete P \ D, then insert D \ P
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use broadcaster_access::{AccessConfig, AccessService, MemoryStore};
//!
//! # async fn run() -> broadcaster_rbac::RbacResult<()> {
//! let config = AccessConfig::from_env().unwrap_or_default();
//! let store = Arc::new(MemoryStore::with_policy(config.missing_role_policy));
//! let service = AccessService::with_store(store, config);
//!
//! service.create_role("admin", &["manage".into()], &[]).await?;
//! service.create_role("editor", &[], &["admin".into()]).await?;
//! service.create_user("alice", &["editor".into()]).await?;
//!
//! let access = service.load_user("alice".into()).await?;
//! assert!(access.has_permit("manage"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `memory` (default): In-memory store backend

pub mod config;
pub mod membership;
#[cfg(feature = "memory")]
pub mod memory;
pub mod reconcile;
pub mod service;
pub mod store;

// Re-export main types for convenience
pub use config::{AccessConfig, ConfigError, DanglingBindingPolicy, MissingRolePolicy};
pub use membership::UserRoleBinding;
#[cfg(feature = "memory")]
pub use memory::MemoryStore;
pub use reconcile::{AssociationReconciler, ChangeSet};
pub use service::{AccessService, RoleDescription, RoleModification, UserAccess};
pub use store::{BindingStore, RoleRef, RoleStore, UserRef, UserStore};
