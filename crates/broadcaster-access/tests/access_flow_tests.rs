//! End-to-end tests for role management and binding reconciliation.
//!
//! These tests drive the access service over the in-memory store and over a
//! store wrapper that can fail binding writes, and check the resulting
//! bindings and permission decisions.
//!
//! Flows:
//! 1. Inherited grant, then a local denial on the child
//! 2. Bindings moving from {a, b} to {b, c}
//! 3. Storage failures surfacing unchanged
//! 4. Strict configuration for missing roles and dangling bindings
//! 5. Cyclic parent links

#![cfg(feature = "memory")]

use async_trait::async_trait;
use broadcaster_access::{
    AccessConfig, AccessService, BindingStore, DanglingBindingPolicy, MemoryStore,
    MissingRolePolicy, RoleModification, RoleRef, RoleStore, UserRef, UserStore,
};
use broadcaster_rbac::{RbacError, RbacResult, Role, RoleId, User, UserId};
use std::collections::BTreeSet;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Wraps a memory store and can reject binding writes.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_inserts: AtomicBool,
    delete_calls: AtomicUsize,
    insert_calls: AtomicUsize,
}

#[async_trait]
impl RoleStore for FlakyStore {
    async fn load_role(&self, role: &RoleRef) -> RbacResult<Role> {
        self.inner.load_role(role).await
    }

    async fn load_roles_by_name(&self, names: &[String]) -> RbacResult<Vec<Role>> {
        self.inner.load_roles_by_name(names).await
    }

    async fn list_roles(&self) -> RbacResult<Vec<Role>> {
        self.inner.list_roles().await
    }

    async fn save_role(&self, role: &Role) -> RbacResult<()> {
        self.inner.save_role(role).await
    }

    async fn delete_role(&self, id: RoleId) -> RbacResult<()> {
        self.inner.delete_role(id).await
    }
}

#[async_trait]
impl UserStore for FlakyStore {
    async fn load_user(&self, user: &UserRef) -> RbacResult<User> {
        self.inner.load_user(user).await
    }

    async fn save_user(&self, user: &User) -> RbacResult<()> {
        self.inner.save_user(user).await
    }

    async fn delete_user(&self, id: UserId) -> RbacResult<()> {
        self.inner.delete_user(id).await
    }
}

#[async_trait]
impl BindingStore for FlakyStore {
    async fn load_user_bindings(&self, user_id: UserId) -> RbacResult<BTreeSet<RoleId>> {
        self.inner.load_user_bindings(user_id).await
    }

    async fn delete_bindings(&self, user_id: UserId, role_ids: &BTreeSet<RoleId>) -> RbacResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_bindings(user_id, role_ids).await
    }

    async fn insert_bindings(&self, user_id: UserId, role_ids: &BTreeSet<RoleId>) -> RbacResult<()> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts.load(Ordering::SeqCst) {
            let cause = io::Error::new(io::ErrorKind::BrokenPipe, "connection lost");
            return Err(RbacError::persistence_with("insert bindings", cause));
        }
        self.inner.insert_bindings(user_id, role_ids).await
    }
}

/// Test fixture holding a service and the store behind it.
struct TestFixture {
    store: Arc<FlakyStore>,
    service: AccessService,
}

impl TestFixture {
    fn new() -> Self {
        Self::with(FlakyStore::default(), AccessConfig::default())
    }

    fn with(store: FlakyStore, config: AccessConfig) -> Self {
        let store = Arc::new(store);
        let service = AccessService::with_store(store.clone(), config);
        Self { store, service }
    }

    async fn role(&self, name: &str, grants: &[&str], parents: &[&str]) -> Role {
        self.service
            .create_role(name, &strings(grants), &strings(parents))
            .await
            .expect("role should be created")
    }

    async fn bound_ids(&self, username: &str) -> BTreeSet<RoleId> {
        let user = self
            .store
            .load_user(&UserRef::from(username))
            .await
            .expect("user should exist");
        self.store.load_user_bindings(user.id).await.unwrap()
    }

    fn calls(&self) -> (usize, usize) {
        (
            self.store.delete_calls.load(Ordering::SeqCst),
            self.store.insert_calls.load(Ordering::SeqCst),
        )
    }
}

fn strings(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_inherited_grant_and_local_override() {
    let fx = TestFixture::new();
    fx.role("admin", &["manage"], &[]).await;
    fx.role("editor", &[], &["admin"]).await;
    fx.service
        .create_user("erin", &strings(&["editor"]))
        .await
        .unwrap();

    let access = fx.service.load_user("erin".into()).await.unwrap();
    assert!(access.has_permit("manage"));

    fx.service
        .modify_role("editor".into(), RoleModification::Revoke("manage".into()))
        .await
        .unwrap();

    let access = fx.service.load_user("erin".into()).await.unwrap();
    assert!(!access.has_permit("manage"));
    assert!(access.any_deny("manage"));

    let admin = access.graph.get_by_name("admin").unwrap();
    assert!(access.graph.resolver().permit(admin, "manage"));
}

#[tokio::test]
async fn test_bindings_follow_desired_set() {
    let fx = TestFixture::new();
    let a = fx.role("a", &[], &[]).await;
    let b = fx.role("b", &[], &[]).await;
    let c = fx.role("c", &[], &[]).await;
    fx.service
        .create_user("uma", &strings(&["a", "b"]))
        .await
        .unwrap();
    assert_eq!(fx.bound_ids("uma").await, BTreeSet::from([a.id, b.id]));

    let mut access = fx.service.load_user("uma".into()).await.unwrap();
    access.user.remove_role(&a);
    access.user.add_role(&c);
    let changes = fx.service.save_user(&access.user).await.unwrap();

    assert_eq!(changes.to_delete, BTreeSet::from([a.id]));
    assert_eq!(changes.to_insert, BTreeSet::from([c.id]));
    assert_eq!(fx.bound_ids("uma").await, BTreeSet::from([b.id, c.id]));
}

#[tokio::test]
async fn test_repeat_save_touches_no_bindings() {
    let fx = TestFixture::new();
    fx.role("a", &[], &[]).await;
    let user = fx
        .service
        .create_user("rae", &strings(&["a"]))
        .await
        .unwrap();
    let before = fx.calls();

    let changes = fx.service.save_user(&user).await.unwrap();
    assert!(changes.is_empty());
    assert_eq!(fx.calls(), before);
}

#[tokio::test]
async fn test_insert_failure_surfaces_unchanged() {
    let fx = TestFixture::new();
    fx.role("a", &[], &[]).await;
    fx.role("b", &[], &[]).await;
    fx.service
        .create_user("ivy", &strings(&["a"]))
        .await
        .unwrap();
    fx.store.fail_inserts.store(true, Ordering::SeqCst);

    let err = fx
        .service
        .add_role_to_user("ivy".into(), "b".into())
        .await
        .unwrap_err();

    match err {
        RbacError::Persistence { ref source, .. } => {
            let cause = source.as_ref().expect("cause should be preserved");
            assert_eq!(cause.to_string(), "connection lost");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // No retry: exactly one insert attempt for the failed call
    let (_, inserts) = fx.calls();
    assert_eq!(inserts, 2);
}

#[tokio::test]
async fn test_delete_user_runs_single_bulk_delete() {
    let fx = TestFixture::new();
    fx.role("a", &[], &[]).await;
    fx.role("b", &[], &[]).await;
    let user = fx
        .service
        .create_user("dan", &strings(&["a", "b"]))
        .await
        .unwrap();

    fx.service.delete_user(UserRef::Id(user.id)).await.unwrap();

    let (deletes, _) = fx.calls();
    assert_eq!(deletes, 1);
    assert!(fx.store.load_user_bindings(user.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_strict_missing_role_policy() {
    let fx = TestFixture::with(FlakyStore::default(), AccessConfig::strict());
    fx.role("a", &[], &[]).await;

    let err = fx
        .service
        .create_user("zed", &strings(&["a", "ghost"]))
        .await
        .unwrap_err();
    assert!(matches!(err, RbacError::NotFound { kind: "role", .. }));
    assert_eq!(fx.calls(), (0, 0));
    assert!(fx.store.load_user(&UserRef::from("zed")).await.is_err());

    let lenient = AccessService::with_store(
        fx.store.clone(),
        AccessConfig {
            missing_role_policy: MissingRolePolicy::Omit,
            ..AccessConfig::strict()
        },
    );
    let user = lenient
        .create_user("zed", &strings(&["a", "ghost"]))
        .await
        .unwrap();
    assert_eq!(user.role_names(), vec!["a"]);
}

#[tokio::test]
async fn test_dangling_binding_policy() {
    let fx = TestFixture::with(
        FlakyStore::default(),
        AccessConfig {
            dangling_bindings: DanglingBindingPolicy::Fail,
            ..Default::default()
        },
    );
    fx.role("a", &[], &[]).await;
    let user = fx
        .service
        .create_user("gus", &strings(&["a"]))
        .await
        .unwrap();

    // A binding row left behind by an out-of-band role removal
    let ghost = RoleId::new();
    fx.store
        .insert_bindings(user.id, &BTreeSet::from([ghost]))
        .await
        .unwrap();

    let err = fx.service.load_user("gus".into()).await.unwrap_err();
    assert!(matches!(err, RbacError::NotFound { kind: "role", .. }));

    let lenient = AccessService::with_store(fx.store.clone(), AccessConfig::default());
    let access = lenient.load_user("gus".into()).await.unwrap();
    assert_eq!(access.user.role_names(), vec!["a"]);
}

#[tokio::test]
async fn test_cyclic_parents_resolve_to_not_permitted() {
    let fx = TestFixture::new();
    fx.role("a", &[], &[]).await;
    fx.role("b", &[], &["a"]).await;
    fx.role("c", &["stream"], &["b"]).await;
    fx.service.add_parent("a".into(), "c".into()).await.unwrap();
    fx.service
        .modify_role("c".into(), RoleModification::Remove("stream".into()))
        .await
        .unwrap();
    fx.service
        .create_user("cy", &strings(&["a"]))
        .await
        .unwrap();

    let access = fx.service.load_user("cy".into()).await.unwrap();
    assert_eq!(access.graph.len(), 3);
    assert!(!access.has_permit("stream"));
    assert!(!access.all_permit("stream"));
}
