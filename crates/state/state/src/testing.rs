use std::collections::BTreeSet;

use canopy_core::{ProjectId, QuotaResource, UNLIMITED, UserId};

use crate::error::StateError;
use crate::store::QuotaStore;

fn project(id: &str) -> ProjectId {
    ProjectId::from(format!("conformance-{id}"))
}

/// Run the full quota store conformance test suite.
///
/// Call this from your backend's test module with a fresh store instance.
///
/// # Errors
///
/// Returns an error if any conformance test fails.
pub async fn run_store_conformance_tests(store: &dyn QuotaStore) -> Result<(), StateError> {
    test_defaults_apply_without_rows(store).await?;
    test_create_then_duplicate(store).await?;
    test_update_missing(store).await?;
    test_update_existing(store).await?;
    test_user_inherits_project_limit(store).await?;
    test_destroy_user_rows(store).await?;
    test_update_allocated(store).await?;
    test_record_usage(store).await?;
    test_settable_ranges(store).await?;
    Ok(())
}

async fn test_defaults_apply_without_rows(store: &dyn QuotaStore) -> Result<(), StateError> {
    let defaults = store.get_defaults().await?;
    assert_eq!(defaults.len(), QuotaResource::ALL.len());

    let quotas = store.get_project_quotas(&project("fresh")).await?;
    for resource in QuotaResource::ALL {
        let quota = quotas[&resource];
        assert_eq!(quota.limit, defaults[&resource], "{resource} should use default");
        assert_eq!(quota.in_use, 0);
        assert_eq!(quota.allocated, 0);
    }
    Ok(())
}

async fn test_create_then_duplicate(store: &dyn QuotaStore) -> Result<(), StateError> {
    let p = project("create");
    store.create_limit(&p, QuotaResource::Cores, 7, None).await?;
    let second = store.create_limit(&p, QuotaResource::Cores, 9, None).await;
    assert!(
        matches!(second, Err(StateError::QuotaExists(_))),
        "second create should report QuotaExists"
    );
    let quotas = store.get_project_quotas(&p).await?;
    assert_eq!(quotas[&QuotaResource::Cores].limit, 7, "original value should remain");
    Ok(())
}

async fn test_update_missing(store: &dyn QuotaStore) -> Result<(), StateError> {
    let result = store
        .update_limit(&project("missing"), QuotaResource::Ram, 1, None)
        .await;
    assert!(
        matches!(result, Err(StateError::NotFound(_))),
        "update on missing row should report NotFound"
    );
    Ok(())
}

async fn test_update_existing(store: &dyn QuotaStore) -> Result<(), StateError> {
    let p = project("update");
    store.create_limit(&p, QuotaResource::Ram, 1024, None).await?;
    store.update_limit(&p, QuotaResource::Ram, UNLIMITED, None).await?;
    let quotas = store.get_project_quotas(&p).await?;
    assert_eq!(quotas[&QuotaResource::Ram].limit, UNLIMITED);

    let rows = store.list_limits(&p).await?;
    assert_eq!(rows.len(), 1);
    assert!(rows[0].updated_at >= rows[0].created_at);
    Ok(())
}

async fn test_user_inherits_project_limit(store: &dyn QuotaStore) -> Result<(), StateError> {
    let p = project("inherit");
    let alice = UserId::from("alice");
    store.create_limit(&p, QuotaResource::Instances, 40, None).await?;

    let user = store.get_user_quotas(&p, &alice).await?;
    assert_eq!(user[&QuotaResource::Instances].limit, 40);

    store
        .create_limit(&p, QuotaResource::Instances, 5, Some(&alice))
        .await?;
    let user = store.get_user_quotas(&p, &alice).await?;
    assert_eq!(user[&QuotaResource::Instances].limit, 5);
    let project_view = store.get_project_quotas(&p).await?;
    assert_eq!(project_view[&QuotaResource::Instances].limit, 40);
    Ok(())
}

async fn test_destroy_user_rows(store: &dyn QuotaStore) -> Result<(), StateError> {
    let p = project("destroy");
    let bob = UserId::from("bob");
    store.create_limit(&p, QuotaResource::Cores, 8, None).await?;
    store.create_limit(&p, QuotaResource::Cores, 2, Some(&bob)).await?;
    store.create_limit(&p, QuotaResource::Ram, 64, Some(&bob)).await?;

    let removed = store.destroy_all_by_project_and_user(&p, &bob).await?;
    assert_eq!(removed, 2);
    let rows = store.list_limits(&p).await?;
    assert_eq!(rows.len(), 1, "project row should survive");
    assert!(rows[0].is_project_scope());

    let removed = store.destroy_all_by_project_and_user(&p, &bob).await?;
    assert_eq!(removed, 0);
    Ok(())
}

async fn test_update_allocated(store: &dyn QuotaStore) -> Result<(), StateError> {
    let parent = project("alloc-parent");
    let a = project("alloc-a");
    let b = project("alloc-b");
    let c = project("alloc-c");
    store.create_limit(&parent, QuotaResource::Cores, 100, None).await?;
    store.create_limit(&a, QuotaResource::Cores, 30, None).await?;
    store.create_limit(&b, QuotaResource::Cores, 20, None).await?;
    store.create_limit(&c, QuotaResource::Cores, UNLIMITED, None).await?;
    store
        .create_limit(&a, QuotaResource::Cores, 99, Some(&UserId::from("u")))
        .await?;

    let children: BTreeSet<ProjectId> = [a.clone(), b.clone(), c].into_iter().collect();
    store.update_allocated(&parent, &children).await?;
    let quotas = store.get_project_quotas(&parent).await?;
    assert_eq!(
        quotas[&QuotaResource::Cores].allocated,
        50,
        "unlimited and per-user rows must not count"
    );
    assert_eq!(quotas[&QuotaResource::Ram].allocated, 0);

    store.update_limit(&b, QuotaResource::Cores, 0, None).await?;
    store.update_allocated(&parent, &children).await?;
    let quotas = store.get_project_quotas(&parent).await?;
    assert_eq!(quotas[&QuotaResource::Cores].allocated, 30);
    Ok(())
}

async fn test_record_usage(store: &dyn QuotaStore) -> Result<(), StateError> {
    let p = project("usage");
    let carol = UserId::from("carol");
    store
        .record_usage(&p, Some(&carol), QuotaResource::Instances, 3, 1)
        .await?;
    store
        .record_usage(&p, None, QuotaResource::Instances, 2, 0)
        .await?;

    let user = store.get_user_quotas(&p, &carol).await?;
    assert_eq!(user[&QuotaResource::Instances].in_use, 3);
    assert_eq!(user[&QuotaResource::Instances].reserved, 1);

    let project_view = store.get_project_quotas(&p).await?;
    assert_eq!(project_view[&QuotaResource::Instances].in_use, 5);
    assert_eq!(project_view[&QuotaResource::Instances].reserved, 1);
    Ok(())
}

async fn test_settable_ranges(store: &dyn QuotaStore) -> Result<(), StateError> {
    let parent = project("range-parent");
    let child = project("range-child");
    let sibling = project("range-sibling");
    store.create_limit(&parent, QuotaResource::Cores, 100, None).await?;
    store.create_limit(&child, QuotaResource::Cores, 20, None).await?;
    store.create_limit(&sibling, QuotaResource::Cores, 30, None).await?;
    store
        .record_usage(&child, None, QuotaResource::Cores, 4, 2)
        .await?;
    let children: BTreeSet<ProjectId> = [child.clone(), sibling].into_iter().collect();
    store.update_allocated(&parent, &children).await?;

    let root = store.get_settable_quotas(&parent, None, None).await?;
    assert_eq!(root[&QuotaResource::Cores].maximum, UNLIMITED);
    // The parent may not drop below what its children hold.
    assert_eq!(root[&QuotaResource::Cores].minimum, 50);

    let ranges = store.get_settable_quotas(&child, Some(&parent), None).await?;
    let cores = ranges[&QuotaResource::Cores];
    assert_eq!(cores.minimum, 6);
    assert_eq!(cores.maximum, 70);

    let user = UserId::from("dave");
    let ranges = store
        .get_settable_quotas(&child, Some(&parent), Some(&user))
        .await?;
    assert_eq!(ranges[&QuotaResource::Cores].maximum, 20);
    Ok(())
}
