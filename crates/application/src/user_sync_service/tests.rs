use std::sync::Arc;

use orgsync_core::AppError;
use tokio_util::sync::CancellationToken;

use crate::UserSyncService;
use crate::test_support::{FakeDashboardService, SERVICE_LOGIN, source_user};

fn service(dashboard: &FakeDashboardService) -> UserSyncService {
    UserSyncService::new(Arc::new(dashboard.clone()))
}

#[tokio::test]
async fn matching_users_are_left_alone() {
    let dashboard = FakeDashboardService::default();
    dashboard.add_user(1, "ada", "ada@example.com", "ada");

    let synced = service(&dashboard)
        .sync_users(&[source_user("ada")], &CancellationToken::new())
        .await
        .unwrap_or_default();

    assert_eq!(synced.len(), 1);
    assert!(dashboard.mutations().is_empty());
}

#[tokio::test]
async fn drifted_profile_and_server_admin_flag_are_fixed() {
    let dashboard = FakeDashboardService::default();
    dashboard.add_user(1, "ada", "old@example.com", "Someone");
    dashboard.add_user(2, "bob", "bob@example.com", "bob");
    dashboard.state().users[1].is_admin = true;

    let result = service(&dashboard)
        .sync_users(
            &[source_user("ada"), source_user("bob")],
            &CancellationToken::new(),
        )
        .await;

    assert!(result.is_ok());
    assert_eq!(
        dashboard.mutations(),
        vec!["update_user ada".to_owned(), "update_user bob".to_owned()]
    );
    let state = dashboard.state();
    assert_eq!(state.users[0].email, "ada@example.com");
    assert!(!state.users[1].is_admin);
}

#[tokio::test]
async fn missing_users_are_skipped_not_created() {
    let dashboard = FakeDashboardService::default();

    let synced = service(&dashboard)
        .sync_users(&[source_user("newcomer")], &CancellationToken::new())
        .await
        .unwrap_or_else(|_| unreachable!());

    assert!(synced.is_empty());
    assert!(dashboard.mutations().is_empty());
}

#[tokio::test]
async fn unknown_users_are_deleted_except_reserved_logins() {
    let dashboard = FakeDashboardService::default();
    dashboard.add_user(1, "admin", "admin@localhost", "admin");
    dashboard.add_user(2, SERVICE_LOGIN, "svc@localhost", "svc");
    dashboard.add_user(3, "leaver", "leaver@example.com", "leaver");

    let result = service(&dashboard)
        .sync_users(&[], &CancellationToken::new())
        .await;

    assert!(result.is_ok());
    assert_eq!(dashboard.mutations(), vec!["delete_user 3".to_owned()]);
    assert_eq!(dashboard.state().users.len(), 2);
}

#[tokio::test]
async fn cancellation_interrupts_the_sync() {
    let dashboard = FakeDashboardService::default();
    dashboard.add_user(1, "ada", "ada@example.com", "ada");
    dashboard.add_user(2, "leaver", "leaver@example.com", "leaver");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = service(&dashboard)
        .sync_users(&[source_user("ada")], &cancel)
        .await;

    assert!(matches!(result, Err(AppError::Interrupted)));
    assert!(dashboard.mutations().is_empty());
}
