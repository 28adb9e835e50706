use std::collections::BTreeMap;
use std::sync::Arc;

use orgsync_core::AppError;
use orgsync_domain::GroupPath;

use crate::test_support::{FakeIdentityProvider, group, source_user};
use crate::{IdentityOrganizationSource, OrganizationSource};

fn tree() -> Vec<orgsync_domain::IdentityGroup> {
    vec![
        group(
            "/organizations",
            &[],
            vec![
                group(
                    "/organizations/acme",
                    &[("displayName", "Acme Corp")],
                    vec![group("/organizations/acme/team-a", &[], vec![])],
                ),
                group("/organizations/globex", &[], vec![]),
                group("/organizations/bad name", &[], vec![]),
            ],
        ),
        group(
            "/internal",
            &[],
            vec![group("/internal/admins", &[], vec![])],
        ),
    ]
}

fn memberships(entries: &[(&str, &str)]) -> BTreeMap<String, Vec<GroupPath>> {
    let mut memberships: BTreeMap<String, Vec<GroupPath>> = BTreeMap::new();
    for (login, path) in entries {
        memberships
            .entry((*login).to_owned())
            .or_default()
            .push(GroupPath::parse(*path));
    }
    memberships
}

fn source(provider: FakeIdentityProvider, admin_group_path: Option<&str>) -> IdentityOrganizationSource {
    IdentityOrganizationSource::new(
        Arc::new(provider),
        "/organizations",
        admin_group_path.map(str::to_owned),
    )
}

#[test]
fn organizations_are_two_level_groups_below_root() {
    let adapter = source(FakeIdentityProvider::default(), None);
    let organizations = adapter.organizations(&tree());

    let keys: Vec<&str> = organizations.iter().map(|org| org.key()).collect();
    assert_eq!(keys, vec!["acme", "globex"]);
    assert_eq!(organizations[0].display_name(), "Acme Corp");
    assert_eq!(organizations[0].teams(), ["team-a".to_owned()]);
    assert_eq!(organizations[1].target_org_name(), "globex - globex");
}

#[test]
fn missing_root_yields_no_organizations() {
    let adapter = IdentityOrganizationSource::new(
        Arc::new(FakeIdentityProvider::default()),
        "/tenants",
        None,
    );
    assert!(adapter.organizations(&tree()).is_empty());
}

#[test]
fn admins_are_direct_members_of_admin_group() {
    let adapter = source(FakeIdentityProvider::default(), Some("/internal/admins"));
    let admins = adapter.admins(
        &tree(),
        &memberships(&[
            ("root", "/internal/admins"),
            ("ada", "/organizations/acme"),
            ("ops", "/internal"),
        ]),
    );

    assert_eq!(admins.into_iter().collect::<Vec<_>>(), vec!["root".to_owned()]);
}

#[test]
fn unknown_admin_group_yields_no_admins() {
    let adapter = source(FakeIdentityProvider::default(), Some("/internal/nobody"));
    let admins = adapter.admins(&tree(), &memberships(&[("root", "/internal/nobody")]));
    assert!(admins.is_empty());
}

#[tokio::test]
async fn directory_combines_tree_and_memberships() {
    let users = vec![source_user("ada"), source_user("root")];
    let provider = FakeIdentityProvider {
        users: users.clone(),
        tree: tree(),
        memberships: memberships(&[
            ("ada", "/organizations/acme/team-a"),
            ("root", "/internal/admins"),
        ]),
        fail_memberships: false,
    };
    let adapter = source(provider, Some("/internal/admins"));

    let fetched = adapter.fetch_users().await.unwrap_or_default();
    assert_eq!(fetched, users);

    let directory = adapter
        .fetch_directory(&users)
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(directory.organizations.len(), 2);
    assert_eq!(directory.membership_count(), 2);
    assert!(directory.admins.contains("root"));
}

#[tokio::test]
async fn membership_failure_fails_the_directory() {
    let provider = FakeIdentityProvider {
        tree: tree(),
        fail_memberships: true,
        ..FakeIdentityProvider::default()
    };
    let adapter = source(provider, None);

    let result = adapter.fetch_directory(&[source_user("ada")]).await;
    assert!(matches!(result, Err(AppError::Internal(_))));
}
