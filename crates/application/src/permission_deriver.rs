use std::collections::BTreeMap;

use orgsync_domain::{DesiredPermission, SourceUser};

use crate::SourceDirectory;

/// Desired permissions keyed by organization key.
pub type PermissionMap = BTreeMap<String, Vec<DesiredPermission>>;

/// Converts memberships and admins into desired org permissions.
///
/// Every organization gets an entry, possibly empty. A regular user gets one
/// member permission per organization, from the first membership that
/// belongs to it. Admins get admin permissions on every organization and
/// never a member permission. Users are visited in `users` order.
#[must_use]
pub fn derive_permissions(users: &[SourceUser], directory: &SourceDirectory) -> PermissionMap {
    let mut permissions = PermissionMap::new();

    for organization in &directory.organizations {
        let mut entries = Vec::new();

        for user in users {
            if directory.admins.contains(user.login()) {
                continue;
            }

            let belongs = directory
                .memberships
                .get(user.login())
                .is_some_and(|groups| {
                    groups
                        .iter()
                        .any(|group| organization.path().same_organization(group))
                });
            if belongs {
                entries.push(DesiredPermission::member(organization.key(), user.login()));
            }
        }

        for user in users {
            if directory.admins.contains(user.login()) {
                entries.push(DesiredPermission::admin(organization.key(), user.login()));
            }
        }

        permissions.insert(organization.key().to_owned(), entries);
    }

    permissions
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use orgsync_domain::{GroupPath, OrgRole, SourceOrganization, SourceUser};

    use super::derive_permissions;
    use crate::SourceDirectory;

    fn user(login: &str) -> SourceUser {
        SourceUser::from_names(login, login, format!("{login}@example.com"), "", "")
            .unwrap_or_else(|_| unreachable!())
    }

    fn organization(key: &str) -> SourceOrganization {
        SourceOrganization::new(
            key,
            None,
            GroupPath::parse(format!("/organizations/{key}")),
            Vec::new(),
        )
        .unwrap_or_else(|_| unreachable!())
    }

    fn directory(memberships: Vec<(&str, Vec<&str>)>, admins: &[&str]) -> SourceDirectory {
        SourceDirectory {
            organizations: vec![organization("acme"), organization("globex")],
            memberships: memberships
                .into_iter()
                .map(|(login, paths)| {
                    (
                        login.to_owned(),
                        paths.into_iter().map(GroupPath::parse).collect(),
                    )
                })
                .collect::<BTreeMap<_, _>>(),
            admins: admins.iter().map(|login| (*login).to_owned()).collect::<BTreeSet<_>>(),
        }
    }

    #[test]
    fn two_teams_of_one_org_yield_one_permission() {
        let users = vec![user("ada")];
        let directory = directory(
            vec![(
                "ada",
                vec!["/organizations/acme/team-a", "/organizations/acme/team-b"],
            )],
            &[],
        );

        let permissions = derive_permissions(&users, &directory);
        let acme = permissions.get("acme").cloned().unwrap_or_default();
        assert_eq!(acme.len(), 1);
        assert_eq!(acme[0].login(), "ada");
        assert_eq!(acme[0].preferred_role(), OrgRole::Editor);
        assert!(permissions.get("globex").is_some_and(Vec::is_empty));
    }

    #[test]
    fn admins_get_admin_on_every_org_and_no_member_entry() {
        let users = vec![user("ada"), user("root")];
        let directory = directory(
            vec![
                ("ada", vec!["/organizations/acme"]),
                ("root", vec!["/organizations/acme", "/admins"]),
            ],
            &["root"],
        );

        let permissions = derive_permissions(&users, &directory);
        for entries in permissions.values() {
            let root_entries: Vec<_> = entries
                .iter()
                .filter(|entry| entry.login() == "root")
                .collect();
            assert_eq!(root_entries.len(), 1);
            assert_eq!(root_entries[0].preferred_role(), OrgRole::Admin);
            assert!(root_entries[0].roles().contains(&OrgRole::Admin));
        }
    }

    #[test]
    fn derivation_is_deterministic() {
        let users = vec![user("ada"), user("bob"), user("cy")];
        let directory = directory(
            vec![
                ("bob", vec!["/organizations/globex"]),
                ("ada", vec!["/organizations/acme", "/organizations/globex/ops"]),
                ("cy", vec!["/organizations/acme/dev"]),
            ],
            &["cy"],
        );

        let first = derive_permissions(&users, &directory);
        for _ in 0..10 {
            assert_eq!(derive_permissions(&users, &directory), first);
        }
        let globex: Vec<&str> = first
            .get("globex")
            .map(|entries| entries.iter().map(|entry| entry.login()).collect())
            .unwrap_or_default();
        assert_eq!(globex, vec!["ada", "bob", "cy"]);
    }

    #[test]
    fn users_without_memberships_get_nothing() {
        let users = vec![user("ghost")];
        let permissions = derive_permissions(&users, &directory(Vec::new(), &[]));
        assert!(permissions.values().all(Vec::is_empty));
        assert_eq!(permissions.len(), 2);
    }
}
