//! Organization source backed by an identity provider's group tree.
//!
//! Organizations are the two-level groups below a configured root such as
//! `/organizations/acme`; deeper groups are teams of that organization.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use orgsync_core::AppResult;
use orgsync_domain::{GroupPath, IdentityGroup, SourceOrganization, SourceUser};
use tracing::warn;

use crate::{IdentityProvider, OrganizationSource, SourceDirectory};

/// Adapter turning identity groups into organizations.
#[derive(Clone)]
pub struct IdentityOrganizationSource {
    provider: Arc<dyn IdentityProvider>,
    organizations_root: String,
    admin_group_path: Option<String>,
}

impl IdentityOrganizationSource {
    /// Creates the adapter.
    #[must_use]
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        organizations_root: impl Into<String>,
        admin_group_path: Option<String>,
    ) -> Self {
        Self {
            provider,
            organizations_root: organizations_root.into(),
            admin_group_path: admin_group_path.filter(|path| !path.is_empty()),
        }
    }

    /// Returns the organizations directly below the organizations root.
    #[must_use]
    pub fn organizations(&self, tree: &[IdentityGroup]) -> Vec<SourceOrganization> {
        let Some(root) = tree
            .iter()
            .find(|group| group.path().as_str() == self.organizations_root)
        else {
            warn!(
                root = %self.organizations_root,
                "organizations root group not found"
            );
            return Vec::new();
        };

        root.sub_groups()
            .iter()
            .filter_map(|group| match SourceOrganization::from_group(group) {
                Ok(organization) => Some(organization),
                Err(error) => {
                    warn!(
                        group = %group.path().as_str(),
                        error = %error,
                        "skipping organization group"
                    );
                    None
                }
            })
            .collect()
    }

    /// Returns the logins directly in the admin group.
    #[must_use]
    pub fn admins(
        &self,
        tree: &[IdentityGroup],
        memberships: &BTreeMap<String, Vec<GroupPath>>,
    ) -> BTreeSet<String> {
        let Some(admin_group_path) = self.admin_group_path.as_deref() else {
            return BTreeSet::new();
        };

        let Some(admin_group) = IdentityGroup::find_by_path(tree, admin_group_path) else {
            warn!(path = %admin_group_path, "admin group not found");
            return BTreeSet::new();
        };

        memberships
            .iter()
            .filter(|(_, groups)| {
                groups
                    .iter()
                    .any(|group| group.as_str() == admin_group.path().as_str())
            })
            .map(|(login, _)| login.clone())
            .collect()
    }
}

#[async_trait]
impl OrganizationSource for IdentityOrganizationSource {
    async fn fetch_users(&self) -> AppResult<Vec<SourceUser>> {
        self.provider.fetch_users().await
    }

    async fn fetch_directory(&self, users: &[SourceUser]) -> AppResult<SourceDirectory> {
        let memberships = self.provider.fetch_memberships(users).await?;
        let tree = self.provider.fetch_group_tree().await?;

        Ok(SourceDirectory {
            organizations: self.organizations(&tree),
            admins: self.admins(&tree, &memberships),
            memberships,
        })
    }
}

#[cfg(test)]
mod tests;
