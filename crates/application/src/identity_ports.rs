use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use orgsync_core::AppResult;
use orgsync_domain::{GroupPath, IdentityGroup, SourceOrganization, SourceUser};

/// Raw access to the identity backend.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Lists every user of the realm.
    async fn fetch_users(&self) -> AppResult<Vec<SourceUser>>;

    /// Returns the top-level groups with their nested subgroups.
    async fn fetch_group_tree(&self) -> AppResult<Vec<IdentityGroup>>;

    /// Returns the direct group memberships keyed by user login.
    ///
    /// Fails as a whole if any single lookup failed.
    async fn fetch_memberships(
        &self,
        users: &[SourceUser],
    ) -> AppResult<BTreeMap<String, Vec<GroupPath>>>;
}

/// Organizations and their members as seen by the source of truth.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceDirectory {
    /// Organizations that must exist in the dashboard service.
    pub organizations: Vec<SourceOrganization>,
    /// Group memberships keyed by user login.
    pub memberships: BTreeMap<String, Vec<GroupPath>>,
    /// Logins with admin access to every organization.
    pub admins: BTreeSet<String>,
}

impl SourceDirectory {
    /// Returns the total number of memberships.
    #[must_use]
    pub fn membership_count(&self) -> usize {
        self.memberships.values().map(Vec::len).sum()
    }
}

/// Normalized source of truth consumed by the reconcile driver.
#[async_trait]
pub trait OrganizationSource: Send + Sync {
    /// Lists the users known to the source.
    async fn fetch_users(&self) -> AppResult<Vec<SourceUser>>;

    /// Resolves organizations, memberships and admins for `users`.
    async fn fetch_directory(&self, users: &[SourceUser]) -> AppResult<SourceDirectory>;
}
