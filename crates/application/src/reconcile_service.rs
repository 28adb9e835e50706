use std::sync::Arc;

use chrono::{DateTime, Utc};
use orgsync_core::AppResult;
use orgsync_domain::DashboardDefinition;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cancellation::checkpoint;
use crate::{
    DashboardService, OrgSyncService, OrganizationSource, PermissionSyncService, ReconcileConfig,
    UserSyncService, derive_permissions,
};

/// Counters of one completed reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Users listed by the source.
    pub users_found: usize,
    /// Source users that exist in the dashboard service.
    pub users_synced: usize,
    /// Group memberships of the synced users.
    pub memberships_found: usize,
    /// Organizations listed by the source.
    pub organizations_found: usize,
    /// Users with admin access to every organization.
    pub admins_found: usize,
    /// Desired permissions across all organizations.
    pub permissions_derived: usize,
    /// Start of the pass.
    pub started_at: DateTime<Utc>,
    /// End of the pass.
    pub finished_at: DateTime<Utc>,
}

/// Drives one full pass: users, organizations, permissions.
#[derive(Clone)]
pub struct ReconcileService {
    config: ReconcileConfig,
    source: Arc<dyn OrganizationSource>,
    users: UserSyncService,
    orgs: OrgSyncService,
    permissions: PermissionSyncService,
}

impl ReconcileService {
    /// Creates the driver and the sync services it runs.
    #[must_use]
    pub fn new(
        config: ReconcileConfig,
        source: Arc<dyn OrganizationSource>,
        dashboard: Arc<dyn DashboardService>,
        dashboards: Arc<[DashboardDefinition]>,
    ) -> Self {
        let users = UserSyncService::new(dashboard.clone());
        let orgs = OrgSyncService::new(dashboard.clone(), config.data_source.clone(), dashboards);
        let permissions = PermissionSyncService::new(dashboard);

        Self {
            config,
            source,
            users,
            orgs,
            permissions,
        }
    }

    /// Runs one pass. The first failing step aborts the pass; a cancelled
    /// pass returns [`orgsync_core::AppError::Interrupted`].
    pub async fn reconcile(&self, cancel: &CancellationToken) -> AppResult<ReconcileReport> {
        let started_at = Utc::now();

        let source_users = self.source.fetch_users().await?;
        info!(count = source_users.len(), "found users in source");
        checkpoint(cancel)?;

        let synced_users = self.users.sync_users(&source_users, cancel).await?;
        info!(count = synced_users.len(), "synced users");

        let directory = self.source.fetch_directory(&synced_users).await?;
        info!(
            organizations = directory.organizations.len(),
            memberships = directory.membership_count(),
            admins = directory.admins.len(),
            "resolved organization directory"
        );
        checkpoint(cancel)?;

        let permissions = derive_permissions(&synced_users, &directory);
        let permissions_derived = permissions.values().map(Vec::len).sum();
        info!(count = permissions_derived, "derived permissions");

        let managed = self.orgs.sync_orgs(&directory.organizations, cancel).await?;
        info!(count = managed.len(), "synced organizations");

        self.permissions
            .sync_permissions(&permissions, &managed, cancel)
            .await?;
        info!("synced permissions");

        if self.config.clear_auto_assign_org {
            self.permissions
                .purge_auto_assign_org(&managed, cancel)
                .await?;
        }

        Ok(ReconcileReport {
            users_found: source_users.len(),
            users_synced: synced_users.len(),
            memberships_found: directory.membership_count(),
            organizations_found: directory.organizations.len(),
            admins_found: directory.admins.len(),
            permissions_derived,
            started_at,
            finished_at: Utc::now(),
        })
    }
}
