use std::sync::Arc;

use orgsync_core::{AppError, AppResult};
use orgsync_domain::DesiredPermission;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cancellation::checkpoint;
use crate::{DashboardService, OrgMap, PermissionMap, RESERVED_ADMIN_LOGIN, TargetOrg};

/// Converges org-scoped role assignments to the derived permissions.
///
/// Mutation failures are logged and skipped: they usually mean a user
/// vanished concurrently and the next pass will settle it.
#[derive(Clone)]
pub struct PermissionSyncService {
    dashboard: Arc<dyn DashboardService>,
}

impl PermissionSyncService {
    /// Creates the service.
    #[must_use]
    pub fn new(dashboard: Arc<dyn DashboardService>) -> Self {
        Self { dashboard }
    }

    /// Syncs the permissions of every managed org.
    pub async fn sync_permissions(
        &self,
        permissions: &PermissionMap,
        orgs: &OrgMap,
        cancel: &CancellationToken,
    ) -> AppResult<()> {
        for (organization, desired) in permissions {
            let org = orgs.get(organization).ok_or_else(|| {
                AppError::Internal(format!(
                    "organization '{organization}' is not present in the dashboard service"
                ))
            })?;

            self.sync_org_permissions(org, desired, cancel).await?;
        }

        Ok(())
    }

    /// Makes the members of one org exactly `desired`, keeping the reserved
    /// logins.
    pub async fn sync_org_permissions(
        &self,
        org: &TargetOrg,
        desired: &[DesiredPermission],
        cancel: &CancellationToken,
    ) -> AppResult<()> {
        let mut current = self.dashboard.list_org_members(org.id).await?;

        for permission in desired {
            let position = current
                .iter()
                .position(|member| member.login == permission.login());

            match position.map(|index| current.swap_remove(index)) {
                None => {
                    info!(
                        login = %permission.login(),
                        org_id = org.id,
                        org = %org.name,
                        "user should have access to organization, adding"
                    );
                    if let Err(error) = self
                        .dashboard
                        .add_org_member(org.id, permission.login(), permission.preferred_role())
                        .await
                    {
                        warn!(login = %permission.login(), org_id = org.id, error = %error, "failed to add user to organization");
                    }
                }
                Some(member) if !permission.accepts(member.role.as_str()) => {
                    info!(
                        login = %permission.login(),
                        role = %member.role,
                        org_id = org.id,
                        org = %org.name,
                        "user has invalid role on organization, fixing"
                    );
                    if let Err(error) = self
                        .dashboard
                        .update_org_member_role(org.id, member.user_id, permission.preferred_role())
                        .await
                    {
                        warn!(login = %permission.login(), org_id = org.id, error = %error, "failed to fix role");
                    }
                }
                Some(_) => {}
            }

            checkpoint(cancel)?;
        }

        let service_login = self.dashboard.service_login();
        for member in current {
            if member.login == RESERVED_ADMIN_LOGIN || member.login == service_login {
                continue;
            }

            info!(
                login = %member.login,
                user_id = member.user_id,
                org_id = org.id,
                org = %org.name,
                "user must not have access to organization, removing"
            );
            if let Err(error) = self.dashboard.remove_org_member(org.id, member.user_id).await {
                warn!(login = %member.login, org_id = org.id, error = %error, "failed to remove user from organization");
            }

            checkpoint(cancel)?;
        }

        Ok(())
    }

    /// Evicts every non-reserved member of the auto-assign org, unless that
    /// org is managed.
    pub async fn purge_auto_assign_org(
        &self,
        managed: &OrgMap,
        cancel: &CancellationToken,
    ) -> AppResult<()> {
        let org_id = self.dashboard.auto_assign_org_id().await?;
        if managed.values().any(|org| org.id == org_id) {
            warn!(org_id, "auto-assign organization is a managed organization, not purging");
            return Ok(());
        }

        let org = self.dashboard.find_org(org_id).await?;
        info!(org_id, org = %org.name, "removing members of auto-assign organization");
        self.sync_org_permissions(&org, &[], cancel).await
    }
}
