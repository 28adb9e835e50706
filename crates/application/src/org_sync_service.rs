//! Org convergence: the set of orgs and, per org, its data sources,
//! folders and dashboards.

use std::collections::BTreeMap;
use std::sync::Arc;

use orgsync_core::{AppError, AppResult};
use orgsync_domain::{DashboardDefinition, SourceOrganization, correlation_key};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cancellation::checkpoint;
use crate::{DashboardService, DataSourceSettings, TargetOrg};

mod dashboards;
mod data_sources;

/// Managed orgs keyed by organization key.
pub type OrgMap = BTreeMap<String, TargetOrg>;

/// Application service creating, renaming and deleting orgs and owning
/// their settings.
#[derive(Clone)]
pub struct OrgSyncService {
    dashboard: Arc<dyn DashboardService>,
    data_source_settings: DataSourceSettings,
    dashboards: Arc<[DashboardDefinition]>,
}

impl OrgSyncService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        dashboard: Arc<dyn DashboardService>,
        data_source_settings: DataSourceSettings,
        dashboards: Arc<[DashboardDefinition]>,
    ) -> Self {
        Self {
            dashboard,
            data_source_settings,
            dashboards,
        }
    }

    /// Converges all orgs and returns the managed ones.
    ///
    /// Orgs without a correlation key are never touched. Orgs with a key
    /// that no organization claims are deleted after every desired org has
    /// been processed.
    pub async fn sync_orgs(
        &self,
        organizations: &[SourceOrganization],
        cancel: &CancellationToken,
    ) -> AppResult<OrgMap> {
        let mut lookup: BTreeMap<String, TargetOrg> = BTreeMap::new();
        for org in self.dashboard.list_orgs().await? {
            if let Some(key) = correlation_key(org.name.as_str()) {
                lookup.insert(key.to_owned(), org);
            }
        }

        let mut managed = OrgMap::new();
        for organization in organizations {
            let existing = lookup.remove(organization.key());
            let org = self.sync_org_basic(organization, existing).await?;
            self.sync_org_settings(organization, &org).await?;
            managed.insert(organization.key().to_owned(), org);

            checkpoint(cancel)?;
        }

        for stale_org in lookup.into_values() {
            info!(
                org_id = stale_org.id,
                name = %stale_org.name,
                "organization should not exist, deleting"
            );
            self.dashboard.delete_org(stale_org.id).await?;

            checkpoint(cancel)?;
        }

        Ok(managed)
    }

    async fn sync_org_basic(
        &self,
        organization: &SourceOrganization,
        existing: Option<TargetOrg>,
    ) -> AppResult<TargetOrg> {
        let desired_name = organization.target_org_name();

        match existing {
            None => {
                info!(name = %desired_name, "organization missing, creating");
                self.dashboard.create_org(desired_name.as_str()).await
            }
            Some(org) if org.name != desired_name => {
                info!(
                    org_id = org.id,
                    from = %org.name,
                    to = %desired_name,
                    "organization has wrong name, renaming"
                );
                self.dashboard
                    .rename_org(org.id, desired_name.as_str())
                    .await?;
                Ok(TargetOrg {
                    id: org.id,
                    name: desired_name,
                })
            }
            Some(org) => Ok(org),
        }
    }

    async fn sync_org_settings(
        &self,
        organization: &SourceOrganization,
        org: &TargetOrg,
    ) -> AppResult<()> {
        let client = self.dashboard.for_organization(org.id)?;

        let specs = self
            .data_source_settings
            .required_data_sources(organization.key());
        let data_sources = data_sources::sync_data_sources(client.as_ref(), &specs).await?;

        let primary = data_sources
            .iter()
            .find(|data_source| data_source.is_default)
            .or_else(|| data_sources.first())
            .ok_or_else(|| {
                AppError::Internal(format!("organization {} has no data source", org.id))
            })?;

        match dashboards::sync_dashboards(client.as_ref(), &primary.reference(), &self.dashboards)
            .await
        {
            Ok(()) => {}
            Err(AppError::Validation(message)) => {
                warn!(
                    org_id = org.id,
                    error = %message,
                    "skipping dashboards of organization"
                );
            }
            Err(error) => return Err(error),
        }

        Ok(())
    }
}
