//! Application services and ports.

#![forbid(unsafe_code)]

mod cancellation;
mod config;
mod dashboard_ports;
mod identity_ports;
mod identity_source;
mod org_sync_service;
mod permission_deriver;
mod permission_sync_service;
mod reconcile_service;
mod user_sync_service;

#[cfg(test)]
mod test_support;

pub use config::{
    ALERTING_DATA_SOURCE_NAME, DataSourceSettings, METRICS_DATA_SOURCE_NAME, ReconcileConfig,
};
pub use dashboard_ports::{
    DashboardService, DashboardSummary, Folder, OrgMember, OrgScopedDashboardClient,
    RESERVED_ADMIN_LOGIN, TargetOrg, TargetUser, TargetUserUpdate,
};
pub use identity_ports::{IdentityProvider, OrganizationSource, SourceDirectory};
pub use identity_source::IdentityOrganizationSource;
pub use org_sync_service::{OrgMap, OrgSyncService};
pub use permission_deriver::{PermissionMap, derive_permissions};
pub use permission_sync_service::PermissionSyncService;
pub use reconcile_service::{ReconcileReport, ReconcileService};
pub use user_sync_service::UserSyncService;
