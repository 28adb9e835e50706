//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod dashboard;
mod data_source;
mod identity;
mod organization;
mod permission;

pub use dashboard::{DashboardDefinition, DashboardDocument};
pub use data_source::{DataSource, DataSourceRef, DataSourceSpec};
pub use identity::{
    DISPLAY_NAME_ATTRIBUTE, GroupPath, IdentityGroup, SourceUser, derive_display_name,
};
pub use organization::{ORG_NAME_SEPARATOR, SourceOrganization, correlation_key};
pub use permission::{ADMIN_ROLES, DesiredPermission, MEMBER_ROLES, OrgRole};
