//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod control_api_organization_source;
mod filesystem_dashboard_catalog;
mod grafana_dashboard_service;
mod http_support;
mod keycloak_identity_provider;
mod parallel_fetch;

pub use control_api_organization_source::{ControlApiOrganizationSource, ControlApiSettings};
pub use filesystem_dashboard_catalog::load_latest_dashboards;
pub use grafana_dashboard_service::{GrafanaDashboardService, GrafanaSettings};
pub use keycloak_identity_provider::{KeycloakIdentityProvider, KeycloakSettings};
pub use parallel_fetch::parallel_map;
