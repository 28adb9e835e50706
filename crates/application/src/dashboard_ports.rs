use std::sync::Arc;

use async_trait::async_trait;
use orgsync_core::AppResult;
use orgsync_domain::{DashboardDocument, DataSource, DataSourceSpec, OrgRole};

/// Login of the built-in administrator, never touched by sync.
pub const RESERVED_ADMIN_LOGIN: &str = "admin";

/// Global user of the dashboard service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUser {
    /// Numeric user identifier.
    pub id: i64,
    /// Login, equal to the source login.
    pub login: String,
    /// Email address.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Whether the user is a server administrator.
    pub is_admin: bool,
}

/// Corrected profile for an existing user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUserUpdate {
    /// Numeric user identifier.
    pub id: i64,
    /// Login.
    pub login: String,
    /// Email address.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Whether the server administrator flag must be removed.
    pub revoke_server_admin: bool,
}

/// Organization in the dashboard service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetOrg {
    /// Numeric org identifier.
    pub id: i64,
    /// Org name, `key - display name` for managed orgs.
    pub name: String,
}

/// Role assignment of one user within one org.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgMember {
    /// Numeric user identifier.
    pub user_id: i64,
    /// User login.
    pub login: String,
    /// Role as reported by the service.
    pub role: String,
}

/// Dashboard folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    /// Folder UID.
    pub uid: String,
    /// Folder title.
    pub title: String,
}

/// Dashboard search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSummary {
    /// Dashboard UID.
    pub uid: String,
    /// Dashboard title.
    pub title: String,
    /// Title of the containing folder, `None` for the root.
    pub folder_title: Option<String>,
}

/// Global operations of the dashboard service.
#[async_trait]
pub trait DashboardService: Send + Sync {
    /// Returns the login this client authenticates as.
    fn service_login(&self) -> &str;

    /// Lists all users.
    async fn list_users(&self) -> AppResult<Vec<TargetUser>>;

    /// Overwrites a user's profile.
    async fn update_user(&self, update: &TargetUserUpdate) -> AppResult<()>;

    /// Deletes a user globally.
    async fn delete_user(&self, user_id: i64) -> AppResult<()>;

    /// Lists all orgs.
    async fn list_orgs(&self) -> AppResult<Vec<TargetOrg>>;

    /// Returns one org.
    async fn find_org(&self, org_id: i64) -> AppResult<TargetOrg>;

    /// Creates an org.
    async fn create_org(&self, name: &str) -> AppResult<TargetOrg>;

    /// Renames an org.
    async fn rename_org(&self, org_id: i64, name: &str) -> AppResult<()>;

    /// Deletes an org with everything in it.
    async fn delete_org(&self, org_id: i64) -> AppResult<()>;

    /// Lists the role assignments of an org.
    async fn list_org_members(&self, org_id: i64) -> AppResult<Vec<OrgMember>>;

    /// Adds an existing user to an org.
    async fn add_org_member(&self, org_id: i64, login: &str, role: OrgRole) -> AppResult<()>;

    /// Changes the role of an org member.
    async fn update_org_member_role(&self, org_id: i64, user_id: i64, role: OrgRole)
    -> AppResult<()>;

    /// Removes a user from an org.
    async fn remove_org_member(&self, org_id: i64, user_id: i64) -> AppResult<()>;

    /// Returns the org new users are put into by default.
    async fn auto_assign_org_id(&self) -> AppResult<i64>;

    /// Returns a client whose calls are scoped to one org.
    ///
    /// Org scoping is fixed for the lifetime of the returned client.
    fn for_organization(&self, org_id: i64) -> AppResult<Arc<dyn OrgScopedDashboardClient>>;
}

/// Operations that act on the org a client was scoped to.
#[async_trait]
pub trait OrgScopedDashboardClient: Send + Sync {
    /// Returns the org this client is scoped to.
    fn org_id(&self) -> i64;

    /// Lists the org's data sources.
    async fn list_data_sources(&self) -> AppResult<Vec<DataSource>>;

    /// Creates a data source and returns it as stored.
    async fn create_data_source(&self, spec: &DataSourceSpec) -> AppResult<DataSource>;

    /// Overwrites a data source in place, keeping its identity.
    async fn update_data_source(
        &self,
        id: i64,
        uid: &str,
        spec: &DataSourceSpec,
    ) -> AppResult<DataSource>;

    /// Deletes a data source.
    async fn delete_data_source(&self, id: i64) -> AppResult<()>;

    /// Lists folders.
    async fn list_folders(&self) -> AppResult<Vec<Folder>>;

    /// Creates a folder.
    async fn create_folder(&self, title: &str) -> AppResult<Folder>;

    /// Lists dashboards.
    async fn list_dashboards(&self) -> AppResult<Vec<DashboardSummary>>;

    /// Saves a dashboard into a folder, overwriting a same-titled one. An
    /// empty `folder_uid` saves into the root folder.
    async fn create_dashboard(&self, document: &DashboardDocument, folder_uid: &str)
    -> AppResult<()>;
}
