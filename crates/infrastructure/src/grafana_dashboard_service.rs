use std::sync::Arc;

use async_trait::async_trait;
use orgsync_application::{
    DashboardService, DashboardSummary, Folder, OrgMember, OrgScopedDashboardClient, TargetOrg,
    TargetUser, TargetUserUpdate,
};
use orgsync_core::{AppError, AppResult};
use orgsync_domain::{DashboardDocument, DataSource, DataSourceSpec, OrgRole};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::http_support::{send_empty, send_json};

const ORG_ID_HEADER: &str = "X-Grafana-Org-Id";
const PAGE_SIZE: usize = 1000;

/// Connection settings of the Grafana HTTP API.
#[derive(Debug, Clone)]
pub struct GrafanaSettings {
    /// Base URL of the Grafana instance.
    pub base_url: String,
    /// Basic auth user; also the login sync never touches.
    pub username: String,
    /// Basic auth password.
    pub password: String,
}

#[derive(Debug)]
struct GrafanaConnection {
    http_client: reqwest::Client,
    settings: GrafanaSettings,
}

impl GrafanaConnection {
    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{path}", self.settings.base_url.trim_end_matches('/'));
        self.http_client
            .request(method, url)
            .basic_auth(
                self.settings.username.as_str(),
                Some(self.settings.password.as_str()),
            )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserSearchPage {
    total_count: usize,
    #[serde(default)]
    users: Vec<UserSearchHit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserSearchHit {
    id: i64,
    login: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    is_admin: bool,
}

#[derive(Debug, Deserialize)]
struct OrgRecord {
    id: i64,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedOrg {
    org_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrgUserRecord {
    user_id: i64,
    login: String,
    role: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataSourceRecord {
    id: i64,
    uid: String,
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    access: String,
    #[serde(default)]
    is_default: bool,
    #[serde(default)]
    basic_auth: bool,
    #[serde(default)]
    basic_auth_user: String,
    #[serde(default)]
    json_data: Value,
}

impl From<DataSourceRecord> for DataSource {
    fn from(record: DataSourceRecord) -> Self {
        Self {
            id: record.id,
            uid: record.uid,
            name: record.name,
            kind: record.kind,
            url: record.url,
            access: record.access,
            is_default: record.is_default,
            basic_auth: record.basic_auth,
            basic_auth_user: record.basic_auth_user,
            json_data: record.json_data,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DataSourcePayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    uid: Option<&'a str>,
    name: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    url: &'a str,
    access: &'a str,
    is_default: bool,
    basic_auth: bool,
    basic_auth_user: &'a str,
    json_data: &'a Value,
    secure_json_data: &'a Map<String, Value>,
}

impl<'a> DataSourcePayload<'a> {
    fn new(spec: &'a DataSourceSpec, uid: Option<&'a str>) -> Self {
        Self {
            uid,
            name: spec.name.as_str(),
            kind: spec.kind.as_str(),
            url: spec.url.as_str(),
            access: spec.access.as_str(),
            is_default: spec.is_default,
            basic_auth: spec.basic_auth,
            basic_auth_user: spec.basic_auth_user.as_str(),
            json_data: &spec.json_data,
            secure_json_data: &spec.secure_json_data,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatedDataSource {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct FolderRecord {
    uid: String,
    title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchHit {
    uid: String,
    title: String,
    #[serde(default)]
    folder_title: Option<String>,
}

/// Grafana HTTP API client implementing the dashboard port.
#[derive(Clone)]
pub struct GrafanaDashboardService {
    connection: Arc<GrafanaConnection>,
}

impl GrafanaDashboardService {
    /// Creates a client sharing `http_client`'s connection pool.
    #[must_use]
    pub fn new(http_client: reqwest::Client, settings: GrafanaSettings) -> Self {
        Self {
            connection: Arc::new(GrafanaConnection {
                http_client,
                settings,
            }),
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.connection.request(method, path)
    }
}

#[async_trait]
impl DashboardService for GrafanaDashboardService {
    fn service_login(&self) -> &str {
        self.connection.settings.username.as_str()
    }

    async fn list_users(&self) -> AppResult<Vec<TargetUser>> {
        let mut users = Vec::new();
        for page in 1.. {
            let request = self
                .request(Method::GET, "/api/users/search")
                .query(&[("perpage", PAGE_SIZE), ("page", page)]);
            let result: UserSearchPage = send_json(request, "grafana user search").await?;
            let fetched = result.users.len();

            users.extend(result.users.into_iter().map(|hit| TargetUser {
                id: hit.id,
                login: hit.login,
                email: hit.email,
                name: hit.name,
                is_admin: hit.is_admin,
            }));

            if fetched == 0 || users.len() >= result.total_count {
                break;
            }
        }

        Ok(users)
    }

    async fn update_user(&self, update: &TargetUserUpdate) -> AppResult<()> {
        let request = self
            .request(Method::PUT, format!("/api/users/{}", update.id).as_str())
            .json(&json!({
                "login": update.login,
                "email": update.email,
                "name": update.name,
            }));
        send_empty(request, "grafana user update").await?;

        if update.revoke_server_admin {
            let request = self
                .request(
                    Method::PUT,
                    format!("/api/admin/users/{}/permissions", update.id).as_str(),
                )
                .json(&json!({"isGrafanaAdmin": false}));
            send_empty(request, "grafana user permissions update").await?;
        }

        Ok(())
    }

    async fn delete_user(&self, user_id: i64) -> AppResult<()> {
        let request = self.request(Method::DELETE, format!("/api/admin/users/{user_id}").as_str());
        send_empty(request, "grafana user deletion").await
    }

    async fn list_orgs(&self) -> AppResult<Vec<TargetOrg>> {
        let mut orgs = Vec::new();
        for page in 1.. {
            let request = self
                .request(Method::GET, "/api/orgs")
                .query(&[("perpage", PAGE_SIZE), ("page", page)]);
            let records: Vec<OrgRecord> = send_json(request, "grafana org listing").await?;
            let fetched = records.len();

            orgs.extend(records.into_iter().map(|record| TargetOrg {
                id: record.id,
                name: record.name,
            }));

            if fetched < PAGE_SIZE {
                break;
            }
        }

        Ok(orgs)
    }

    async fn find_org(&self, org_id: i64) -> AppResult<TargetOrg> {
        let request = self.request(Method::GET, format!("/api/orgs/{org_id}").as_str());
        let record: OrgRecord = send_json(request, "grafana org lookup").await?;

        Ok(TargetOrg {
            id: record.id,
            name: record.name,
        })
    }

    async fn create_org(&self, name: &str) -> AppResult<TargetOrg> {
        let request = self
            .request(Method::POST, "/api/orgs")
            .json(&json!({"name": name}));
        let created: CreatedOrg = send_json(request, "grafana org creation").await?;

        Ok(TargetOrg {
            id: created.org_id,
            name: name.to_owned(),
        })
    }

    async fn rename_org(&self, org_id: i64, name: &str) -> AppResult<()> {
        let request = self
            .request(Method::PUT, format!("/api/orgs/{org_id}").as_str())
            .json(&json!({"name": name}));
        send_empty(request, "grafana org rename").await
    }

    async fn delete_org(&self, org_id: i64) -> AppResult<()> {
        let request = self.request(Method::DELETE, format!("/api/orgs/{org_id}").as_str());
        send_empty(request, "grafana org deletion").await
    }

    async fn list_org_members(&self, org_id: i64) -> AppResult<Vec<OrgMember>> {
        let request = self.request(Method::GET, format!("/api/orgs/{org_id}/users").as_str());
        let records: Vec<OrgUserRecord> = send_json(request, "grafana org user listing").await?;

        Ok(records
            .into_iter()
            .map(|record| OrgMember {
                user_id: record.user_id,
                login: record.login,
                role: record.role,
            })
            .collect())
    }

    async fn add_org_member(&self, org_id: i64, login: &str, role: OrgRole) -> AppResult<()> {
        let request = self
            .request(Method::POST, format!("/api/orgs/{org_id}/users").as_str())
            .json(&json!({"loginOrEmail": login, "role": role.as_str()}));
        send_empty(request, "grafana org user addition").await
    }

    async fn update_org_member_role(
        &self,
        org_id: i64,
        user_id: i64,
        role: OrgRole,
    ) -> AppResult<()> {
        let request = self
            .request(
                Method::PATCH,
                format!("/api/orgs/{org_id}/users/{user_id}").as_str(),
            )
            .json(&json!({"role": role.as_str()}));
        send_empty(request, "grafana org user role update").await
    }

    async fn remove_org_member(&self, org_id: i64, user_id: i64) -> AppResult<()> {
        let request = self.request(
            Method::DELETE,
            format!("/api/orgs/{org_id}/users/{user_id}").as_str(),
        );
        send_empty(request, "grafana org user removal").await
    }

    async fn auto_assign_org_id(&self) -> AppResult<i64> {
        let request = self.request(Method::GET, "/api/admin/settings");
        let settings: Value = send_json(request, "grafana settings").await?;

        let raw = settings
            .pointer("/users/auto_assign_org_id")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                AppError::Internal("setting users.auto_assign_org_id not found".to_owned())
            })?;

        raw.trim().parse::<i64>().map_err(|error| {
            AppError::Internal(format!(
                "invalid users.auto_assign_org_id value '{raw}': {error}"
            ))
        })
    }

    fn for_organization(&self, org_id: i64) -> AppResult<Arc<dyn OrgScopedDashboardClient>> {
        if org_id <= 0 {
            return Err(AppError::Validation(format!(
                "cannot scope a client to organization {org_id}"
            )));
        }

        Ok(Arc::new(GrafanaOrgClient {
            connection: Arc::clone(&self.connection),
            org_id,
        }))
    }
}

/// Grafana client whose requests all carry one org id header.
struct GrafanaOrgClient {
    connection: Arc<GrafanaConnection>,
    org_id: i64,
}

impl GrafanaOrgClient {
    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.connection
            .request(method, path)
            .header(ORG_ID_HEADER, self.org_id.to_string())
    }
}

#[async_trait]
impl OrgScopedDashboardClient for GrafanaOrgClient {
    fn org_id(&self) -> i64 {
        self.org_id
    }

    async fn list_data_sources(&self) -> AppResult<Vec<DataSource>> {
        let request = self.request(Method::GET, "/api/datasources");
        let records: Vec<DataSourceRecord> =
            send_json(request, "grafana data source listing").await?;

        Ok(records.into_iter().map(DataSource::from).collect())
    }

    async fn create_data_source(&self, spec: &DataSourceSpec) -> AppResult<DataSource> {
        let request = self
            .request(Method::POST, "/api/datasources")
            .json(&DataSourcePayload::new(spec, None));
        let created: CreatedDataSource = send_json(request, "grafana data source creation").await?;

        let request = self.request(
            Method::GET,
            format!("/api/datasources/{}", created.id).as_str(),
        );
        let record: DataSourceRecord = send_json(request, "grafana data source lookup").await?;

        Ok(record.into())
    }

    async fn update_data_source(
        &self,
        id: i64,
        uid: &str,
        spec: &DataSourceSpec,
    ) -> AppResult<DataSource> {
        let request = self
            .request(Method::PUT, format!("/api/datasources/{id}").as_str())
            .json(&DataSourcePayload::new(spec, Some(uid)));
        send_empty(request, "grafana data source update").await?;

        Ok(DataSource::from_spec(id, uid, spec))
    }

    async fn delete_data_source(&self, id: i64) -> AppResult<()> {
        let request = self.request(Method::DELETE, format!("/api/datasources/{id}").as_str());
        send_empty(request, "grafana data source deletion").await
    }

    async fn list_folders(&self) -> AppResult<Vec<Folder>> {
        let request = self
            .request(Method::GET, "/api/folders")
            .query(&[("limit", PAGE_SIZE)]);
        let records: Vec<FolderRecord> = send_json(request, "grafana folder listing").await?;

        Ok(records
            .into_iter()
            .map(|record| Folder {
                uid: record.uid,
                title: record.title,
            })
            .collect())
    }

    async fn create_folder(&self, title: &str) -> AppResult<Folder> {
        let request = self
            .request(Method::POST, "/api/folders")
            .json(&json!({"title": title}));
        let record: FolderRecord = send_json(request, "grafana folder creation").await?;

        Ok(Folder {
            uid: record.uid,
            title: record.title,
        })
    }

    async fn list_dashboards(&self) -> AppResult<Vec<DashboardSummary>> {
        let request = self
            .request(Method::GET, "/api/search")
            .query(&[("type", "dash-db"), ("limit", "5000")]);
        let hits: Vec<SearchHit> = send_json(request, "grafana dashboard search").await?;

        Ok(hits
            .into_iter()
            .map(|hit| DashboardSummary {
                uid: hit.uid,
                title: hit.title,
                folder_title: hit.folder_title,
            })
            .collect())
    }

    async fn create_dashboard(
        &self,
        document: &DashboardDocument,
        folder_uid: &str,
    ) -> AppResult<()> {
        let request = self
            .request(Method::POST, "/api/dashboards/db")
            .json(&json!({
                "dashboard": document.to_value(),
                "folderUid": folder_uid,
                "overwrite": true,
            }));
        send_empty(request, "grafana dashboard creation").await
    }
}
