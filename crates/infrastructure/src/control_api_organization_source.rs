//! Organization source backed by the organization-management control API.
//!
//! Users, organizations and organization members are Kubernetes-style list
//! resources. Memberships are expressed as group paths below the
//! organizations root so permission derivation treats both sources alike.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use orgsync_application::{OrganizationSource, SourceDirectory};
use orgsync_core::{AppError, AppResult};
use orgsync_domain::{GroupPath, SourceOrganization, SourceUser};
use serde::Deserialize;
use tracing::warn;

use crate::http_support::send_json;
use crate::parallel_fetch::parallel_map;

/// Connection settings of the control API.
#[derive(Debug, Clone)]
pub struct ControlApiSettings {
    /// Base URL of the API server.
    pub base_url: String,
    /// Bearer token.
    pub token: String,
    /// Path of the group organizations are mapped below.
    pub organizations_root: String,
    /// Concurrent member list requests.
    pub worker_count: usize,
}

impl ControlApiSettings {
    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.trim_end_matches('/'))
    }

    fn organization_path(&self, organization: &str) -> GroupPath {
        GroupPath::parse(format!(
            "{}/{organization}",
            self.organizations_root.trim_end_matches('/')
        ))
    }
}

#[derive(Debug, Deserialize)]
struct ResourceList<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ObjectMeta {
    name: String,
}

#[derive(Debug, Deserialize)]
struct UserResource {
    metadata: ObjectMeta,
    #[serde(default)]
    spec: UserSpec,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserSpec {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    preferences: UserPreferences,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserPreferences {
    #[serde(default)]
    mail_address: Option<String>,
}

impl UserResource {
    fn into_source_user(self) -> AppResult<SourceUser> {
        let email = self.spec.preferences.mail_address.unwrap_or_default();
        let display_name = self
            .spec
            .display_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| email.clone());

        SourceUser::new(
            self.metadata.name.clone(),
            self.metadata.name,
            email,
            display_name,
        )
    }
}

#[derive(Debug, Deserialize)]
struct OrganizationResource {
    metadata: ObjectMeta,
    #[serde(default)]
    spec: OrganizationSpec,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrganizationSpec {
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrganizationMembers {
    #[serde(default)]
    spec: OrganizationMembersSpec,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrganizationMembersSpec {
    #[serde(default)]
    user_refs: Vec<ObjectMeta>,
}

/// Control API client implementing the organization source port.
pub struct ControlApiOrganizationSource {
    http_client: reqwest::Client,
    settings: Arc<ControlApiSettings>,
}

impl ControlApiOrganizationSource {
    /// Creates a source sharing `http_client`'s connection pool.
    #[must_use]
    pub fn new(http_client: reqwest::Client, settings: ControlApiSettings) -> Self {
        Self {
            http_client,
            settings: Arc::new(settings),
        }
    }

    async fn organizations(&self) -> AppResult<Vec<SourceOrganization>> {
        let request = self
            .http_client
            .get(
                self.settings
                    .url("apis/organization.appuio.io/v1/organizations"),
            )
            .bearer_auth(self.settings.token.as_str());
        let list: ResourceList<OrganizationResource> =
            send_json(request, "control api organizations endpoint").await?;

        Ok(list
            .items
            .into_iter()
            .filter_map(|resource| {
                let key = resource.metadata.name;
                let path = self.settings.organization_path(key.as_str());
                match SourceOrganization::new(key.as_str(), resource.spec.display_name, path, Vec::new()) {
                    Ok(organization) => Some(organization),
                    Err(error) => {
                        warn!(organization = %key, error = %error, "skipping organization");
                        None
                    }
                }
            })
            .collect())
    }
}

#[async_trait]
impl OrganizationSource for ControlApiOrganizationSource {
    async fn fetch_users(&self) -> AppResult<Vec<SourceUser>> {
        let request = self
            .http_client
            .get(self.settings.url("apis/appuio.io/v1/users"))
            .bearer_auth(self.settings.token.as_str());
        let list: ResourceList<UserResource> =
            send_json(request, "control api users endpoint").await?;

        list.items
            .into_iter()
            .map(UserResource::into_source_user)
            .collect()
    }

    async fn fetch_directory(&self, users: &[SourceUser]) -> AppResult<SourceDirectory> {
        let organizations = self.organizations().await?;
        let keys: Vec<String> = organizations
            .iter()
            .map(|organization| organization.key().to_owned())
            .collect();

        let http_client = self.http_client.clone();
        let settings = Arc::clone(&self.settings);
        let members = parallel_map(keys, self.settings.worker_count, move |key| {
            let request = http_client
                .get(settings.url(
                    format!("apis/appuio.io/v1/namespaces/{key}/organizationmembers/members")
                        .as_str(),
                ))
                .bearer_auth(settings.token.as_str());
            async move {
                match send_json::<OrganizationMembers>(request, "control api members endpoint")
                    .await
                {
                    Ok(members) => Ok(members.spec.user_refs),
                    Err(AppError::NotFound(_)) => Ok(Vec::new()),
                    Err(error) => Err(error),
                }
            }
        })
        .await?;

        let known: BTreeSet<&str> = users.iter().map(SourceUser::login).collect();
        let mut memberships: BTreeMap<String, Vec<GroupPath>> = BTreeMap::new();
        for (key, user_refs) in members {
            let path = self.settings.organization_path(key.as_str());
            for user_ref in user_refs {
                if known.contains(user_ref.name.as_str()) {
                    memberships
                        .entry(user_ref.name)
                        .or_default()
                        .push(path.clone());
                }
            }
        }
        for groups in memberships.values_mut() {
            groups.sort_by(|left, right| left.as_str().cmp(right.as_str()));
        }

        Ok(SourceDirectory {
            organizations,
            memberships,
            admins: BTreeSet::new(),
        })
    }
}
