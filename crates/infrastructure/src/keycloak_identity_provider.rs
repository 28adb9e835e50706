use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use orgsync_application::IdentityProvider;
use orgsync_core::AppResult;
use orgsync_domain::{GroupPath, IdentityGroup, SourceUser};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::http_support::send_json;
use crate::parallel_fetch::parallel_map;

const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(10);
const GROUP_LIST_LIMIT: usize = 100_000;

/// Connection settings of the Keycloak admin API.
#[derive(Debug, Clone)]
pub struct KeycloakSettings {
    /// Base URL, without the `/auth` context path.
    pub base_url: String,
    /// Realm holding users and groups.
    pub realm: String,
    /// Service user for the password grant.
    pub username: String,
    /// Password of the service user.
    pub password: String,
    /// OIDC client used for the password grant.
    pub client_id: String,
    /// Users fetched per page.
    pub page_size: usize,
    /// Concurrent requests for paged and per-user fetches.
    pub worker_count: usize,
}

impl KeycloakSettings {
    fn token_url(&self) -> String {
        format!(
            "{}/auth/realms/{}/protocol/openid-connect/token",
            self.base_url.trim_end_matches('/'),
            self.realm
        )
    }

    fn admin_url(&self, path: &str) -> String {
        format!(
            "{}/auth/admin/realms/{}/{path}",
            self.base_url.trim_end_matches('/'),
            self.realm
        )
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeycloakUser {
    id: String,
    username: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
}

impl KeycloakUser {
    fn into_source_user(self) -> AppResult<SourceUser> {
        SourceUser::from_names(
            self.id,
            self.username,
            self.email.unwrap_or_default(),
            self.first_name.unwrap_or_default().as_str(),
            self.last_name.unwrap_or_default().as_str(),
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeycloakGroup {
    id: String,
    name: String,
    path: String,
    #[serde(default)]
    sub_groups: Vec<KeycloakGroup>,
    #[serde(default)]
    attributes: Option<BTreeMap<String, Vec<String>>>,
}

impl KeycloakGroup {
    fn into_identity_group(self) -> IdentityGroup {
        IdentityGroup::new(
            self.id,
            self.name,
            GroupPath::parse(self.path),
            self.attributes.unwrap_or_default(),
            self.sub_groups
                .into_iter()
                .map(Self::into_identity_group)
                .collect(),
        )
    }
}

/// Keycloak admin API client implementing the identity port.
pub struct KeycloakIdentityProvider {
    http_client: reqwest::Client,
    settings: Arc<KeycloakSettings>,
    token: Mutex<Option<CachedToken>>,
}

impl KeycloakIdentityProvider {
    /// Creates a provider sharing `http_client`'s connection pool.
    #[must_use]
    pub fn new(http_client: reqwest::Client, settings: KeycloakSettings) -> Self {
        Self {
            http_client,
            settings: Arc::new(settings),
            token: Mutex::new(None),
        }
    }

    /// Returns a valid access token, running the password grant when the
    /// cached one is missing or about to expire.
    async fn access_token(&self) -> AppResult<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref()
            && Instant::now() < token.refresh_at
        {
            return Ok(token.value.clone());
        }

        let request = self
            .http_client
            .post(self.settings.token_url())
            .header("cache-control", "no-cache")
            .form(&[
                ("grant_type", "password"),
                ("username", self.settings.username.as_str()),
                ("password", self.settings.password.as_str()),
                ("client_id", self.settings.client_id.as_str()),
            ]);
        let response: TokenResponse = send_json(request, "keycloak token endpoint").await?;

        let lifetime = Duration::from_secs(response.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        debug!(expires_in = response.expires_in, "acquired keycloak access token");
        *cached = Some(CachedToken {
            value: response.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });

        Ok(response.access_token)
    }

    async fn user_count(&self, token: &str) -> AppResult<usize> {
        let request = self
            .http_client
            .get(self.settings.admin_url("users/count"))
            .bearer_auth(token);
        send_json(request, "keycloak user count endpoint").await
    }
}

#[async_trait]
impl IdentityProvider for KeycloakIdentityProvider {
    async fn fetch_users(&self) -> AppResult<Vec<SourceUser>> {
        let token = self.access_token().await?;
        let count = self.user_count(token.as_str()).await?;
        let page_size = self.settings.page_size.max(1);
        let offsets: Vec<usize> = (0..count).step_by(page_size).collect();

        let http_client = self.http_client.clone();
        let url = self.settings.admin_url("users");
        let mut pages = parallel_map(offsets, self.settings.worker_count, move |offset| {
            let request = http_client
                .get(url.as_str())
                .bearer_auth(token.as_str())
                .query(&[
                    ("first", offset.to_string()),
                    ("max", page_size.to_string()),
                    ("briefRepresentation", "true".to_owned()),
                ]);
            async move { send_json::<Vec<KeycloakUser>>(request, "keycloak users endpoint").await }
        })
        .await?;
        pages.sort_by_key(|(offset, _)| *offset);

        pages
            .into_iter()
            .flat_map(|(_, users)| users)
            .map(KeycloakUser::into_source_user)
            .collect()
    }

    async fn fetch_group_tree(&self) -> AppResult<Vec<IdentityGroup>> {
        let token = self.access_token().await?;
        let request = self
            .http_client
            .get(self.settings.admin_url("groups"))
            .bearer_auth(token)
            .query(&[
                ("briefRepresentation", "false".to_owned()),
                ("max", GROUP_LIST_LIMIT.to_string()),
            ]);
        let groups: Vec<KeycloakGroup> = send_json(request, "keycloak groups endpoint").await?;

        Ok(groups
            .into_iter()
            .map(KeycloakGroup::into_identity_group)
            .collect())
    }

    async fn fetch_memberships(
        &self,
        users: &[SourceUser],
    ) -> AppResult<BTreeMap<String, Vec<GroupPath>>> {
        let token = self.access_token().await?;
        let http_client = self.http_client.clone();
        let settings = Arc::clone(&self.settings);

        let memberships = parallel_map(users.to_vec(), self.settings.worker_count, move |user| {
            let request = http_client
                .get(settings.admin_url(format!("users/{}/groups", user.id()).as_str()))
                .bearer_auth(token.as_str());
            async move {
                send_json::<Vec<KeycloakGroup>>(request, "keycloak user groups endpoint").await
            }
        })
        .await?;

        Ok(memberships
            .into_iter()
            .map(|(user, groups)| {
                (
                    user.login().to_owned(),
                    groups
                        .into_iter()
                        .map(|group| GroupPath::parse(group.path))
                        .collect(),
                )
            })
            .collect())
    }
}
