use std::env;
use std::fmt;
use std::path::PathBuf;

use orgsync_application::{DataSourceSettings, ReconcileConfig};
use orgsync_core::{AppError, AppResult};
use orgsync_infrastructure::{ControlApiSettings, GrafanaSettings, KeycloakSettings};

const HIDDEN: &str = "***hidden***";

/// Where organizations and their members come from.
#[derive(Clone)]
pub enum SourceConfig {
    /// Keycloak group tree below the organizations root.
    Keycloak(KeycloakSettings),
    /// Organization-management control API.
    ControlApi(ControlApiSettings),
}

impl fmt::Debug for SourceConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keycloak(settings) => formatter
                .debug_struct("Keycloak")
                .field("base_url", &settings.base_url)
                .field("realm", &settings.realm)
                .field("username", &settings.username)
                .field("password", &HIDDEN)
                .field("client_id", &settings.client_id)
                .field("page_size", &settings.page_size)
                .finish(),
            Self::ControlApi(settings) => formatter
                .debug_struct("ControlApi")
                .field("base_url", &settings.base_url)
                .field("token", &HIDDEN)
                .finish(),
        }
    }
}

/// Process configuration read from the environment.
#[derive(Clone)]
pub struct WorkerConfig {
    pub grafana: GrafanaSettings,
    pub source: SourceConfig,
    pub reconcile: ReconcileConfig,
    pub fetch_workers: usize,
    pub reconcile_interval_ms: u64,
    pub dashboards_dir: PathBuf,
}

impl fmt::Debug for WorkerConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("WorkerConfig")
            .field("grafana_url", &self.grafana.base_url)
            .field("grafana_username", &self.grafana.username)
            .field("grafana_password", &HIDDEN)
            .field("datasource_url", &self.reconcile.data_source.url)
            .field("datasource_username", &self.reconcile.data_source.username)
            .field(
                "datasource_password",
                &self.reconcile.data_source.password.as_ref().map(|_| HIDDEN),
            )
            .field("admin_group_path", &self.reconcile.admin_group_path)
            .field("organizations_root", &self.reconcile.organizations_root)
            .field(
                "clear_auto_assign_org",
                &self.reconcile.clear_auto_assign_org,
            )
            .field("source", &self.source)
            .field("fetch_workers", &self.fetch_workers)
            .field("reconcile_interval_ms", &self.reconcile_interval_ms)
            .field("dashboards_dir", &self.dashboards_dir)
            .finish()
    }
}

impl WorkerConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_env(&|name: &str| env::var(name).ok())
    }

    fn from_env(env: &Lookup<'_>) -> AppResult<Self> {
        let fetch_workers = parse_env_usize(env, "FETCH_WORKERS", 10)?;
        let reconcile_interval_ms = parse_env_u64(env, "RECONCILE_INTERVAL_MS", 2000)?;

        if fetch_workers == 0 {
            return Err(AppError::Validation(
                "FETCH_WORKERS must be greater than zero".to_owned(),
            ));
        }

        if reconcile_interval_ms == 0 {
            return Err(AppError::Validation(
                "RECONCILE_INTERVAL_MS must be greater than zero".to_owned(),
            ));
        }

        // The Grafana Helm chart injects its admin secret as `admin-user` and `admin-password`.
        let grafana = GrafanaSettings {
            base_url: trimmed_url(required_env(env, "GRAFANA_URL")?),
            username: required_env_with_fallback(env, "GRAFANA_USERNAME", "admin-user")?,
            password: required_env_with_fallback(env, "GRAFANA_PASSWORD", "admin-password")?,
        };

        let organizations_root = env_or(env, "KEYCLOAK_ORGANIZATIONS_PATH", "/organizations");
        let admin_group_path = optional_env(env, "KEYCLOAK_ADMIN_GROUP_PATH");

        let source = match env_or(env, "ORGANIZATION_SOURCE", "keycloak").as_str() {
            "keycloak" => {
                let page_size = parse_env_usize(env, "KEYCLOAK_PAGE_SIZE", 100)?;
                if page_size == 0 {
                    return Err(AppError::Validation(
                        "KEYCLOAK_PAGE_SIZE must be greater than zero".to_owned(),
                    ));
                }

                SourceConfig::Keycloak(KeycloakSettings {
                    base_url: trimmed_url(required_env(env, "KEYCLOAK_URL")?),
                    realm: required_env(env, "KEYCLOAK_REALM")?,
                    username: required_env(env, "KEYCLOAK_USERNAME")?,
                    password: required_env(env, "KEYCLOAK_PASSWORD")?,
                    client_id: required_env(env, "KEYCLOAK_CLIENT_ID")?,
                    page_size,
                    worker_count: fetch_workers,
                })
            }
            "control-api" => SourceConfig::ControlApi(ControlApiSettings {
                base_url: trimmed_url(required_env(env, "CONTROL_API_URL")?),
                token: required_env(env, "CONTROL_API_TOKEN")?,
                organizations_root: organizations_root.clone(),
                worker_count: fetch_workers,
            }),
            other => {
                return Err(AppError::Validation(format!(
                    "invalid ORGANIZATION_SOURCE value '{other}': expected 'keycloak' or 'control-api'"
                )));
            }
        };

        let reconcile = ReconcileConfig {
            admin_group_path,
            organizations_root,
            data_source: DataSourceSettings {
                url: trimmed_url(required_env(env, "GRAFANA_DATASOURCE_URL")?),
                username: optional_env(env, "GRAFANA_DATASOURCE_USERNAME"),
                password: optional_env(env, "GRAFANA_DATASOURCE_PASSWORD"),
            },
            clear_auto_assign_org: parse_env_bool(env, "GRAFANA_CLEAR_AUTO_ASSIGN_ORG", false)?,
        };

        Ok(Self {
            grafana,
            source,
            reconcile,
            fetch_workers,
            reconcile_interval_ms,
            dashboards_dir: PathBuf::from(env_or(env, "DASHBOARDS_DIR", "dashboards")),
        })
    }
}

type Lookup<'a> = dyn Fn(&str) -> Option<String> + 'a;

fn trimmed_url(value: String) -> String {
    value.trim_end_matches('/').to_owned()
}

fn required_env(env: &Lookup<'_>, name: &str) -> AppResult<String> {
    optional_env(env, name).ok_or_else(|| AppError::Validation(format!("{name} is required")))
}

fn required_env_with_fallback(env: &Lookup<'_>, name: &str, fallback: &str) -> AppResult<String> {
    optional_env(env, name)
        .or_else(|| optional_env(env, fallback))
        .ok_or_else(|| AppError::Validation(format!("{name} or {fallback} is required")))
}

fn optional_env(env: &Lookup<'_>, name: &str) -> Option<String> {
    env(name)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn env_or(env: &Lookup<'_>, name: &str, default: &str) -> String {
    optional_env(env, name).unwrap_or_else(|| default.to_owned())
}

fn parse_env_usize(env: &Lookup<'_>, name: &str, default: usize) -> AppResult<usize> {
    match optional_env(env, name) {
        Some(value) => value.parse::<usize>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        None => Ok(default),
    }
}

fn parse_env_u64(env: &Lookup<'_>, name: &str, default: u64) -> AppResult<u64> {
    match optional_env(env, name) {
        Some(value) => value.parse::<u64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        None => Ok(default),
    }
}

fn parse_env_bool(env: &Lookup<'_>, name: &str, default: bool) -> AppResult<bool> {
    match optional_env(env, name) {
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(AppError::Validation(format!(
                "invalid {name} value '{value}': expected true or false"
            ))),
        },
        None => Ok(default),
    }
}
