use orgsync_domain::DataSourceSpec;
use serde_json::{Map, Value, json};

/// Name of the metrics data source every org receives.
pub const METRICS_DATA_SOURCE_NAME: &str = "Mimir";

/// Name of the alerting data source every org receives.
pub const ALERTING_DATA_SOURCE_NAME: &str = "Mimir Alertmanager";

/// Header carrying the tenant of a data source request.
const TENANT_HEADER: &str = "X-Scope-OrgID";

/// Immutable settings of a reconciliation pass, built once at startup.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Group path whose members administer every organization.
    pub admin_group_path: Option<String>,
    /// Path of the group whose children are the organizations.
    pub organizations_root: String,
    /// Connection settings for the per-org data sources.
    pub data_source: DataSourceSettings,
    /// Whether members of the auto-assign org are evicted.
    pub clear_auto_assign_org: bool,
}

/// Backend shared by all per-org data sources.
#[derive(Debug, Clone)]
pub struct DataSourceSettings {
    /// Base URL of the metrics backend.
    pub url: String,
    /// Basic auth user, if the backend requires one.
    pub username: Option<String>,
    /// Basic auth password.
    pub password: Option<String>,
}

impl DataSourceSettings {
    /// Returns the data sources an org must own, tenant-scoped by `org_key`.
    #[must_use]
    pub fn required_data_sources(&self, org_key: &str) -> Vec<DataSourceSpec> {
        vec![
            self.spec(
                METRICS_DATA_SOURCE_NAME,
                "prometheus",
                "prometheus",
                true,
                json!({
                    "httpHeaderName1": TENANT_HEADER,
                    "httpMethod": "POST",
                    "prometheusType": "Mimir",
                }),
                org_key,
            ),
            self.spec(
                ALERTING_DATA_SOURCE_NAME,
                "alertmanager",
                "alertmanager",
                false,
                json!({
                    "httpHeaderName1": TENANT_HEADER,
                    "implementation": "mimir",
                    "handleGrafanaManagedAlerts": false,
                }),
                org_key,
            ),
        ]
    }

    fn spec(
        &self,
        name: &str,
        kind: &str,
        path: &str,
        is_default: bool,
        json_data: Value,
        org_key: &str,
    ) -> DataSourceSpec {
        let basic_auth_user = self
            .username
            .clone()
            .filter(|username| !username.is_empty())
            .unwrap_or_default();

        let mut secure_json_data = Map::new();
        secure_json_data.insert("httpHeaderValue1".to_owned(), Value::from(org_key));
        if let Some(password) = self.password.as_deref().filter(|value| !value.is_empty()) {
            secure_json_data.insert("basicAuthPassword".to_owned(), Value::from(password));
        }

        DataSourceSpec {
            name: name.to_owned(),
            kind: kind.to_owned(),
            url: format!("{}/{path}", self.url.trim_end_matches('/')),
            access: "proxy".to_owned(),
            is_default,
            basic_auth: !basic_auth_user.is_empty(),
            basic_auth_user,
            json_data,
            secure_json_data,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::{DataSourceSettings, METRICS_DATA_SOURCE_NAME};

    #[test]
    fn data_sources_are_scoped_to_the_org_tenant() {
        let settings = DataSourceSettings {
            url: "http://mimir:8080/".to_owned(),
            username: Some("reader".to_owned()),
            password: Some("secret".to_owned()),
        };

        let specs = settings.required_data_sources("acme");
        assert_eq!(specs.len(), 2);

        let metrics = &specs[0];
        assert_eq!(metrics.name, METRICS_DATA_SOURCE_NAME);
        assert_eq!(metrics.url, "http://mimir:8080/prometheus");
        assert!(metrics.is_default);
        assert!(metrics.basic_auth);
        assert_eq!(
            metrics.secure_json_data.get("httpHeaderValue1"),
            Some(&Value::from("acme"))
        );
        assert!(specs.iter().filter(|spec| spec.is_default).count() == 1);
    }

    #[test]
    fn basic_auth_is_off_without_username() {
        let settings = DataSourceSettings {
            url: "http://mimir:8080".to_owned(),
            username: None,
            password: None,
        };

        let specs = settings.required_data_sources("acme");
        assert!(specs.iter().all(|spec| !spec.basic_auth));
        assert!(
            specs
                .iter()
                .all(|spec| !spec.secure_json_data.contains_key("basicAuthPassword"))
        );
    }
}
