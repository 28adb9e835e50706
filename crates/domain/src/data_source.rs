//! Desired and observed data sources of one org.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Data source as reported by the dashboard service.
///
/// Secure fields are write-only on the service side and therefore absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    /// Numeric identifier within the org.
    pub id: i64,
    /// Stable unique identifier referenced from dashboards.
    pub uid: String,
    /// Logical name, unique per org.
    pub name: String,
    /// Plugin type, e.g. `prometheus`.
    pub kind: String,
    /// Backend URL.
    pub url: String,
    /// Access mode, e.g. `proxy`.
    pub access: String,
    /// Whether this is the org default.
    pub is_default: bool,
    /// Whether basic auth is enabled.
    pub basic_auth: bool,
    /// Basic auth user name.
    pub basic_auth_user: String,
    /// Plugin specific options.
    pub json_data: Value,
}

impl DataSource {
    /// Returns the reference dashboards use to point at this data source.
    #[must_use]
    pub fn reference(&self) -> DataSourceRef {
        DataSourceRef {
            kind: self.kind.clone(),
            uid: self.uid.clone(),
        }
    }

    /// Builds the observed state the service holds after writing `spec`
    /// under the given identity.
    #[must_use]
    pub fn from_spec(id: i64, uid: impl Into<String>, spec: &DataSourceSpec) -> Self {
        Self {
            id,
            uid: uid.into(),
            name: spec.name.clone(),
            kind: spec.kind.clone(),
            url: spec.url.clone(),
            access: spec.access.clone(),
            is_default: spec.is_default,
            basic_auth: spec.basic_auth,
            basic_auth_user: spec.basic_auth_user.clone(),
            json_data: spec.json_data.clone(),
        }
    }
}

/// Declarative description of a required data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSourceSpec {
    /// Logical name the data source is matched by.
    pub name: String,
    /// Plugin type.
    pub kind: String,
    /// Backend URL.
    pub url: String,
    /// Access mode.
    pub access: String,
    /// Whether this is the org default.
    pub is_default: bool,
    /// Whether basic auth is enabled.
    pub basic_auth: bool,
    /// Basic auth user name.
    pub basic_auth_user: String,
    /// Plugin specific options.
    pub json_data: Value,
    /// Write-only options (passwords, header values).
    pub secure_json_data: Map<String, Value>,
}

impl DataSourceSpec {
    /// Returns whether the observed data source drifted from this spec.
    ///
    /// Secure options cannot be read back and are not compared.
    #[must_use]
    pub fn differs_from(&self, observed: &DataSource) -> bool {
        observed.name != self.name
            || observed.kind != self.kind
            || observed.url != self.url
            || observed.access != self.access
            || observed.is_default != self.is_default
            || observed.basic_auth != self.basic_auth
            || observed.basic_auth_user != self.basic_auth_user
            || observed.json_data != self.json_data
    }
}

/// Pointer from a dashboard panel to a data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceRef {
    /// Plugin type.
    #[serde(rename = "type")]
    pub kind: String,
    /// Data source UID.
    pub uid: String,
}

#[cfg(test)]
mod tests {
    use serde_json::{Map, json};

    use super::{DataSource, DataSourceSpec};

    fn spec() -> DataSourceSpec {
        DataSourceSpec {
            name: "Mimir".to_owned(),
            kind: "prometheus".to_owned(),
            url: "http://mimir/prometheus".to_owned(),
            access: "proxy".to_owned(),
            is_default: true,
            basic_auth: false,
            basic_auth_user: String::new(),
            json_data: json!({"httpMethod": "POST", "httpHeaderName1": "X-Scope-OrgID"}),
            secure_json_data: Map::new(),
        }
    }

    #[test]
    fn freshly_written_data_source_does_not_drift() {
        let spec = spec();
        let observed = DataSource::from_spec(7, "abc", &spec);
        assert!(!spec.differs_from(&observed));
        assert_eq!(observed.reference().uid, "abc");
    }

    #[test]
    fn json_option_order_is_irrelevant() {
        let spec = spec();
        let mut observed = DataSource::from_spec(7, "abc", &spec);
        observed.json_data = json!({"httpHeaderName1": "X-Scope-OrgID", "httpMethod": "POST"});
        assert!(!spec.differs_from(&observed));
    }

    #[test]
    fn changed_url_or_options_is_drift() {
        let spec = spec();
        let mut observed = DataSource::from_spec(7, "abc", &spec);
        observed.url = "http://elsewhere".to_owned();
        assert!(spec.differs_from(&observed));

        let mut observed = DataSource::from_spec(7, "abc", &spec);
        observed.json_data = json!({"httpMethod": "GET"});
        assert!(spec.differs_from(&observed));
    }
}
