//! Dashboard documents shipped with the controller.

use orgsync_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::DataSourceRef;

/// Keys carried over from an export that must not reach a new org.
const EXPORT_ONLY_KEYS: [&str; 4] = ["id", "uid", "version", "time"];

/// Dashboard model as an ordered JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct DashboardDocument(Map<String, Value>);

impl DashboardDocument {
    /// Wraps a JSON value, which must be an object with a string `title`.
    pub fn from_value(value: Value) -> AppResult<Self> {
        let Value::Object(fields) = value else {
            return Err(AppError::Validation(
                "invalid dashboard format: document is not an object".to_owned(),
            ));
        };

        let document = Self(fields);
        document.title()?;
        Ok(document)
    }

    /// Returns the dashboard title.
    pub fn title(&self) -> AppResult<&str> {
        self.0
            .get("title")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                AppError::Validation("invalid dashboard format: 'title' key not found".to_owned())
            })
    }

    /// Returns whether a top-level key is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns a top-level field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns a copy prepared for creation in one org: export identity and
    /// time range are removed, every panel and template variable points at
    /// `data_source`, and template variables lose their current selection.
    pub fn normalized_for(&self, data_source: &DataSourceRef) -> AppResult<Self> {
        self.title()?;

        let reference = serde_json::to_value(data_source).map_err(|error| {
            AppError::Internal(format!("failed to encode data source reference: {error}"))
        })?;

        let mut fields = self.0.clone();
        for key in EXPORT_ONLY_KEYS {
            fields.shift_remove(key);
        }

        if let Some(panels) = fields.get_mut("panels") {
            for panel in object_list_mut(panels, "panels")? {
                panel.insert("datasource".to_owned(), reference.clone());
            }
        }

        if let Some(templating) = fields.get_mut("templating") {
            let templating = templating.as_object_mut().ok_or_else(|| {
                AppError::Validation(
                    "invalid dashboard format: 'templating' does not contain map".to_owned(),
                )
            })?;

            if let Some(list) = templating.get_mut("list") {
                for variable in object_list_mut(list, "templating.list")? {
                    variable.insert("datasource".to_owned(), reference.clone());
                    variable.shift_remove("current");
                }
            }
        }

        Ok(Self(fields))
    }

    /// Returns the document as a JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl TryFrom<Value> for DashboardDocument {
    type Error = AppError;

    fn try_from(value: Value) -> AppResult<Self> {
        Self::from_value(value)
    }
}

impl From<DashboardDocument> for Value {
    fn from(value: DashboardDocument) -> Self {
        Value::Object(value.0)
    }
}

fn object_list_mut<'a>(
    value: &'a mut Value,
    field: &str,
) -> AppResult<Vec<&'a mut Map<String, Value>>> {
    let items = value.as_array_mut().ok_or_else(|| {
        AppError::Validation(format!(
            "invalid dashboard format: '{field}' does not contain array"
        ))
    })?;

    items
        .iter_mut()
        .enumerate()
        .map(|(index, item)| {
            item.as_object_mut().ok_or_else(|| {
                AppError::Validation(format!(
                    "invalid dashboard format: '{field}[{index}]' is not a map"
                ))
            })
        })
        .collect()
}

/// Dashboard to be present in every managed org.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardDefinition {
    folder: String,
    document: DashboardDocument,
}

impl DashboardDefinition {
    /// Creates a dashboard definition for the given folder title.
    #[must_use]
    pub fn new(folder: impl Into<String>, document: DashboardDocument) -> Self {
        Self {
            folder: folder.into(),
            document,
        }
    }

    /// Returns the folder title.
    #[must_use]
    pub fn folder(&self) -> &str {
        self.folder.as_str()
    }

    /// Returns the dashboard model.
    #[must_use]
    pub fn document(&self) -> &DashboardDocument {
        &self.document
    }
}
