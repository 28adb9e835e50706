//! Organizations on both sides and the correlation key linking them.

use orgsync_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

use crate::{GroupPath, IdentityGroup};

/// Separator between correlation key and display name in target org names.
pub const ORG_NAME_SEPARATOR: &str = " - ";

/// Organization discovered in the source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceOrganization {
    key: NonEmptyString,
    display_name: String,
    path: GroupPath,
    teams: Vec<String>,
}

impl SourceOrganization {
    /// Creates a source organization.
    ///
    /// The key becomes the correlation key of the target org and therefore
    /// must not contain whitespace. A missing or empty display name falls
    /// back to the key.
    pub fn new(
        key: impl Into<String>,
        display_name: Option<String>,
        path: GroupPath,
        teams: Vec<String>,
    ) -> AppResult<Self> {
        let key = NonEmptyString::new(key)?;
        if key.as_str().chars().any(char::is_whitespace) {
            return Err(AppError::Validation(format!(
                "organization key '{}' must not contain whitespace",
                key.as_str()
            )));
        }

        let display_name = display_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| key.as_str().to_owned());

        Ok(Self {
            key,
            display_name,
            path,
            teams,
        })
    }

    /// Builds an organization from a two-level group; its subgroups are kept
    /// as team names only.
    pub fn from_group(group: &IdentityGroup) -> AppResult<Self> {
        Self::new(
            group.name(),
            group.display_name_attribute().map(str::to_owned),
            group.path().clone(),
            group
                .sub_groups()
                .iter()
                .map(|team| team.name().to_owned())
                .collect(),
        )
    }

    /// Returns the correlation key.
    #[must_use]
    pub fn key(&self) -> &str {
        self.key.as_str()
    }

    /// Returns the resolved display name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the group path of the organization.
    #[must_use]
    pub fn path(&self) -> &GroupPath {
        &self.path
    }

    /// Returns team names below the organization.
    #[must_use]
    pub fn teams(&self) -> &[String] {
        self.teams.as_slice()
    }

    /// Returns the name the org must carry in the dashboard service.
    #[must_use]
    pub fn target_org_name(&self) -> String {
        format!(
            "{}{ORG_NAME_SEPARATOR}{}",
            self.key.as_str(),
            self.display_name
        )
    }
}

/// Extracts the correlation key from a target org name.
///
/// Returns `None` for orgs this system does not manage: names without the
/// separator, and names whose prefix is empty or contains a space.
#[must_use]
pub fn correlation_key(target_org_name: &str) -> Option<&str> {
    let (key, _) = target_org_name.split_once(ORG_NAME_SEPARATOR)?;
    if key.is_empty() || key.contains(' ') {
        return None;
    }

    Some(key)
}
