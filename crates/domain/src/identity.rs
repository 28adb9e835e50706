//! Identity-backend shapes: users, group paths and group trees.

use std::collections::BTreeMap;

use orgsync_core::{AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

/// Group attribute holding the human readable organization name.
pub const DISPLAY_NAME_ATTRIBUTE: &str = "displayName";

/// User as known to the source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUser {
    id: NonEmptyString,
    login: NonEmptyString,
    email: String,
    display_name: String,
}

impl SourceUser {
    /// Creates a source user with an already resolved display name.
    pub fn new(
        id: impl Into<String>,
        login: impl Into<String>,
        email: impl Into<String>,
        display_name: impl Into<String>,
    ) -> AppResult<Self> {
        Ok(Self {
            id: NonEmptyString::new(id)?,
            login: NonEmptyString::new(login)?,
            email: email.into(),
            display_name: display_name.into(),
        })
    }

    /// Creates a source user whose display name is derived from first and
    /// last name, falling back to the email address.
    pub fn from_names(
        id: impl Into<String>,
        login: impl Into<String>,
        email: impl Into<String>,
        first_name: &str,
        last_name: &str,
    ) -> AppResult<Self> {
        let email = email.into();
        let display_name = derive_display_name(email.as_str(), first_name, last_name);
        Self::new(id, login, email, display_name)
    }

    /// Returns the backend-internal identifier used for per-user lookups.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the login, which is also the login in the dashboard service.
    #[must_use]
    pub fn login(&self) -> &str {
        self.login.as_str()
    }

    /// Returns the email address.
    #[must_use]
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Returns the display name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }
}

/// Computes the display name shown in the dashboard service.
#[must_use]
pub fn derive_display_name(email: &str, first_name: &str, last_name: &str) -> String {
    match (first_name.is_empty(), last_name.is_empty()) {
        (true, true) => email.to_owned(),
        (false, true) => first_name.to_owned(),
        (true, false) => last_name.to_owned(),
        (false, false) => format!("{first_name} {last_name}"),
    }
}

/// Slash separated group path such as `/organizations/acme/team-a`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupPath {
    raw: String,
    segments: Vec<String>,
}

impl GroupPath {
    /// Parses a group path. A leading slash is optional.
    #[must_use]
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let segments = raw
            .strip_prefix('/')
            .unwrap_or(raw.as_str())
            .split('/')
            .map(str::to_owned)
            .collect();

        Self { raw, segments }
    }

    /// Returns the path exactly as delivered by the backend.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.raw.as_str()
    }

    /// Returns the path segments without the leading slash.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        self.segments.as_slice()
    }

    /// Returns the organization segment (second segment), if any.
    #[must_use]
    pub fn organization_segment(&self) -> Option<&str> {
        self.segments.get(1).map(String::as_str)
    }

    /// Two paths belong to the same organization when root and organization
    /// segments match. Team segments are ignored.
    #[must_use]
    pub fn same_organization(&self, other: &GroupPath) -> bool {
        match (self.segments.get(..2), other.segments.get(..2)) {
            (Some(left), Some(right)) => left == right,
            _ => false,
        }
    }
}

/// Node of the identity backend's group tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityGroup {
    id: String,
    name: String,
    path: GroupPath,
    attributes: BTreeMap<String, Vec<String>>,
    sub_groups: Vec<IdentityGroup>,
}

impl IdentityGroup {
    /// Creates a group node.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        path: GroupPath,
        attributes: BTreeMap<String, Vec<String>>,
        sub_groups: Vec<IdentityGroup>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            path,
            attributes,
            sub_groups,
        }
    }

    /// Returns the backend identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the group name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the full group path.
    #[must_use]
    pub fn path(&self) -> &GroupPath {
        &self.path
    }

    /// Returns the direct child groups.
    #[must_use]
    pub fn sub_groups(&self) -> &[IdentityGroup] {
        self.sub_groups.as_slice()
    }

    /// Returns the first non-empty `displayName` attribute value.
    #[must_use]
    pub fn display_name_attribute(&self) -> Option<&str> {
        self.attributes
            .get(DISPLAY_NAME_ATTRIBUTE)
            .and_then(|values| values.first())
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Depth-first search for the group with the given full path.
    #[must_use]
    pub fn find_by_path<'a>(groups: &'a [IdentityGroup], path: &str) -> Option<&'a IdentityGroup> {
        groups.iter().find_map(|group| {
            if group.path.as_str() == path {
                Some(group)
            } else {
                Self::find_by_path(group.sub_groups.as_slice(), path)
            }
        })
    }
}
