use serde::{Deserialize, Serialize};

/// Org-scoped role in the dashboard service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrgRole {
    /// Full org administration.
    Admin,
    /// May edit dashboards.
    Editor,
    /// Read-only access.
    Viewer,
}

impl OrgRole {
    /// Returns the wire representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Editor => "Editor",
            Self::Viewer => "Viewer",
        }
    }

    /// Parses a role case-insensitively. Unknown roles such as `None` yield
    /// `None`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        [Self::Admin, Self::Editor, Self::Viewer]
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(value))
    }
}

/// Roles granted to members of an organization, best first.
pub const MEMBER_ROLES: [OrgRole; 2] = [OrgRole::Editor, OrgRole::Viewer];

/// Roles granted to admins on every organization, best first.
pub const ADMIN_ROLES: [OrgRole; 3] = [OrgRole::Admin, OrgRole::Editor, OrgRole::Viewer];

/// Desired role assignment of one user on one organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredPermission {
    organization: String,
    login: String,
    roles: Vec<OrgRole>,
}

impl DesiredPermission {
    /// Permission of a regular organization member.
    #[must_use]
    pub fn member(organization: impl Into<String>, login: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            login: login.into(),
            roles: MEMBER_ROLES.to_vec(),
        }
    }

    /// Permission of an admin.
    #[must_use]
    pub fn admin(organization: impl Into<String>, login: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            login: login.into(),
            roles: ADMIN_ROLES.to_vec(),
        }
    }

    /// Returns the organization key.
    #[must_use]
    pub fn organization(&self) -> &str {
        self.organization.as_str()
    }

    /// Returns the user login.
    #[must_use]
    pub fn login(&self) -> &str {
        self.login.as_str()
    }

    /// Returns the acceptable roles, best first.
    #[must_use]
    pub fn roles(&self) -> &[OrgRole] {
        self.roles.as_slice()
    }

    /// Returns the role assigned when the current one is missing or wrong.
    #[must_use]
    pub fn preferred_role(&self) -> OrgRole {
        self.roles.first().copied().unwrap_or(OrgRole::Viewer)
    }

    /// Returns whether an observed role string is acceptable.
    #[must_use]
    pub fn accepts(&self, observed_role: &str) -> bool {
        OrgRole::parse(observed_role).is_some_and(|role| self.roles.contains(&role))
    }
}
