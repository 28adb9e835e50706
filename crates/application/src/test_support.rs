//! In-memory fakes of the ports shared by the service tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use orgsync_core::{AppError, AppResult};
use orgsync_domain::{
    DashboardDocument, DataSource, DataSourceSpec, GroupPath, IdentityGroup, OrgRole,
    SourceOrganization, SourceUser,
};

use crate::{
    DashboardService, DashboardSummary, Folder, IdentityProvider, OrgMember,
    OrgScopedDashboardClient, OrganizationSource, SourceDirectory, TargetOrg, TargetUser,
    TargetUserUpdate,
};

pub const SERVICE_LOGIN: &str = "orgsync";

pub fn source_user(login: &str) -> SourceUser {
    SourceUser::from_names(
        format!("id-{login}"),
        login,
        format!("{login}@example.com"),
        login,
        "",
    )
    .unwrap_or_else(|_| unreachable!())
}

pub fn source_organization(key: &str, display_name: &str) -> SourceOrganization {
    SourceOrganization::new(
        key,
        Some(display_name.to_owned()),
        GroupPath::parse(format!("/organizations/{key}")),
        Vec::new(),
    )
    .unwrap_or_else(|_| unreachable!())
}

pub fn group(path: &str, attributes: &[(&str, &str)], sub_groups: Vec<IdentityGroup>) -> IdentityGroup {
    let name = path.rsplit('/').next().unwrap_or_default();
    IdentityGroup::new(
        format!("gid-{name}"),
        name,
        GroupPath::parse(path),
        attributes
            .iter()
            .map(|(key, value)| ((*key).to_owned(), vec![(*value).to_owned()]))
            .collect(),
        sub_groups,
    )
}

#[derive(Default)]
pub struct FakeIdentityProvider {
    pub users: Vec<SourceUser>,
    pub tree: Vec<IdentityGroup>,
    pub memberships: BTreeMap<String, Vec<GroupPath>>,
    pub fail_memberships: bool,
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn fetch_users(&self) -> AppResult<Vec<SourceUser>> {
        Ok(self.users.clone())
    }

    async fn fetch_group_tree(&self) -> AppResult<Vec<IdentityGroup>> {
        Ok(self.tree.clone())
    }

    async fn fetch_memberships(
        &self,
        users: &[SourceUser],
    ) -> AppResult<BTreeMap<String, Vec<GroupPath>>> {
        if self.fail_memberships {
            return Err(AppError::Internal(
                "could not fetch 1 of 1 group memberships".to_owned(),
            ));
        }

        Ok(users
            .iter()
            .map(|user| {
                (
                    user.login().to_owned(),
                    self.memberships.get(user.login()).cloned().unwrap_or_default(),
                )
            })
            .collect())
    }
}

#[derive(Default)]
pub struct FakeOrganizationSource {
    pub users: Vec<SourceUser>,
    pub directory: SourceDirectory,
}

#[async_trait]
impl OrganizationSource for FakeOrganizationSource {
    async fn fetch_users(&self) -> AppResult<Vec<SourceUser>> {
        Ok(self.users.clone())
    }

    async fn fetch_directory(&self, users: &[SourceUser]) -> AppResult<SourceDirectory> {
        let logins: BTreeSet<&str> = users.iter().map(SourceUser::login).collect();
        let mut directory = self.directory.clone();
        directory
            .memberships
            .retain(|login, _| logins.contains(login.as_str()));
        directory
            .admins
            .retain(|login| logins.contains(login.as_str()));
        Ok(directory)
    }
}

#[derive(Default)]
pub struct DashboardState {
    pub users: Vec<TargetUser>,
    pub orgs: Vec<TargetOrg>,
    pub members: BTreeMap<i64, Vec<OrgMember>>,
    pub data_sources: BTreeMap<i64, Vec<DataSource>>,
    pub folders: BTreeMap<i64, Vec<Folder>>,
    pub dashboards: BTreeMap<i64, Vec<DashboardSummary>>,
    pub created_documents: Vec<(i64, DashboardDocument)>,
    pub auto_assign_org_id: i64,
    pub rejected_logins: BTreeSet<String>,
    pub mutations: Vec<String>,
    next_id: i64,
}

impl DashboardState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id + 1000
    }

    fn record(&mut self, mutation: String) {
        self.mutations.push(mutation);
    }
}

/// Stateful fake of the dashboard service; every mutating call is logged.
#[derive(Clone, Default)]
pub struct FakeDashboardService {
    state: Arc<Mutex<DashboardState>>,
}

impl FakeDashboardService {
    pub fn state(&self) -> MutexGuard<'_, DashboardState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn mutations(&self) -> Vec<String> {
        self.state().mutations.clone()
    }

    pub fn clear_mutations(&self) {
        self.state().mutations.clear();
    }

    pub fn add_user(&self, id: i64, login: &str, email: &str, name: &str) {
        self.state().users.push(TargetUser {
            id,
            login: login.to_owned(),
            email: email.to_owned(),
            name: name.to_owned(),
            is_admin: false,
        });
    }

    pub fn add_org(&self, id: i64, name: &str) {
        self.state().orgs.push(TargetOrg {
            id,
            name: name.to_owned(),
        });
    }

    pub fn add_member(&self, org_id: i64, user_id: i64, login: &str, role: &str) {
        self.state()
            .members
            .entry(org_id)
            .or_default()
            .push(OrgMember {
                user_id,
                login: login.to_owned(),
                role: role.to_owned(),
            });
    }

    pub fn members(&self, org_id: i64) -> Vec<OrgMember> {
        self.state().members.get(&org_id).cloned().unwrap_or_default()
    }

    pub fn org_named(&self, name: &str) -> Option<TargetOrg> {
        self.state().orgs.iter().find(|org| org.name == name).cloned()
    }
}

#[async_trait]
impl DashboardService for FakeDashboardService {
    fn service_login(&self) -> &str {
        SERVICE_LOGIN
    }

    async fn list_users(&self) -> AppResult<Vec<TargetUser>> {
        Ok(self.state().users.clone())
    }

    async fn update_user(&self, update: &TargetUserUpdate) -> AppResult<()> {
        let mut state = self.state();
        let user = state
            .users
            .iter_mut()
            .find(|user| user.id == update.id)
            .ok_or_else(|| AppError::NotFound(format!("user {}", update.id)))?;
        user.login = update.login.clone();
        user.email = update.email.clone();
        user.name = update.name.clone();
        if update.revoke_server_admin {
            user.is_admin = false;
        }
        state.record(format!("update_user {}", update.login));
        Ok(())
    }

    async fn delete_user(&self, user_id: i64) -> AppResult<()> {
        let mut state = self.state();
        state.users.retain(|user| user.id != user_id);
        for members in state.members.values_mut() {
            members.retain(|member| member.user_id != user_id);
        }
        state.record(format!("delete_user {user_id}"));
        Ok(())
    }

    async fn list_orgs(&self) -> AppResult<Vec<TargetOrg>> {
        Ok(self.state().orgs.clone())
    }

    async fn find_org(&self, org_id: i64) -> AppResult<TargetOrg> {
        self.state()
            .orgs
            .iter()
            .find(|org| org.id == org_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("org {org_id}")))
    }

    async fn create_org(&self, name: &str) -> AppResult<TargetOrg> {
        let mut state = self.state();
        let org = TargetOrg {
            id: state.next_id(),
            name: name.to_owned(),
        };
        state.orgs.push(org.clone());
        state.record(format!("create_org {name}"));
        Ok(org)
    }

    async fn rename_org(&self, org_id: i64, name: &str) -> AppResult<()> {
        let mut state = self.state();
        if let Some(org) = state.orgs.iter_mut().find(|org| org.id == org_id) {
            org.name = name.to_owned();
        }
        state.record(format!("rename_org {org_id} {name}"));
        Ok(())
    }

    async fn delete_org(&self, org_id: i64) -> AppResult<()> {
        let mut state = self.state();
        state.orgs.retain(|org| org.id != org_id);
        state.members.remove(&org_id);
        state.record(format!("delete_org {org_id}"));
        Ok(())
    }

    async fn list_org_members(&self, org_id: i64) -> AppResult<Vec<OrgMember>> {
        Ok(self.members(org_id))
    }

    async fn add_org_member(&self, org_id: i64, login: &str, role: OrgRole) -> AppResult<()> {
        let mut state = self.state();
        if state.rejected_logins.contains(login) {
            return Err(AppError::Conflict(format!("user {login} vanished")));
        }
        let user_id = state
            .users
            .iter()
            .find(|user| user.login == login)
            .map(|user| user.id)
            .ok_or_else(|| AppError::NotFound(format!("user {login}")))?;
        state.members.entry(org_id).or_default().push(OrgMember {
            user_id,
            login: login.to_owned(),
            role: role.as_str().to_owned(),
        });
        state.record(format!("add_org_member {org_id} {login} {}", role.as_str()));
        Ok(())
    }

    async fn update_org_member_role(
        &self,
        org_id: i64,
        user_id: i64,
        role: OrgRole,
    ) -> AppResult<()> {
        let mut state = self.state();
        if let Some(member) = state
            .members
            .entry(org_id)
            .or_default()
            .iter_mut()
            .find(|member| member.user_id == user_id)
        {
            member.role = role.as_str().to_owned();
        }
        state.record(format!("update_org_member_role {org_id} {user_id} {}", role.as_str()));
        Ok(())
    }

    async fn remove_org_member(&self, org_id: i64, user_id: i64) -> AppResult<()> {
        let mut state = self.state();
        state
            .members
            .entry(org_id)
            .or_default()
            .retain(|member| member.user_id != user_id);
        state.record(format!("remove_org_member {org_id} {user_id}"));
        Ok(())
    }

    async fn auto_assign_org_id(&self) -> AppResult<i64> {
        Ok(self.state().auto_assign_org_id)
    }

    fn for_organization(&self, org_id: i64) -> AppResult<Arc<dyn OrgScopedDashboardClient>> {
        Ok(Arc::new(FakeOrgClient {
            state: self.state.clone(),
            org_id,
        }))
    }
}

struct FakeOrgClient {
    state: Arc<Mutex<DashboardState>>,
    org_id: i64,
}

impl FakeOrgClient {
    fn state(&self) -> MutexGuard<'_, DashboardState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl OrgScopedDashboardClient for FakeOrgClient {
    fn org_id(&self) -> i64 {
        self.org_id
    }

    async fn list_data_sources(&self) -> AppResult<Vec<DataSource>> {
        Ok(self
            .state()
            .data_sources
            .get(&self.org_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_data_source(&self, spec: &DataSourceSpec) -> AppResult<DataSource> {
        let mut state = self.state();
        let id = state.next_id();
        let data_source = DataSource::from_spec(id, format!("uid-{id}"), spec);
        state
            .data_sources
            .entry(self.org_id)
            .or_default()
            .push(data_source.clone());
        state.record(format!("create_data_source {} {}", self.org_id, spec.name));
        Ok(data_source)
    }

    async fn update_data_source(
        &self,
        id: i64,
        uid: &str,
        spec: &DataSourceSpec,
    ) -> AppResult<DataSource> {
        let mut state = self.state();
        let data_source = DataSource::from_spec(id, uid, spec);
        let entries = state.data_sources.entry(self.org_id).or_default();
        entries.retain(|existing| existing.id != id);
        entries.push(data_source.clone());
        state.record(format!("update_data_source {} {}", self.org_id, spec.name));
        Ok(data_source)
    }

    async fn delete_data_source(&self, id: i64) -> AppResult<()> {
        let mut state = self.state();
        state
            .data_sources
            .entry(self.org_id)
            .or_default()
            .retain(|existing| existing.id != id);
        state.record(format!("delete_data_source {} {id}", self.org_id));
        Ok(())
    }

    async fn list_folders(&self) -> AppResult<Vec<Folder>> {
        Ok(self
            .state()
            .folders
            .get(&self.org_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_folder(&self, title: &str) -> AppResult<Folder> {
        // The root folder is built in and cannot be created.
        if title.eq_ignore_ascii_case("general") {
            return Err(AppError::Internal(format!(
                "folder creation rejected for reserved title '{title}'"
            )));
        }

        let mut state = self.state();
        let id = state.next_id();
        let folder = Folder {
            uid: format!("folder-{id}"),
            title: title.to_owned(),
        };
        state
            .folders
            .entry(self.org_id)
            .or_default()
            .push(folder.clone());
        state.record(format!("create_folder {} {title}", self.org_id));
        Ok(folder)
    }

    async fn list_dashboards(&self) -> AppResult<Vec<DashboardSummary>> {
        Ok(self
            .state()
            .dashboards
            .get(&self.org_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_dashboard(
        &self,
        document: &DashboardDocument,
        folder_uid: &str,
    ) -> AppResult<()> {
        let title = document.title()?.to_owned();
        let mut state = self.state();
        let id = state.next_id();
        let folder_title = state
            .folders
            .get(&self.org_id)
            .and_then(|folders| folders.iter().find(|folder| folder.uid == folder_uid))
            .map(|folder| folder.title.clone());
        state
            .dashboards
            .entry(self.org_id)
            .or_default()
            .push(DashboardSummary {
                uid: format!("dash-{id}"),
                title: title.clone(),
                folder_title,
            });
        state
            .created_documents
            .push((self.org_id, document.clone()));
        state.record(format!("create_dashboard {} {title}", self.org_id));
        Ok(())
    }
}
