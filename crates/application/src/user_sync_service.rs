use std::collections::BTreeMap;
use std::sync::Arc;

use orgsync_core::AppResult;
use orgsync_domain::SourceUser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cancellation::checkpoint;
use crate::{DashboardService, RESERVED_ADMIN_LOGIN, TargetUser, TargetUserUpdate};

/// Converges the dashboard service's global users to the source users.
///
/// Users are never created here: the dashboard service provisions them on
/// first login. Existing users get their profile corrected and lose the
/// server-admin flag; users unknown to the source are deleted.
#[derive(Clone)]
pub struct UserSyncService {
    dashboard: Arc<dyn DashboardService>,
}

impl UserSyncService {
    /// Creates the service.
    #[must_use]
    pub fn new(dashboard: Arc<dyn DashboardService>) -> Self {
        Self { dashboard }
    }

    /// Runs one user sync and returns the source users that exist in the
    /// dashboard service.
    pub async fn sync_users(
        &self,
        source_users: &[SourceUser],
        cancel: &CancellationToken,
    ) -> AppResult<Vec<SourceUser>> {
        let service_login = self.dashboard.service_login().to_owned();
        let mut target_users: BTreeMap<String, TargetUser> = self
            .dashboard
            .list_users()
            .await?
            .into_iter()
            .filter(|user| user.login != RESERVED_ADMIN_LOGIN && user.login != service_login)
            .map(|user| (user.login.clone(), user))
            .collect();

        let mut synced_users = Vec::new();
        for source_user in source_users {
            if let Some(target_user) = target_users.remove(source_user.login()) {
                if profile_differs(&target_user, source_user) {
                    info!(login = %source_user.login(), "user differs, fixing");
                    let update = TargetUserUpdate {
                        id: target_user.id,
                        login: source_user.login().to_owned(),
                        email: source_user.email().to_owned(),
                        name: source_user.display_name().to_owned(),
                        revoke_server_admin: target_user.is_admin,
                    };
                    if let Err(error) = self.dashboard.update_user(&update).await {
                        warn!(login = %source_user.login(), error = %error, "failed to fix user");
                    }
                }
                synced_users.push(source_user.clone());
            }

            checkpoint(cancel)?;
        }

        for stale_user in target_users.into_values() {
            info!(
                login = %stale_user.login,
                user_id = stale_user.id,
                "user not found in source, removing"
            );
            if let Err(error) = self.dashboard.delete_user(stale_user.id).await {
                warn!(login = %stale_user.login, error = %error, "failed to remove user");
            }

            checkpoint(cancel)?;
        }

        Ok(synced_users)
    }
}

fn profile_differs(target: &TargetUser, source: &SourceUser) -> bool {
    target.is_admin
        || target.email != source.email()
        || target.login != source.login()
        || target.name != source.display_name()
}

#[cfg(test)]
mod tests;
