use orgsync_core::AppResult;
use orgsync_domain::{DashboardDefinition, DataSourceRef};
use tracing::info;

use crate::{DashboardSummary, Folder, OrgScopedDashboardClient};

/// Title of the built-in root folder. It is not listed by the folder API and
/// cannot be created.
const ROOT_FOLDER_TITLE: &str = "General";

/// Ensures every definition exists in its folder. Existing dashboards are
/// identified by folder and title and never rewritten.
pub(super) async fn sync_dashboards(
    client: &dyn OrgScopedDashboardClient,
    data_source: &DataSourceRef,
    definitions: &[DashboardDefinition],
) -> AppResult<()> {
    if definitions.is_empty() {
        return Ok(());
    }

    let org_id = client.org_id();
    let mut folders = client.list_folders().await?;
    let mut dashboards = client.list_dashboards().await?;

    for definition in definitions {
        let title = definition.document().title()?;

        // Root dashboards carry no folder title and are saved with an empty folder UID.
        let folder = if is_root_folder(definition.folder()) {
            None
        } else {
            Some(ensure_folder(client, &mut folders, definition.folder()).await?)
        };
        let folder_title = folder.as_ref().map(|folder| folder.title.as_str());

        let exists = dashboards.iter().any(|dashboard| {
            dashboard.title == title && dashboard.folder_title.as_deref() == folder_title
        });
        if exists {
            continue;
        }

        let document = definition.document().normalized_for(data_source)?;
        info!(org_id, title = %title, folder = %definition.folder(), "creating dashboard");
        client
            .create_dashboard(
                &document,
                folder.as_ref().map_or("", |folder| folder.uid.as_str()),
            )
            .await?;
        dashboards.push(DashboardSummary {
            uid: String::new(),
            title: title.to_owned(),
            folder_title: folder_title.map(str::to_owned),
        });
    }

    Ok(())
}

fn is_root_folder(title: &str) -> bool {
    title.eq_ignore_ascii_case(ROOT_FOLDER_TITLE)
}

async fn ensure_folder(
    client: &dyn OrgScopedDashboardClient,
    folders: &mut Vec<Folder>,
    title: &str,
) -> AppResult<Folder> {
    if let Some(folder) = folders.iter().find(|folder| folder.title == title) {
        return Ok(folder.clone());
    }

    info!(org_id = client.org_id(), folder = %title, "creating dashboard folder");
    let folder = client.create_folder(title).await?;
    folders.push(folder.clone());
    Ok(folder)
}
