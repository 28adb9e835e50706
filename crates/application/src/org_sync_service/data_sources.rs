use orgsync_core::AppResult;
use orgsync_domain::{DataSource, DataSourceSpec};
use tracing::info;

use crate::OrgScopedDashboardClient;

/// Makes the org's data sources exactly `specs`, returning them in spec
/// order. Foreign data sources are deleted.
pub(super) async fn sync_data_sources(
    client: &dyn OrgScopedDashboardClient,
    specs: &[DataSourceSpec],
) -> AppResult<Vec<DataSource>> {
    let org_id = client.org_id();
    let mut reconciled: Vec<Option<DataSource>> = vec![None; specs.len()];

    for existing in client.list_data_sources().await? {
        let Some(index) = specs.iter().position(|spec| spec.name == existing.name) else {
            info!(
                org_id,
                data_source_id = existing.id,
                name = %existing.name,
                "organization has invalid data source, removing"
            );
            client.delete_data_source(existing.id).await?;
            continue;
        };

        let spec = &specs[index];
        if spec.differs_from(&existing) {
            info!(org_id, name = %spec.name, "organization has misconfigured data source, fixing");
            let updated = client
                .update_data_source(existing.id, existing.uid.as_str(), spec)
                .await?;
            reconciled[index] = Some(updated);
        } else {
            reconciled[index] = Some(existing);
        }
    }

    let mut data_sources = Vec::with_capacity(specs.len());
    for (spec, data_source) in specs.iter().zip(reconciled) {
        let data_source = match data_source {
            Some(data_source) => data_source,
            None => {
                info!(org_id, name = %spec.name, "organization missing data source, creating");
                client.create_data_source(spec).await?
            }
        };
        data_sources.push(data_source);
    }

    Ok(data_sources)
}
