use std::path::{Path, PathBuf};

use orgsync_core::{AppError, AppResult};
use orgsync_domain::{DashboardDefinition, DashboardDocument};
use serde_json::Value;
use tracing::info;

/// Loads the dashboards of the highest `v<N>` directory below `root`.
///
/// Files are read in file-name order and land in folder `General v<N>`.
/// A missing version directory or an unreadable document is an error.
pub async fn load_latest_dashboards(root: &Path) -> AppResult<Vec<DashboardDefinition>> {
    let (version, directory) = latest_version_directory(root).await?;
    let folder = format!("General v{version}");

    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(&directory)
        .await
        .map_err(|error| io_error(&directory, &error))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|error| io_error(&directory, &error))?
    {
        let path = entry.path();
        let is_json = path
            .extension()
            .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));
        if !is_json {
            continue;
        }

        let file_type = entry
            .file_type()
            .await
            .map_err(|error| io_error(&path, &error))?;
        if file_type.is_file() {
            files.push(path);
        }
    }
    files.sort();

    let mut definitions = Vec::with_capacity(files.len());
    for file in files {
        let content = tokio::fs::read(&file)
            .await
            .map_err(|error| io_error(&file, &error))?;
        let value: Value = serde_json::from_slice(&content).map_err(|error| {
            AppError::Validation(format!(
                "dashboard file '{}' is not valid JSON: {error}",
                file.display()
            ))
        })?;
        let document = DashboardDocument::from_value(value).map_err(|error| {
            AppError::Validation(format!("dashboard file '{}': {error}", file.display()))
        })?;
        definitions.push(DashboardDefinition::new(folder.as_str(), document));
    }

    info!(
        directory = %directory.display(),
        folder = %folder,
        count = definitions.len(),
        "loaded dashboards"
    );

    Ok(definitions)
}

async fn latest_version_directory(root: &Path) -> AppResult<(u32, PathBuf)> {
    let mut entries = tokio::fs::read_dir(root)
        .await
        .map_err(|error| io_error(root, &error))?;

    let mut latest: Option<(u32, PathBuf)> = None;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|error| io_error(root, &error))?
    {
        let path = entry.path();
        let file_type = entry
            .file_type()
            .await
            .map_err(|error| io_error(&path, &error))?;
        if !file_type.is_dir() {
            continue;
        }

        let Some(version) = entry
            .file_name()
            .to_str()
            .and_then(|name| name.strip_prefix('v'))
            .and_then(|number| number.parse::<u32>().ok())
        else {
            continue;
        };

        if latest.as_ref().is_none_or(|(current, _)| version > *current) {
            latest = Some((version, path));
        }
    }

    latest.ok_or_else(|| {
        AppError::Validation(format!(
            "no dashboard version directory found in '{}'",
            root.display()
        ))
    })
}

fn io_error(path: &Path, error: &std::io::Error) -> AppError {
    AppError::Internal(format!("failed to read '{}': {error}", path.display()))
}
