//! Orgsync reconciliation worker.

#![forbid(unsafe_code)]

mod config;

use std::sync::Arc;
use std::time::Duration;

use orgsync_application::{
    DashboardService, IdentityOrganizationSource, OrganizationSource, ReconcileService,
};
use orgsync_core::{AppError, AppResult};
use orgsync_infrastructure::{
    ControlApiOrganizationSource, GrafanaDashboardService, KeycloakIdentityProvider,
    load_latest_dashboards,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{SourceConfig, WorkerConfig};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = WorkerConfig::load()?;
    info!(config = ?config, "orgsync-worker starting");

    let http_client = reqwest::Client::builder()
        .pool_idle_timeout(Duration::from_secs(30))
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;

    let dashboards = load_latest_dashboards(config.dashboards_dir.as_path()).await?;
    let source = build_source(&http_client, &config);
    let dashboard: Arc<dyn DashboardService> = Arc::new(GrafanaDashboardService::new(
        http_client,
        config.grafana.clone(),
    ));
    let reconciler = ReconcileService::new(
        config.reconcile.clone(),
        source,
        dashboard,
        dashboards.into(),
    );

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    let interval = Duration::from_millis(config.reconcile_interval_ms);
    info!(interval_ms = config.reconcile_interval_ms, "orgsync-worker started");

    loop {
        match reconciler.reconcile(&cancel).await {
            Ok(report) => info!(
                users_found = report.users_found,
                users_synced = report.users_synced,
                memberships_found = report.memberships_found,
                organizations_found = report.organizations_found,
                admins_found = report.admins_found,
                permissions_derived = report.permissions_derived,
                duration_ms = (report.finished_at - report.started_at).num_milliseconds(),
                "reconciliation finished"
            ),
            Err(error) if error.is_interrupted() => {}
            Err(error) => warn!(error = %error, "reconciliation failed, will retry"),
        }

        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(interval) => {}
        }
    }

    info!("orgsync-worker stopped");
    Ok(())
}

fn build_source(http_client: &reqwest::Client, config: &WorkerConfig) -> Arc<dyn OrganizationSource> {
    match &config.source {
        SourceConfig::Keycloak(settings) => {
            let provider = Arc::new(KeycloakIdentityProvider::new(
                http_client.clone(),
                settings.clone(),
            ));
            Arc::new(IdentityOrganizationSource::new(
                provider,
                config.reconcile.organizations_root.as_str(),
                config.reconcile.admin_group_path.clone(),
            ))
        }
        SourceConfig::ControlApi(settings) => Arc::new(ControlApiOrganizationSource::new(
            http_client.clone(),
            settings.clone(),
        )),
    }
}

async fn shutdown_signal(cancel: CancellationToken) {
    if let Err(error) = wait_for_signal().await {
        warn!(error = %error, "failed to listen for shutdown signals");
        return;
    }

    info!("shutdown requested, finishing current step");
    cancel.cancel();
}

#[cfg(unix)]
async fn wait_for_signal() -> AppResult<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate()).map_err(|error| {
        AppError::Internal(format!("failed to install SIGTERM handler: {error}"))
    })?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map_err(|error| {
            AppError::Internal(format!("failed to listen for ctrl-c: {error}"))
        }),
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> AppResult<()> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|error| AppError::Internal(format!("failed to listen for ctrl-c: {error}")))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
