use std::path::Path;
use std::sync::Arc;

use arbor::config::{load_config_from, validate_config};
use arbor::error::Result;
use arbor::naming::{NamingService, Registry};
use arbor::server;
use arbor::storage::HttpStorageClient;

pub async fn run_server(
    explicit: Option<&Path>,
    bind: Option<String>,
    registration_bind: Option<String>,
) -> Result<()> {
    let config_path = super::resolve_config_path(explicit)?;
    let mut config = load_config_from(&config_path)?;
    if bind.is_some() {
        config.server.bind = bind;
    }
    if registration_bind.is_some() {
        config.server.registration_bind = registration_bind;
    }
    validate_config(&config)?;

    let storage = Arc::new(HttpStorageClient::new(
        config.storage.get_request_timeout(),
    )?);
    let service = Arc::new(NamingService::new(
        Arc::new(Registry::new()),
        storage,
        &config.replication,
    ));

    tracing::info!(
        "Replication {} (threshold {} reads)",
        if config.replication.get_enabled() {
            "enabled"
        } else {
            "disabled"
        },
        service.tree().replicator().read_threshold()
    );

    server::serve(
        service,
        config.server.bind_addr()?,
        config.server.registration_addr()?,
    )
    .await
}
