// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::{process::ExitCode, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use ec2_cloudwatch::{
    autoscaling::{AutoscalingClient, GroupLookup},
    load_sdk_config,
    metadata::MetadataClient,
    publisher::CloudWatchPublisher,
};
use ec2_metrics_agent::{
    agent::{resolve_region, Agent},
    config::{AgentConfig, DEFAULT_LOG_LEVEL},
    error::AgentError,
    logger,
};

/// Level from the validated configuration; the default when the configuration is rejected,
/// so the rejection itself still gets logged.
fn startup_log_level(config: &Result<AgentConfig, AgentError>) -> &str {
    config
        .as_ref()
        .map_or(DEFAULT_LOG_LEVEL, |config| config.log_level.as_str())
}

#[tokio::main]
pub async fn main() -> ExitCode {
    let config = AgentConfig::from_env();
    if let Err(e) = logger::init(startup_log_level(&config)) {
        eprintln!("Unable to set up logging: {e}");
        return ExitCode::FAILURE;
    }

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    debug!("Loaded configuration: {config:?}");

    let metadata = match MetadataClient::new(config.metadata_url.as_str()).fetch().await {
        Ok(metadata) => metadata,
        Err(e) => {
            error!("Failed to fetch instance metadata: {e}");
            return ExitCode::FAILURE;
        }
    };

    let region = match resolve_region(&config, &metadata) {
        Ok(region) => region,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let sdk_config = load_sdk_config(&region).await;
    let sink = Arc::new(CloudWatchPublisher::new(&sdk_config));
    let group_lookup: Option<Arc<dyn GroupLookup>> = if config.autoscaling {
        Some(Arc::new(AutoscalingClient::new(&sdk_config)))
    } else {
        None
    };
    let interval = config.interval;
    info!("Publishing to namespace {} in {region}", config.namespace);

    let agent = Agent::new(config, sink, group_lookup);

    let Some(period) = interval else {
        return match agent.run_once(&metadata).await {
            Ok(count) => {
                debug!("Run finished with {count} datums");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("{e}");
                ExitCode::FAILURE
            }
        };
    };

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal");
                shutdown.cancel();
            }
            Err(e) => error!("Unable to listen for shutdown signal: {e}"),
        }
    });

    agent.run_every(&metadata, period, cancel).await;
    ExitCode::SUCCESS
}
