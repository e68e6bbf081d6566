// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use clap::Parser;
use clusterops::{
    config::Config,
    constants::{KIND_CLUSTER, KIND_NODE_DRAIN, KIND_NODE_POOL},
    context::Context,
    crd::{Cluster, NodeDrain, NodePool},
    errors::ReconcileError,
    metrics,
    reconcilers::{error_action, reconcile_cluster, reconcile_node_drain, reconcile_node_pool},
    server::{self, Readiness},
};
use futures::StreamExt;
use kube::{
    runtime::{controller, controller::Action, watcher, Controller},
    Api, Client, ResourceExt,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
struct ControllerError(#[from] ReconcileError);

fn main() -> Result<()> {
    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .thread_name("clusterops-controller")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    // Respects RUST_LOG (default: info) and RUST_LOG_FORMAT (json or text)
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("A rustls crypto provider was already installed");
    }

    let config = Config::parse();
    config.validate()?;

    info!(
        version = %config.operator_version,
        pool = %config.pool_cidr,
        supported_versions = ?config.supported_versions,
        "Starting clusterops controller"
    );

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;

    let readiness = Readiness::default();
    let metrics_addr = config.metrics_bind_address;
    let concurrency = config.concurrency;
    let ctx = Arc::new(Context::new(client.clone(), config)?);

    info!("Starting all controllers");
    readiness.set_ready();

    // Controllers should never exit - if one does, the process exits
    tokio::select! {
        () = run_cluster_controller(client.clone(), ctx.clone(), concurrency) => {
            error!("CRITICAL: Cluster controller exited unexpectedly");
            anyhow::bail!("Cluster controller exited unexpectedly")
        }
        () = run_node_pool_controller(client.clone(), ctx.clone(), concurrency) => {
            error!("CRITICAL: NodePool controller exited unexpectedly");
            anyhow::bail!("NodePool controller exited unexpectedly")
        }
        () = run_node_drain_controller(client.clone(), ctx.clone(), concurrency) => {
            error!("CRITICAL: NodeDrain controller exited unexpectedly");
            anyhow::bail!("NodeDrain controller exited unexpectedly")
        }
        result = server::serve(metrics_addr, readiness) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("metrics server exited unexpectedly without error")
        }
    }
}

fn controller_config(concurrency: u16) -> controller::Config {
    controller::Config::default().concurrency(concurrency)
}

/// Run the `Cluster` controller
async fn run_cluster_controller(client: Client, ctx: Arc<Context>, concurrency: u16) {
    info!("Starting Cluster controller");

    Controller::new(Api::<Cluster>::all(client), watcher::Config::default())
        .with_config(controller_config(concurrency))
        .shutdown_on_signal()
        .run(reconcile_cluster_wrapper, error_policy_cluster, ctx)
        .for_each(|result| async move {
            if let Err(e) = result {
                debug!(error = ?e, "Cluster reconciliation error");
            }
        })
        .await;
}

/// Run the `NodePool` controller; changes to owned `NodeDrain` records trigger
/// their node pool.
async fn run_node_pool_controller(client: Client, ctx: Arc<Context>, concurrency: u16) {
    info!("Starting NodePool controller");

    Controller::new(Api::<NodePool>::all(client.clone()), watcher::Config::default())
        .owns(Api::<NodeDrain>::all(client), watcher::Config::default())
        .with_config(controller_config(concurrency))
        .shutdown_on_signal()
        .run(reconcile_node_pool_wrapper, error_policy_node_pool, ctx)
        .for_each(|result| async move {
            if let Err(e) = result {
                debug!(error = ?e, "NodePool reconciliation error");
            }
        })
        .await;
}

/// Run the `NodeDrain` controller
async fn run_node_drain_controller(client: Client, ctx: Arc<Context>, concurrency: u16) {
    info!("Starting NodeDrain controller");

    Controller::new(Api::<NodeDrain>::all(client), watcher::Config::default())
        .with_config(controller_config(concurrency))
        .shutdown_on_signal()
        .run(reconcile_node_drain_wrapper, error_policy_node_drain, ctx)
        .for_each(|result| async move {
            if let Err(e) = result {
                debug!(error = ?e, "NodeDrain reconciliation error");
            }
        })
        .await;
}

/// Reconcile wrapper for `Cluster`
async fn reconcile_cluster_wrapper(
    cluster: Arc<Cluster>,
    ctx: Arc<Context>,
) -> Result<Action, ControllerError> {
    debug!(
        cluster_name = %cluster.name_any(),
        namespace = ?cluster.namespace(),
        "Reconcile wrapper called for Cluster"
    );
    Ok(reconcile_cluster(&ctx, &cluster).await?)
}

/// Reconcile wrapper for `NodePool`
async fn reconcile_node_pool_wrapper(
    pool: Arc<NodePool>,
    ctx: Arc<Context>,
) -> Result<Action, ControllerError> {
    debug!(
        node_pool = %pool.name_any(),
        namespace = ?pool.namespace(),
        "Reconcile wrapper called for NodePool"
    );
    Ok(reconcile_node_pool(&ctx, &pool).await?)
}

/// Reconcile wrapper for `NodeDrain`
async fn reconcile_node_drain_wrapper(
    drain: Arc<NodeDrain>,
    ctx: Arc<Context>,
) -> Result<Action, ControllerError> {
    Ok(reconcile_node_drain(&ctx, &drain).await?)
}

fn error_policy(kind: &str, name: &str, err: &ControllerError) -> Action {
    let ControllerError(err) = err;
    error!(kind, name, reason = err.reason(), "Failed to reconcile: {err}");
    metrics::record_reconciliation_requeue(kind, err.reason());
    error_action(err)
}

/// Error policy for the `Cluster` controller
fn error_policy_cluster(cluster: Arc<Cluster>, err: &ControllerError, _ctx: Arc<Context>) -> Action {
    error_policy(KIND_CLUSTER, &cluster.name_any(), err)
}

/// Error policy for the `NodePool` controller
fn error_policy_node_pool(pool: Arc<NodePool>, err: &ControllerError, _ctx: Arc<Context>) -> Action {
    error_policy(KIND_NODE_POOL, &pool.name_any(), err)
}

/// Error policy for the `NodeDrain` controller
fn error_policy_node_drain(
    drain: Arc<NodeDrain>,
    err: &ControllerError,
    _ctx: Arc<Context>,
) -> Action {
    error_policy(KIND_NODE_DRAIN, &drain.name_any(), err)
}
