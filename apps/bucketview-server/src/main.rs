//! bucketview server - renders the images of an object-storage bucket as a grid.
//!
//! `GET /` lists the configured bucket with a SigV4-signed `ListObjectsV2`
//! request and returns an HTML page linking every image through the
//! image-resizing service on `STATIC_DOMAIN`. Every other request gets a `404`.
//!
//! # Usage
//!
//! ```text
//! AWS_ACCESS_KEY_ID=... AWS_SECRET_ACCESS_KEY=... STATIC_DOMAIN=https://static.example.com bucketview-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `LISTEN_ADDR` | `0.0.0.0:8080` | Bind address |
//! | `AWS_ACCESS_KEY_ID` | *(required)* | Access key, falls back to `ACCESS_KEY` |
//! | `AWS_SECRET_ACCESS_KEY` | *(required)* | Secret key, falls back to `SECRET_KEY` |
//! | `AWS_REGION` | `eu-central` | Signing region |
//! | `OBJECT_STORAGE_ENDPOINT` | `https://eu-central.object.fastlystorage.app` | S3-compatible endpoint |
//! | `BUCKET_NAME` | `images` | Bucket to list |
//! | `STATIC_DOMAIN` | *(required)* | Base URL of the image-resizing service |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

mod render;
mod service;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use bucketview_auth::{Authorizer, Credentials};
use bucketview_core::BucketViewConfig;
use bucketview_listing::{ListingClient, ObjectLister};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::service::{GalleryConfig, GalleryService};

/// Server version logged at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Build the signed listing client for the configured bucket.
fn build_listing_client(config: &BucketViewConfig) -> Result<ListingClient> {
    let credentials = Credentials::new(
        config.access_key_id.as_str(),
        config.secret_access_key.as_str(),
        config.region.as_str(),
    );
    let authorizer = Arc::new(Authorizer::new(credentials));

    ListingClient::new(
        &config.object_storage_endpoint,
        &config.bucket_name,
        authorizer,
    )
    .context("failed to build object storage client")
}

fn build_gallery_config(config: &BucketViewConfig) -> GalleryConfig {
    GalleryConfig {
        static_domain: config.static_domain.clone(),
        bucket_name: config.bucket_name.clone(),
    }
}

/// Run the accept loop, serving connections until a shutdown signal is received.
async fn serve<L: ObjectLister>(listener: TcpListener, service: GalleryService<L>) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = BucketViewConfig::from_env().context("invalid configuration")?;

    init_tracing(&config.log_level)?;

    info!(
        listen_addr = %config.listen_addr,
        region = %config.region,
        object_storage_endpoint = %config.object_storage_endpoint,
        bucket_name = %config.bucket_name,
        static_domain = %config.static_domain,
        access_key_id = %config.access_key_id,
        version = VERSION,
        "starting bucketview server",
    );

    let client = build_listing_client(&config)?;
    info!(url = %client.list_url(), "listing endpoint configured");

    let service = GalleryService::new(Arc::new(client), build_gallery_config(&config));

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.listen_addr))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "listening for connections");

    serve(listener, service).await
}
