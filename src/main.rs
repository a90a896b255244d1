//! check-site-meta
//!
//! Inspect a page's metadata from the terminal, or serve the inspection API
//! for a local browser UI.

use std::io::Write;
use std::net::IpAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use site_meta::config::ServerConfig;
use site_meta::extraction::{Field, Resolver};
use site_meta::handlers::{app_router, AppState, MetadataResponse};
use site_meta::{Fetcher, SiteInspector, SiteReport, UserSettings};

/// Website metadata inspector
#[derive(Parser, Debug)]
#[command(name = "check-site-meta")]
#[command(version)]
#[command(about = "Inspect the metadata a web page declares in its <head>")]
struct Args {
    /// URL to inspect ("example.com", "localhost:3000", ":8080"). A bare
    /// number is a local port.
    input: Option<String>,

    /// Serve the HTTP API instead of printing a report
    #[arg(long)]
    serve: bool,

    /// Port to listen on when serving
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to when serving
    #[arg(short = 'H', long)]
    host: Option<IpAddr>,

    /// User agent sent with fetches
    #[arg(long)]
    user_agent: Option<String>,

    /// Fetch timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Print the resolved record as JSON
    #[arg(long)]
    json: bool,

    /// Print the fetched <head> instead of the resolved record
    #[arg(long)]
    raw: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = ServerConfig::from_env().context("reading SITE_META_* environment")?;
    if let Some(ua) = &args.user_agent {
        config.default_settings = UserSettings::with_user_agent(ua);
    }
    if let Some(ms) = args.timeout_ms {
        config.fetch.timeout_ms = ms;
    }
    if let Some(host) = args.host {
        config.bind_addr = host;
    }

    let fetcher = Fetcher::with_config(config.fetch.clone()).context("building HTTP client")?;
    let inspector = SiteInspector::with_fetcher(fetcher);

    match (&args.input, args.serve) {
        (Some(input), false) => inspect(&inspector, &config, input, &args).await,
        (input, _) => {
            // With --serve, a numeric argument picks the port
            match input.as_deref().map(|i| (i, i.parse::<u16>())) {
                Some((_, Ok(port))) => config.port = port,
                Some((other, Err(_))) => {
                    tracing::warn!("ignoring argument '{}' in serve mode", other)
                }
                None => {}
            }
            if let Some(port) = args.port {
                config.port = port;
            }
            serve(inspector, config).await
        }
    }
}

async fn inspect(
    inspector: &SiteInspector,
    config: &ServerConfig,
    input: &str,
    args: &Args,
) -> Result<()> {
    let report = inspector
        .inspect(input, &config.default_settings)
        .await
        .with_context(|| format!("inspecting {}", input))?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if args.raw {
        writeln!(out, "{}", report.head_view())?;
    } else if args.json {
        serde_json::to_writer_pretty(&mut out, &MetadataResponse::from(&report))?;
        writeln!(out)?;
    } else {
        print_report(&mut out, &report)?;
    }
    Ok(())
}

/// Text report of the resolved record, each value tagged with the tag that supplied it
fn print_report(out: &mut impl Write, report: &SiteReport) -> Result<()> {
    let final_url = &report.fetch.final_url;
    let metadata = &report.metadata;

    writeln!(out, "{} ({})", final_url, report.fetch.status_code)?;
    if *final_url != report.requested_url {
        writeln!(out, "  redirected from {}", report.requested_url)?;
    }
    writeln!(out)?;

    for field in Field::ALL {
        let Some(value) = metadata.value(field) else {
            continue;
        };
        match Resolver::winning_source(field, &report.extracted, final_url) {
            Some(source) => writeln!(out, "{:>16}: {}  [{}]", field.name(), value, source)?,
            None => writeln!(out, "{:>16}: {}  [default]", field.name(), value)?,
        }
    }

    if !metadata.keywords.is_empty() {
        writeln!(out, "{:>16}: {}", "keywords", metadata.keywords.join(", "))?;
    }
    for icon in &metadata.icons {
        let sizes = icon.sizes.as_deref().unwrap_or("-");
        writeln!(out, "{:>16}: {} ({}, {})", "icon", icon.url, icon.rel, sizes)?;
    }
    for alternate in &metadata.alternates {
        let lang = alternate.hreflang.as_deref().unwrap_or("-");
        writeln!(out, "{:>16}: {} ({})", "alternate", alternate.url, lang)?;
    }
    Ok(())
}

async fn serve(inspector: SiteInspector, config: ServerConfig) -> Result<()> {
    let addr = config.socket_addr();
    let state = Arc::new(AppState::new(inspector, config.default_settings.clone()));
    let app = app_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!("site-meta listening on http://{}", addr);
    eprintln!("site-meta listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to install Ctrl+C handler: {}", e);
    }
    tracing::info!("shutting down");
}
