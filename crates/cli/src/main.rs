use anyhow::Context;
use clap::Parser;
use rdns_domain::{CliOverrides, Config, DnsQuery, RecordType, Reply};
use rdns_infrastructure::dns::{EventLoop, RequestOptions, ResolverBuilder, TokioEngine};
use std::cell::RefCell;
use std::process::ExitCode;
use std::rc::Rc;
use tokio::task::LocalSet;
use tracing::{debug, info};

mod bootstrap;

#[derive(Parser)]
#[command(name = "rdns-resolve")]
#[command(version)]
#[command(about = "Stub DNS resolver - sends queries to upstream servers and prints the answers")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<String>,

    /// Upstream server (`ip`, `ip:port` or `[ipv6]:port`), may be repeated
    #[arg(short = 's', long = "server", value_name = "ADDR")]
    servers: Vec<String>,

    /// Record type to ask for
    #[arg(short = 't', long = "type", default_value = "A")]
    record_type: RecordType,

    /// Per-attempt timeout in milliseconds
    #[arg(long, value_name = "MS")]
    timeout: Option<u64>,

    /// Retransmits before giving up
    #[arg(long)]
    retransmits: Option<u32>,

    /// Query over TCP from the start
    #[arg(long)]
    tcp: bool,

    /// Set the EDNS0 DO bit and report the AD flag
    #[arg(long)]
    dnssec: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Names to resolve
    #[arg(required = true)]
    names: Vec<String>,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let cli_overrides = CliOverrides {
        servers: cli.servers.clone(),
        timeout_ms: cli.timeout,
        retransmits: cli.retransmits,
        enable_dnssec: cli.dnssec,
        log_level: cli.log_level.clone(),
    };
    let config = bootstrap::load_config(cli.config.as_deref(), cli_overrides)?;
    bootstrap::init_logging(&config);

    info!(
        "rdns-resolve v{} querying {} server(s)",
        env!("CARGO_PKG_VERSION"),
        config.servers.len()
    );

    // the resolver is single-threaded, so everything runs on one LocalSet
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;
    let replies = LocalSet::new().block_on(&runtime, resolve(&config, &cli))?;

    let mut failed = 0;
    for reply in &replies {
        print_reply(reply);
        if !reply.is_success() {
            failed += 1;
        }
    }
    debug!(total = replies.len(), failed, "Done");

    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn resolve(config: &Config, cli: &Cli) -> anyhow::Result<Vec<Reply>> {
    let (engine, events) = TokioEngine::new();
    let resolver = ResolverBuilder::from_config(config, Box::new(engine))
        .build()
        .context("failed to build resolver")?;
    let mut event_loop = EventLoop::new(resolver, events);

    let mut options = RequestOptions::from(&config.resolver);
    if cli.tcp {
        options = options.with_tcp();
    }

    let replies = Rc::new(RefCell::new(Vec::with_capacity(cli.names.len())));
    for name in &cli.names {
        let sink = Rc::clone(&replies);
        event_loop
            .resolver()
            .submit_with(
                DnsQuery::new(name.as_str(), cli.record_type),
                options,
                move |reply| sink.borrow_mut().push(reply),
            )
            .with_context(|| format!("cannot query {}", name))?;
    }

    event_loop.run_until_idle().await;
    Ok(replies.take())
}

fn print_reply(reply: &Reply) {
    let question = reply
        .names
        .iter()
        .map(|n| format!("{} {}", n.name, n.record_type))
        .collect::<Vec<_>>()
        .join(", ");
    let source = reply.server.as_deref().unwrap_or("local");
    let ad = if reply.authenticated { " ad" } else { "" };
    println!("{}: {} ({}{})", question, reply.code, source, ad);

    for entry in &reply.entries {
        println!("    {:>6} {:<5} {}", entry.ttl, entry.record_type().as_str(), entry.data);
    }
}
