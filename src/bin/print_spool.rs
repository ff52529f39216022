//! Print spool CLI.
//!
//! Runs the shared-printer scenario: requesters compete for monochrome and
//! color printers and every lifecycle transition is printed as it happens.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};

use print_spool::builders::{build_durations, build_plan};
use print_spool::config::SpoolConfig;
use print_spool::core::{
    ChannelEventSink, EventSink, OrderingPolicy, PoolStats, ResourceClass, SinkSet,
    TracingEventSink, TransitionEvent,
};
use print_spool::runtime::{Orchestrator, RunReport};
use print_spool::util::init_tracing;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    /// Admission follows arrival order within each class.
    Strict,
    /// First to acquire wins.
    Unordered,
}

impl From<PolicyArg> for OrderingPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Strict => Self::StrictArrivalOrder,
            PolicyArg::Unordered => Self::Unordered,
        }
    }
}

/// Simulate requesters sharing a fixed set of printers.
#[derive(Debug, Parser)]
#[command(name = "print-spool", version, about)]
struct Cli {
    /// Admission policy applied to every class. Without it, a config file's
    /// per-class policies are kept and the built-in scenario runs strict.
    #[arg(long, value_enum, env = "PRINT_SPOOL_POLICY")]
    policy: Option<PolicyArg>,

    /// Only run these classes (`monochrome`/`mono`/`bw`, `color`/`colour`).
    #[arg(long = "class", env = "PRINT_SPOOL_CLASSES", value_delimiter = ',')]
    classes: Vec<ResourceClass>,

    /// JSON configuration file; the built-in printer scenario when absent.
    #[arg(long, env = "PRINT_SPOOL_CONFIG")]
    config: Option<PathBuf>,

    /// RNG seed for durations and arrival jitter.
    #[arg(long, env = "PRINT_SPOOL_SEED")]
    seed: Option<u64>,

    /// Length of one duration unit in milliseconds.
    #[arg(long, env = "PRINT_SPOOL_TIME_UNIT_MS")]
    time_unit_ms: Option<u64>,

    /// Upper bound of the random pause before each requester competes.
    #[arg(long, env = "PRINT_SPOOL_JITTER_MS")]
    jitter_ms: Option<u64>,

    /// Run requesters on the tokio blocking pool instead of scoped threads.
    #[cfg(feature = "tokio-runtime")]
    #[arg(long)]
    tokio: bool,

    /// Default log filter when `RUST_LOG` is unset.
    #[arg(long, env = "PRINT_SPOOL_LOG", default_value = "warn")]
    log: String,
}

impl Cli {
    fn spool_config(&self) -> Result<SpoolConfig> {
        let policy = self.policy.map(OrderingPolicy::from);
        let mut cfg = SpoolConfig::load(self.config.as_deref(), policy)
            .map_err(|e| anyhow!(e))
            .context("loading configuration")?
            .retain_classes(&self.classes);
        if let Some(seed) = self.seed {
            cfg.seed = Some(seed);
        }
        if let Some(ms) = self.time_unit_ms {
            cfg.time_unit_ms = ms;
        }
        if let Some(ms) = self.jitter_ms {
            cfg.arrival_jitter_ms = ms;
        }
        cfg.validate().map_err(|e| anyhow!("invalid configuration: {e}"))?;
        Ok(cfg)
    }
}

fn print_event(event: &TransitionEvent) {
    println!(
        "[{:<10} #{:>2}] {:<14} {}",
        event.class, event.sequence, event.label, event.state
    );
}

fn print_summary(stats: &BTreeMap<ResourceClass, PoolStats>, report: &RunReport) {
    println!();
    println!(
        "run {} finished in {:.2?}: {} done, {} cancelled",
        report.run_id,
        report.elapsed,
        report.completed(),
        report.cancelled()
    );
    for (class, stats) in stats {
        println!(
            "  {class:<10} capacity {} peak {} admitted {}",
            stats.capacity, stats.peak_held, stats.admitted_total
        );
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log);

    let cfg = cli.spool_config()?;
    let (tx, rx) = crossbeam_channel::unbounded::<TransitionEvent>();
    let printer = thread::Builder::new()
        .name("spool-console".into())
        .spawn(move || {
            for event in rx {
                print_event(&event);
            }
        })
        .context("starting console printer")?;

    let sink: Arc<dyn EventSink> = Arc::new(
        SinkSet::new()
            .with(Arc::new(TracingEventSink))
            .with(Arc::new(ChannelEventSink::new(tx))),
    );
    let orchestrator = Orchestrator::from_config(&cfg, sink)?;
    let mut durations = build_durations(&cfg)?;
    let requesters = orchestrator.prepare(&build_plan(&cfg), &mut durations)?;

    #[cfg(feature = "tokio-runtime")]
    let report = if cli.tokio {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        runtime.block_on(print_spool::runtime::run_on_tokio(&orchestrator, requesters))?
    } else {
        orchestrator.run(requesters)?
    };
    #[cfg(not(feature = "tokio-runtime"))]
    let report = orchestrator.run(requesters)?;

    let stats = orchestrator.registry().stats();
    // Closes the channel so the printer drains and exits.
    drop(orchestrator);
    printer
        .join()
        .map_err(|_| anyhow!("console printer panicked"))?;
    print_summary(&stats, &report);
    Ok(())
}
