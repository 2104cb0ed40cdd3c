use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use dyncom_common::{BridgeConfig, Guid, ProbeTarget};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "dyncom-probe",
    version = env!("CARGO_PKG_VERSION"),
    about = "Activate COM classes and query them for interfaces"
)]
struct Cli {
    /// TOML configuration with `[[probe]]` targets
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Class to activate, in addition to the configured targets
    #[arg(long)]
    clsid: Option<String>,

    /// Interface to query on `--clsid`; may be repeated
    #[arg(long = "iid", requires = "clsid")]
    iids: Vec<String>,

    /// Overrides the configured log level
    #[arg(long)]
    log_level: Option<String>,
}

/// One class and the interfaces to ask it for
#[derive(Debug, PartialEq)]
struct Probe {
    clsid: Guid,
    interfaces: Vec<Guid>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let probes = plan(&config)?;
    if probes.is_empty() {
        anyhow::bail!("Nothing to probe: pass --clsid or add [[probe]] entries to the config");
    }
    info!("Probing {} class(es), apartment {:?}", probes.len(), config.apartment);

    run(&config, &probes)
}

fn resolve_config(cli: &Cli) -> Result<BridgeConfig> {
    let mut config = match &cli.config {
        Some(path) => BridgeConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => BridgeConfig::default(),
    };
    if let Some(clsid) = &cli.clsid {
        config.probe.push(ProbeTarget {
            clsid: clsid.clone(),
            interfaces: cli.iids.clone(),
        });
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    Ok(config)
}

fn plan(config: &BridgeConfig) -> Result<Vec<Probe>> {
    config
        .probe
        .iter()
        .map(|target| {
            let clsid = Guid::parse(&target.clsid)
                .with_context(|| format!("Invalid CLSID {:?}", target.clsid))?;
            let interfaces = target
                .interfaces
                .iter()
                .map(|iid| Guid::parse(iid).with_context(|| format!("Invalid IID {:?}", iid)))
                .collect::<Result<Vec<_>>>()?;
            Ok(Probe { clsid, interfaces })
        })
        .collect()
}

#[cfg(windows)]
fn run(config: &BridgeConfig, probes: &[Probe]) -> Result<()> {
    use dyncom_core::{
        create_instance, ComRuntime, InterfaceDesc, NativeEnv, OleActivator, OleRuntime, IUNKNOWN,
    };

    let runtime = OleRuntime::new(config.apartment);
    runtime.initialize()?;
    let env = NativeEnv::system();

    for probe in probes {
        let unknown = match create_instance(
            &OleActivator,
            &env,
            &IUNKNOWN,
            &probe.clsid.to_string(),
            config.class_context,
        ) {
            Ok(proxy) => proxy,
            Err(err) => {
                println!("{}: {}", probe.clsid, err);
                continue;
            }
        };
        println!("{}: {}", probe.clsid, unknown);

        for iid in &probe.interfaces {
            // Descriptors must be 'static; a one-shot process can afford to leak them
            let contract: &'static InterfaceDesc = Box::leak(Box::new(InterfaceDesc {
                name: Box::leak(iid.to_string().into_boxed_str()),
                iid: *iid,
                methods: &[],
            }));
            match unknown.query_interface(contract) {
                Ok(proxy) => {
                    println!("  {}", proxy);
                    proxy.dispose();
                }
                Err(err) => match err.status() {
                    Some(status) => println!("  {}: {:?}", iid, status),
                    None => println!("  {}: {}", iid, err),
                },
            }
        }
        unknown.dispose();
    }

    runtime.uninitialize();
    Ok(())
}

#[cfg(not(windows))]
fn run(_config: &BridgeConfig, probes: &[Probe]) -> Result<()> {
    anyhow::bail!(
        "COM activation is only available on Windows ({} class(es) not probed)",
        probes.len()
    )
}
