use sculkprobe::cli::Cli;
use sculkprobe::config::Config;
use sculkprobe::core::status::{
    Endpoint, OfflineReason, ProbeOptions, ProbeOutcome, ServerMonitor, StatusProber, StatusRecord,
};
use serde::Serialize;

/// One line of probe output
#[derive(Serialize)]
struct ProbeReport<'a> {
    name: &'a str,
    address: String,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a OfflineReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<&'a StatusRecord>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse_args();

    if cli.init {
        let path = Config::config_path()?;
        if Config::init_at(&path)? {
            println!("Created {}", path.display());
        } else {
            println!("{} already exists", path.display());
        }
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => Config::load_at(path)?,
        None => Config::load()?,
    };

    if cli.print {
        config.print()?;
        return Ok(());
    }

    if cli.check {
        config.check()?;
        println!("✓ Configuration valid");
        return Ok(());
    }

    let targets = if cli.addresses.is_empty() {
        config.endpoints()?
    } else {
        cli.addresses
            .iter()
            .map(|address| Endpoint::parse(address).map(|endpoint| (address.clone(), endpoint)))
            .collect::<Result<Vec<_>, _>>()?
    };

    if targets.is_empty() {
        eprintln!("No servers to probe: pass addresses or add [[servers]] to the config (--init)");
        std::process::exit(2);
    }

    let prober = StatusProber::new().with_options(ProbeOptions::from(&config.probe));
    let monitor = ServerMonitor::new(prober);
    for (name, endpoint) in targets {
        monitor.track(name, endpoint);
    }

    for (server, outcome) in monitor.probe_all().await {
        let reason = match &outcome {
            ProbeOutcome::Offline { reason, .. } => Some(reason),
            _ => None,
        };
        let report = ProbeReport {
            name: &server.name,
            address: server.endpoint.to_string(),
            outcome: outcome.label(),
            reason,
            status: outcome.record().map(|record| record.as_ref()),
        };

        let line = if cli.pretty {
            serde_json::to_string_pretty(&report)?
        } else {
            serde_json::to_string(&report)?
        };
        println!("{}", line);
    }

    Ok(())
}
