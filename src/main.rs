use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::*;
use futures::StreamExt;
use std::process;

use gatecheck::{
    config::ScanConfig,
    discovery::{HostSweeper, IcmpProbe},
    output::{self, ScanUnit, SweepUnit},
    probes::{NetworkProbes, SshCapability},
    scanner::ExposurePipeline,
};

fn build_cli() -> Command {
    Command::new("gatecheck")
        .version(env!("CARGO_PKG_VERSION"))
        .about("LAN host discovery and exposure auditing")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("TOML configuration file (default: ~/.gatecheck.toml)")
                .global(true),
        )
        .arg(
            Arg::new("no-ssh")
                .long("no-ssh")
                .help("Skip SSH credential probes")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("stream")
                .long("stream")
                .help("Emit one JSON object per line instead of text")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("sweep")
                .about("Find live hosts in an address range")
                .arg(
                    Arg::new("base")
                        .short('b')
                        .long("base")
                        .value_name("PREFIX")
                        .help("Address prefix, e.g. 192.168.1."),
                )
                .arg(
                    Arg::new("start")
                        .short('s')
                        .long("start")
                        .value_name("N")
                        .allow_negative_numbers(true)
                        .value_parser(clap::value_parser!(i64)),
                )
                .arg(
                    Arg::new("end")
                        .short('e')
                        .long("end")
                        .value_name("N")
                        .allow_negative_numbers(true)
                        .value_parser(clap::value_parser!(i64)),
                )
                .arg(
                    Arg::new("workers")
                        .short('w')
                        .long("workers")
                        .value_name("N")
                        .help("Maximum concurrent probes")
                        .value_parser(clap::value_parser!(usize)),
                ),
        )
        .subcommand(
            Command::new("audit")
                .about("Run the exposure probes against one target")
                .arg(
                    Arg::new("target")
                        .value_name("TARGET")
                        .help("Host, IP or URL to audit")
                        .required(true)
                        .index(1),
                ),
        )
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<ScanConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => ScanConfig::from_toml_file(path)?,
        None => ScanConfig::load_default_config(),
    };

    if matches.get_flag("no-ssh") {
        config = config.with_ssh_capability(SshCapability::Unavailable);
    }

    Ok(config)
}

fn print_header(action: &str, subject: &str) {
    println!(
        "{} {} {} at {}",
        "[~]".bright_blue(),
        action,
        subject.bright_cyan(),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string().bright_yellow()
    );
    println!();
}

async fn run_sweep(mut config: ScanConfig, matches: &ArgMatches, stream: bool) -> anyhow::Result<bool> {
    if let Some(base) = matches.get_one::<String>("base") {
        config.base = base.clone();
    }
    if let Some(start) = matches.get_one::<i64>("start") {
        config.start = *start;
    }
    if let Some(end) = matches.get_one::<i64>("end") {
        config.end = *end;
    }
    if let Some(workers) = matches.get_one::<usize>("workers") {
        config.workers = *workers;
    }
    config.validate()?;

    let range = config.address_range();
    let sweeper = HostSweeper::new(IcmpProbe::from_config(&config));
    let units = output::sweep_report(&sweeper, &range);

    if stream {
        let mut failed = false;
        let units = units.inspect(|unit| failed |= unit.is_failed());
        let mut stdout = tokio::io::stdout();
        output::write_ndjson(&mut stdout, units).await?;
        return Ok(!failed);
    }

    print_header(
        "Sweeping",
        &format!("{}{}-{}", range.base_prefix(), range.start(), range.end()),
    );

    let mut units = units;
    let mut ok = true;
    while let Some(unit) = units.next().await {
        match unit {
            SweepUnit::Progress { processed, total, host } => {
                if host.alive {
                    println!("{} [{}/{}] {}", "[+]".bright_green(), processed, total, output::format_host(&host));
                }
            }
            SweepUnit::Complete { hosts, .. } => {
                let alive = hosts.iter().filter(|h| h.alive).count();
                println!();
                for host in &hosts {
                    println!("    {}", output::format_host(host));
                }
                println!();
                println!("{} {} of {} hosts up", "[✓]".bright_green(), alive.to_string().bold(), hosts.len());
            }
            SweepUnit::Failed { error, .. } => {
                eprintln!("{} {}", "[!]".bright_red(), error);
                ok = false;
            }
        }
    }

    Ok(ok)
}

async fn run_audit(config: ScanConfig, matches: &ArgMatches, stream: bool) -> anyhow::Result<bool> {
    config.validate()?;
    let target = matches.get_one::<String>("target").map(String::as_str).unwrap_or_default();

    let pipeline = ExposurePipeline::new(NetworkProbes::new(&config)?);
    let units = output::scan_report(&pipeline, target);

    if stream {
        let mut failed = false;
        let units = units.inspect(|unit| failed |= unit.is_failed());
        let mut stdout = tokio::io::stdout();
        output::write_ndjson(&mut stdout, units).await?;
        return Ok(!failed);
    }

    print_header("Auditing", target);

    let mut units = units;
    let mut ok = true;
    while let Some(unit) = units.next().await {
        match unit {
            ScanUnit::Progress { step, total, finding, .. } => {
                println!("{}", output::format_step(step, total, &finding));
            }
            ScanUnit::Complete { target, findings, .. } => {
                let actionable = findings.iter().filter(|f| f.is_actionable()).count();
                let worst = findings.iter().map(|f| f.severity).max().unwrap_or_default();
                println!();
                println!(
                    "{} {}: {} findings, {} actionable, highest severity {}",
                    "[✓]".bright_green(),
                    target.bright_cyan(),
                    findings.len(),
                    actionable.to_string().bold(),
                    output::severity_label(worst)
                );
            }
            ScanUnit::Failed { target, error, .. } => {
                eprintln!("{} {}: {}", "[!]".bright_red(), target, error);
                ok = false;
            }
        }
    }

    Ok(ok)
}

async fn run(matches: ArgMatches) -> anyhow::Result<bool> {
    // Global flags are propagated into the subcommand matches
    let (name, sub) = match matches.subcommand() {
        Some(found) => found,
        None => return Ok(false),
    };
    let config = load_config(sub)?;
    let stream = sub.get_flag("stream");

    match name {
        "sweep" => run_sweep(config, sub, stream).await,
        "audit" => run_audit(config, sub, stream).await,
        _ => Ok(false),
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let matches = build_cli().get_matches();

    match run(matches).await {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("{} {}", "[!] ERROR:".bright_red(), e);
            process::exit(2);
        }
    }
}
