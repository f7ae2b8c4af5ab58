//! Command-line interface definitions.
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domains::Domain;

/// Top-level CLI entry point for the host tuning engine.
#[derive(Parser, Debug)]
#[command(
    name = "hosttune",
    about = "Snapshot, tune and restore Windows network and system settings",
    version
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Configuration file (default: ./hosttune.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding snapshots (overrides the config file)
    #[arg(long, global = true)]
    pub state_dir: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List domains, settings and presets
    List,
    /// Show current values of a domain
    Status(StatusOpts),
    /// Snapshot, then write a domain's settings
    Apply(ApplyOpts),
    /// Write back the values captured by the last snapshot
    Restore(RestoreOpts),
    /// Run the full optimization sequence
    Optimize(OptimizeOpts),
    /// Replace an executable that may still be running
    Deploy(DeployOpts),
    /// Print version information
    Version,
}

/// Options for the `status` subcommand.
#[derive(Args, Debug, Clone)]
pub struct StatusOpts {
    /// Domain to inspect (dns, lso, mtu, power, tcp)
    pub domain: Domain,

    /// Only this adapter (connection name) or service
    #[arg(long)]
    pub adapter: Option<String>,
}

/// Options for the `apply` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ApplyOpts {
    /// Domain to change (dns, lso, mtu, power, tcp)
    pub domain: Domain,

    /// Only this adapter (connection name) or service
    #[arg(long)]
    pub adapter: Option<String>,

    /// Value for the domain's primary setting (e.g. an MTU)
    #[arg(long, conflicts_with_all = ["preset", "set"])]
    pub value: Option<String>,

    /// Named preset (e.g. cloudflare, auto, disable-saving, default)
    #[arg(long, conflicts_with = "set")]
    pub preset: Option<String>,

    /// Explicit NAME=VALUE assignment (repeatable)
    #[arg(long, value_parser = parse_assignment)]
    pub set: Vec<(String, String)>,

    /// Do not snapshot current values first
    #[arg(long)]
    pub no_backup: bool,
}

/// Options for the `restore` subcommand.
#[derive(Args, Debug, Clone)]
pub struct RestoreOpts {
    /// Domain to restore (dns, lso, mtu, power, tcp)
    pub domain: Domain,

    /// Only this adapter (connection name) or service
    #[arg(long)]
    pub adapter: Option<String>,
}

/// Options for the `optimize` subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct OptimizeOpts {
    /// Percentage of steps that must succeed (overrides the config file)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub threshold: Option<u32>,

    /// Skip specific steps
    #[arg(long, value_delimiter = ',')]
    pub skip: Vec<String>,

    /// Run only specific steps
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,
}

/// Options for the `deploy` subcommand.
#[derive(Args, Debug, Clone)]
pub struct DeployOpts {
    /// Path of the executable to replace
    #[arg(long)]
    pub to: PathBuf,
}

fn parse_assignment(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing setting name in '{s}'"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::unreachable)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_apply_mtu_value() {
        let cli = Cli::parse_from(["hosttune", "apply", "mtu", "--value", "1400"]);
        let Command::Apply(opts) = cli.command else {
            unreachable!("expected apply")
        };
        assert_eq!(opts.domain, Domain::Mtu);
        assert_eq!(opts.value.as_deref(), Some("1400"));
        assert!(!opts.no_backup);
    }

    #[test]
    fn parse_apply_preset_for_one_adapter() {
        let cli = Cli::parse_from([
            "hosttune",
            "apply",
            "dns",
            "--preset",
            "google",
            "--adapter",
            "Wi-Fi",
            "--no-backup",
        ]);
        let Command::Apply(opts) = cli.command else {
            unreachable!("expected apply")
        };
        assert_eq!(opts.preset.as_deref(), Some("google"));
        assert_eq!(opts.adapter.as_deref(), Some("Wi-Fi"));
        assert!(opts.no_backup);
    }

    #[test]
    fn parse_apply_assignments() {
        let cli = Cli::parse_from([
            "hosttune",
            "apply",
            "tcp",
            "--set",
            "KeepAliveTime=300000",
            "--set",
            "TcpMaxDataRetransmissions = 5",
        ]);
        let Command::Apply(opts) = cli.command else {
            unreachable!("expected apply")
        };
        assert_eq!(
            opts.set,
            [
                ("KeepAliveTime".to_string(), "300000".to_string()),
                ("TcpMaxDataRetransmissions".to_string(), "5".to_string())
            ]
        );
    }

    #[test]
    fn value_and_preset_conflict() {
        let result = Cli::try_parse_from([
            "hosttune", "apply", "mtu", "--value", "1400", "--preset", "safe",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn assignment_requires_equals() {
        assert!(parse_assignment("KeepAliveTime").is_err());
        assert!(parse_assignment("=5").is_err());
    }

    #[test]
    fn domain_aliases() {
        let cli = Cli::parse_from(["hosttune", "restore", "adapter-power"]);
        let Command::Restore(opts) = cli.command else {
            unreachable!("expected restore")
        };
        assert_eq!(opts.domain, Domain::AdapterPower);
    }

    #[test]
    fn unknown_domain_rejected() {
        assert!(Cli::try_parse_from(["hosttune", "status", "wifi"]).is_err());
    }

    #[test]
    fn parse_optimize_filters() {
        let cli = Cli::parse_from([
            "hosttune",
            "optimize",
            "--skip",
            "system-repair,ssl",
            "--threshold",
            "90",
        ]);
        let Command::Optimize(opts) = cli.command else {
            unreachable!("expected optimize")
        };
        assert_eq!(opts.skip, ["system-repair", "ssl"]);
        assert_eq!(opts.threshold, Some(90));
        assert!(opts.only.is_empty());
    }

    #[test]
    fn threshold_out_of_range_rejected() {
        assert!(Cli::try_parse_from(["hosttune", "optimize", "--threshold", "0"]).is_err());
        assert!(Cli::try_parse_from(["hosttune", "optimize", "--threshold", "101"]).is_err());
    }

    #[test]
    fn parse_deploy() {
        let cli = Cli::parse_from(["hosttune", "deploy", "--to", "C:/tools/hosttune.exe"]);
        let Command::Deploy(opts) = cli.command else {
            unreachable!("expected deploy")
        };
        assert_eq!(opts.to, PathBuf::from("C:/tools/hosttune.exe"));
    }

    #[test]
    fn parse_global_options() {
        let cli = Cli::parse_from([
            "hosttune",
            "-v",
            "list",
            "--config",
            "/etc/hosttune.toml",
            "--state-dir",
            "/var/lib/hosttune",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.global.config, Some(PathBuf::from("/etc/hosttune.toml")));
        assert_eq!(cli.global.state_dir, Some(PathBuf::from("/var/lib/hosttune")));
        assert!(matches!(cli.command, Command::List));
    }

    #[test]
    fn parse_version() {
        let cli = Cli::parse_from(["hosttune", "version"]);
        assert!(matches!(cli.command, Command::Version));
    }
}
