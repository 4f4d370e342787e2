use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "glprobe",
    author,
    version,
    about = "Replay a glres resource manifest against a recording device",
    long_about = "Replay a glres resource manifest against a recording device.\n\n\
        Missing required extensions stop the run before any resource is built.",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub probe: ProbeArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug, Clone)]
pub struct ProbeArgs {
    /// Resource manifest to build.
    #[arg(
        long,
        value_name = "FILE",
        env = "GLPROBE_MANIFEST",
        default_value = "glres.toml"
    )]
    pub manifest: PathBuf,

    /// Directory shader and image paths are resolved against (defaults to the manifest's directory).
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Include the full device command trace in the report.
    #[arg(long)]
    pub trace: bool,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,

    /// How long to wait for deferred texture loads (e.g. `2s`, `500ms`); overrides the manifest.
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Negotiate the manifest's extensions and list supported and missing names.
    Extensions(ExtensionsArgs),
}

#[derive(Args, Debug)]
pub struct ExtensionsArgs {
    #[arg(
        long,
        value_name = "FILE",
        env = "GLPROBE_MANIFEST",
        default_value = "glres.toml"
    )]
    pub manifest: PathBuf,

    #[arg(long)]
    pub json: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_probe_flags() {
        let cli = Cli::try_parse_from([
            "glprobe",
            "--manifest",
            "scene.toml",
            "--trace",
            "--timeout",
            "750ms",
        ])
        .unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.probe.manifest, PathBuf::from("scene.toml"));
        assert!(cli.probe.trace);
        assert!(!cli.probe.json);
        assert_eq!(cli.probe.timeout, Some(Duration::from_millis(750)));
    }

    #[test]
    fn parses_extensions_subcommand() {
        let cli =
            Cli::try_parse_from(["glprobe", "extensions", "--manifest", "a.toml", "--json"])
                .unwrap();
        match cli.command {
            Some(Command::Extensions(args)) => {
                assert_eq!(args.manifest, PathBuf::from("a.toml"));
                assert!(args.json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_timeout() {
        assert!(Cli::try_parse_from(["glprobe", "--timeout", "soon"]).is_err());
    }
}
