use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pulse-replay", about = "Replay stored messages once an event stream completes")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read events from stdin; when stdin closes, write the replay to stdout as JSON Lines.
    Replay(ReplayArgs),
    /// Append JSON Lines messages from stdin to a file store.
    Import(ImportArgs),
}

#[derive(Args, Clone, Debug)]
pub struct ReplayArgs {
    /// Path to TOML config file.
    #[arg(long, default_value = "pulse.toml", env = "PULSE_CONFIG")]
    pub config: String,
}

#[derive(Args, Clone, Debug)]
pub struct ImportArgs {
    /// Path to TOML config file.
    #[arg(long, default_value = "pulse.toml", env = "PULSE_CONFIG")]
    pub config: String,
    /// Name of the `file` store to append to.
    #[arg(long, default_value = "default")]
    pub store: String,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn import_takes_a_store_name() {
        let cli = Cli::parse_from([
            "pulse-replay",
            "import",
            "--config",
            "x.toml",
            "--store",
            "archive",
        ]);
        match cli.command {
            Commands::Import(args) => {
                assert_eq!(args.config, "x.toml");
                assert_eq!(args.store, "archive");
            }
            Commands::Replay(_) => panic!("parsed as replay"),
        }
    }
}
