use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sculkprobe")]
#[command(version = concat!("Ver:", env!("CARGO_PKG_VERSION")))]
#[command(about = "Minecraft server status monitor speaking the Server List Ping protocol")]
pub struct Cli {
    /// Server addresses to probe (host or host:port); defaults to the configured servers
    #[arg(value_name = "ADDRESS")]
    pub addresses: Vec<String>,

    /// Use an explicit config file instead of ~/.sculkprobe/config.toml
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write the default config file
    #[arg(long = "init")]
    pub init: bool,

    /// Validate the config file
    #[arg(long = "check")]
    pub check: bool,

    /// Print the effective config
    #[arg(short = 'p', long = "print")]
    pub print: bool,

    /// Pretty-print JSON reports
    #[arg(long = "pretty")]
    pub pretty: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
