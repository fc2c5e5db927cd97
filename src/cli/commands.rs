use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "gossip-ledger")]
pub struct Opt {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "start-node", about = "Start a ledger node")]
    StartNode {
        #[arg(long, help = "TOML configuration file")]
        config: Option<PathBuf>,
        #[arg(long, help = "Address to listen on, e.g. 127.0.0.1:3000")]
        listen: Option<String>,
        #[arg(long = "bootstrap", help = "Peer to bootstrap from (repeatable)")]
        bootstrap: Vec<String>,
        #[arg(long = "validator-seed", help = "Hex seed of the validator key")]
        validator_seed: Option<String>,
        #[arg(long = "data-dir", help = "Directory for the sled database")]
        data_dir: Option<PathBuf>,
    },
    #[command(name = "generate-key", about = "Generate a new validator key")]
    GenerateKey,
    #[command(name = "genesis", about = "Print the genesis block hash and address")]
    Genesis,
}
