// Entry point of the node binary. Each subcommand either prints something
// about keys and genesis or runs a node until the process is killed.
use clap::Parser;
use gossip_ledger::{
    genesis_block, genesis_private_key, Chain, Command, MemoryChainStore, Node, NodeConfig, Opt,
    PrivateKey, Server, SledChainStore, TcpDialer,
};
use log::{error, info, LevelFilter};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

fn main() {
    // Info by default, RUST_LOG still wins.
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let opt = Opt::parse();
    if let Err(e) = run_command(opt.command) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::StartNode {
            config,
            listen,
            bootstrap,
            validator_seed,
            data_dir,
        } => {
            let mut config = NodeConfig::load(config.as_deref())?;
            if let Some(listen) = listen {
                config.listen_addr = listen;
            }
            if !bootstrap.is_empty() {
                config.bootstrap_nodes = bootstrap;
            }
            if validator_seed.is_some() {
                config.validator_seed = validator_seed;
            }
            if data_dir.is_some() {
                config.data_dir = data_dir;
            }
            start_node(config)?;
        }
        Command::GenerateKey => {
            let key = PrivateKey::generate()?;
            let public = key.public();
            println!("seed:       {}", key.seed_hex());
            println!("public key: {public}");
            println!("address:    {}", public.address());
        }
        Command::Genesis => {
            let block = genesis_block()?;
            let key = genesis_private_key()?;
            println!("genesis hash:    {}", block.hash_hex());
            println!("genesis address: {}", key.public().address());
        }
    }
    Ok(())
}

fn open_chain(data_dir: Option<&PathBuf>) -> gossip_ledger::Result<Chain> {
    match data_dir {
        Some(dir) => {
            info!("Opening sled database at {}", dir.display());
            Chain::new(Box::new(SledChainStore::open(dir)?))
        }
        None => Chain::new(Box::new(MemoryChainStore::new())),
    }
}

fn start_node(config: NodeConfig) -> gossip_ledger::Result<()> {
    let options = config.node_options()?;
    let chain = open_chain(config.data_dir.as_ref())?;
    info!("Chain at height {}", chain.height()?);

    let dialer = Arc::new(TcpDialer::new(config.rpc_timeout()));
    let node = Node::new(options, chain, dialer);
    let server = Server::bind(&config.listen_addr, Arc::clone(&node), config.rpc_timeout())?;

    let _validator = node.start(config.bootstrap_nodes.clone());
    server.serve()
}
