use anyhow::{Context, Result, bail};
use minefair_core::{Seeds, TableConfig, hash_server_seed};

use crate::BoardArgs;
use crate::board;

#[derive(clap::Args, Debug)]
pub struct VerifyArgs {
    /// Server seed revealed after rotation
    #[arg(long)]
    server_seed: String,

    #[arg(long)]
    client_seed: String,

    /// Round number under those seeds, starting at 0
    #[arg(short, long, default_value_t = 0)]
    nonce: u64,

    /// Commitment published before the round, checked against the server seed
    #[arg(long)]
    commitment: Option<String>,

    #[command(flatten)]
    board: BoardArgs,

    /// Print the layout as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: VerifyArgs, table: &TableConfig) -> Result<()> {
    let (grid, bombs) = args.board.resolve(table)?;
    check_commitment(&args.server_seed, args.commitment.as_deref())?;

    let seeds = Seeds::new(args.server_seed, args.client_seed, args.nonce);
    let layout = seeds
        .layout(grid, bombs)
        .context("Seeds do not produce a layout for this board")?;
    log::debug!("commitment: {:?}", seeds.commitment());

    if args.json {
        println!("{}", serde_json::to_string(&layout.indices())?);
    } else {
        println!("nonce {} bombs {:?}", seeds.nonce, layout.indices());
        print!("{}", board::render_layout(&layout));
    }
    Ok(())
}

fn check_commitment(server_seed: &str, commitment: Option<&str>) -> Result<()> {
    let Some(commitment) = commitment else {
        return Ok(());
    };
    let hash = hash_server_seed(server_seed);
    if !hash.eq_ignore_ascii_case(commitment.trim()) {
        bail!("Server seed hashes to {hash}, not the committed {commitment}");
    }
    log::info!("Server seed matches commitment {hash}");
    Ok(())
}
