use std::path::PathBuf;

use anyhow::{Context, Result};
use argh::FromArgs;
use rbmtool::{
    format::{mdic, PlacementEntry},
    import::{ImportSession, Instance},
    util::file::map_file,
};
use serde::Serialize;

use super::{write_json, GlobalArgs};

#[derive(FromArgs, PartialEq, Debug)]
/// process MDIC instancing files
#[argh(subcommand, name = "mdic")]
pub struct Args {
    #[argh(subcommand)]
    command: SubCommand,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand)]
enum SubCommand {
    List(ListArgs),
}

#[derive(FromArgs, PartialEq, Eq, Debug)]
/// list the placements of an MDIC file
#[argh(subcommand, name = "list")]
pub struct ListArgs {
    #[argh(positional)]
    /// input file
    input: PathBuf,
    #[argh(option, short = 'o')]
    /// output file (default: stdout)
    output: Option<PathBuf>,
}

pub fn run(args: Args, global: &GlobalArgs) -> Result<()> {
    match args.command {
        SubCommand::List(c_args) => list(c_args, global),
    }
}

#[derive(Serialize)]
struct Listing {
    placements: Vec<PlacementEntry>,
    /// Only filled when an extraction base path is configured.
    instances: Vec<Instance>,
}

fn list(args: ListArgs, global: &GlobalArgs) -> Result<()> {
    let settings = global.settings()?;
    let data = map_file(&args.input)?;
    let placements =
        mdic::decode(&data).with_context(|| format!("Failed to decode '{}'", args.input.display()))?;
    log::info!("{}: {} placements", args.input.display(), placements.len());

    let instances = if settings.extraction_base_path.as_os_str().is_empty() {
        vec![]
    } else {
        let mut session = ImportSession::new(settings);
        let instances = session.instantiate(&placements);
        log::info!("Instanced {} placements from {} models", instances.len(), session.cache.len());
        instances
    };
    write_json(args.output.as_deref(), &Listing { placements, instances })
}
