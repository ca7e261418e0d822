use std::path::PathBuf;

use anyhow::{Context, Result};
use argh::FromArgs;
use rbmtool::{
    format::blo::{self, BloScene},
    import::{ImportSession, Instance},
    util::file::map_file,
};
use serde::Serialize;

use super::{write_json, GlobalArgs};

#[derive(FromArgs, PartialEq, Debug)]
/// process BLO scene files
#[argh(subcommand, name = "blo")]
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
/// list the objects, decals and lights of a BLO file
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
    #[serde(flatten)]
    scene: BloScene,
    instances: Vec<Instance>,
}

fn list(args: ListArgs, global: &GlobalArgs) -> Result<()> {
    let settings = global.settings()?;
    let data = map_file(&args.input)?;
    let scene = blo::decode(&data).with_context(|| format!("Failed to decode '{}'", args.input.display()))?;
    log::info!(
        "{}: {} objects, {} decals, {} lights",
        args.input.display(),
        scene.objects.len(),
        scene.decals.len(),
        scene.lights.len()
    );

    let instances = if settings.extraction_base_path.as_os_str().is_empty() {
        vec![]
    } else {
        let mut session = ImportSession::new(settings);
        session.instantiate(&scene.objects)
    };
    write_json(args.output.as_deref(), &Listing { scene, instances })
}
