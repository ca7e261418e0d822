use std::path::PathBuf;

use anyhow::Result;
use argh::FromArgs;
use rbmtool::{
    format::{material::MaterialIdentity, rbm::RbmModel, BlockTag},
    import::{ImportSession, TextureBinding},
    util::file::collect_files,
};
use serde::Serialize;

use super::{write_json, GlobalArgs};

#[derive(FromArgs, PartialEq, Debug)]
/// process RBM files
#[argh(subcommand, name = "rbm")]
pub struct Args {
    #[argh(subcommand)]
    command: SubCommand,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand)]
enum SubCommand {
    Dump(DumpArgs),
}

#[derive(FromArgs, PartialEq, Eq, Debug)]
/// decode RBM files or directories to JSON
#[argh(subcommand, name = "dump")]
pub struct DumpArgs {
    #[argh(positional)]
    /// input files or directories
    inputs: Vec<PathBuf>,
    #[argh(option, short = 'o')]
    /// output file (default: stdout)
    output: Option<PathBuf>,
    #[argh(switch)]
    /// only print per-block counts
    summary: bool,
}

pub fn run(args: Args, global: &GlobalArgs) -> Result<()> {
    match args.command {
        SubCommand::Dump(c_args) => dump(c_args, global),
    }
}

#[derive(Serialize)]
struct BlockSummary {
    block: &'static str,
    tag: BlockTag,
    material: MaterialIdentity,
    flags: Vec<&'static str>,
    vertices: usize,
    faces: usize,
    uv_channels: Vec<usize>,
    textures: Vec<TextureBinding>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum FileReport<'a> {
    Summary { path: &'a PathBuf, model_name: &'a str, blocks: Vec<BlockSummary> },
    Full { path: &'a PathBuf, model: &'a RbmModel, textures: Vec<Vec<TextureBinding>> },
    Failed { path: &'a PathBuf, error: String },
}

fn dump(args: DumpArgs, global: &GlobalArgs) -> Result<()> {
    let settings = global.settings()?;
    let files = collect_files(&args.inputs, "rbm", settings.recursive)?;
    let session = ImportSession::new(settings);
    let results = session.decode_batch(&files);

    let mut reports = Vec::with_capacity(results.len());
    let mut failed = 0;
    for item in &results {
        let model = match &item.result {
            Ok(model) => model,
            Err(e) => {
                failed += 1;
                reports.push(FileReport::Failed { path: &item.path, error: e.to_string() });
                continue;
            }
        };
        if args.summary {
            let blocks = model
                .records
                .iter()
                .map(|record| BlockSummary {
                    block: record.block.name,
                    tag: record.block.tag,
                    material: record.material.clone(),
                    flags: record.flags.map(|f| record.block.flags_set(f)).unwrap_or_default(),
                    vertices: record.vertices.len(),
                    faces: record.faces.len(),
                    uv_channels: record.uv_channels(),
                    textures: session.resolve_textures(record),
                })
                .collect();
            reports.push(FileReport::Summary { path: &item.path, model_name: &model.model_name, blocks });
        } else {
            let textures = model.records.iter().map(|r| session.resolve_textures(r)).collect();
            reports.push(FileReport::Full { path: &item.path, model, textures });
        }
    }
    log::info!("Decoded {} of {} files", results.len() - failed, results.len());
    write_json(args.output.as_deref(), &reports)
}
