mod cmd;

use argh::FromArgs;
use cmd::{GlobalArgs, SubCommand};

#[derive(FromArgs, PartialEq, Debug)]
/// RBM model and placement container tools.
struct TopLevel {
    #[argh(subcommand)]
    command: SubCommand,
    #[argh(option)]
    /// import settings file (JSON)
    config: Option<std::path::PathBuf>,
    #[argh(option)]
    /// extraction base path used to resolve models and textures
    base_path: Option<std::path::PathBuf>,
    #[argh(option)]
    /// texture file extension replacing .ddsc (e.g. ".png")
    texture_ext: Option<String>,
    #[argh(option)]
    /// ddsc.db colour space table
    ddsc_db: Option<std::path::PathBuf>,
    #[argh(switch)]
    /// scan input directories recursively
    recursive: bool,
    #[argh(switch)]
    /// skip debris and damage models
    skip_debris: bool,
    #[argh(switch)]
    /// decode unorm16 V coordinates with a positive denominator
    positive_v: bool,
    #[argh(switch)]
    /// rotate parented objects by -90 degrees about X
    child_x_correction: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .format_target(false)
        .format_level(false)
        .init();

    let args: TopLevel = argh::from_env();
    let global = GlobalArgs {
        config: args.config,
        base_path: args.base_path,
        texture_ext: args.texture_ext,
        ddsc_db: args.ddsc_db,
        recursive: args.recursive,
        skip_debris: args.skip_debris,
        positive_v: args.positive_v,
        child_x_correction: args.child_x_correction,
    };
    let result = match args.command {
        SubCommand::Rbm(args) => cmd::rbm::run(args, &global),
        SubCommand::Mdic(args) => cmd::mdic::run(args, &global),
        SubCommand::Blo(args) => cmd::blo::run(args, &global),
    };
    if let Err(e) = result {
        eprintln!("Failed: {e:?}");
        std::process::exit(1);
    }
}
