pub mod blo;
pub mod mdic;
pub mod rbm;

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use argh::FromArgs;
use rbmtool::{format::render_block::codec::VSign, import::ImportSettings, util::file::map_file};
use serde::Serialize;

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand)]
pub enum SubCommand {
    Rbm(rbm::Args),
    Mdic(mdic::Args),
    Blo(blo::Args),
}

/// Options shared by every subcommand.
#[derive(Clone, Debug, Default)]
pub struct GlobalArgs {
    pub config: Option<PathBuf>,
    pub base_path: Option<PathBuf>,
    pub texture_ext: Option<String>,
    pub ddsc_db: Option<PathBuf>,
    pub recursive: bool,
    pub skip_debris: bool,
    pub positive_v: bool,
    pub child_x_correction: bool,
}

impl GlobalArgs {
    /// Settings from the config file, overridden by command line options.
    pub fn settings(&self) -> Result<ImportSettings> {
        let mut settings = match &self.config {
            Some(path) => {
                let data = map_file(path)?;
                serde_json::from_slice::<ImportSettings>(&data)
                    .with_context(|| format!("Failed to parse settings '{}'", path.display()))?
            }
            None => ImportSettings::default(),
        };
        if let Some(base_path) = &self.base_path {
            settings.extraction_base_path = base_path.clone();
        }
        if let Some(ext) = &self.texture_ext {
            settings.texture_extension =
                if ext.starts_with('.') { ext.clone() } else { format!(".{ext}") };
        }
        if let Some(ddsc_db) = &self.ddsc_db {
            settings.ddsc_db = Some(ddsc_db.clone());
        }
        settings.recursive |= self.recursive;
        if self.skip_debris {
            settings.include_debris = false;
        }
        if self.positive_v {
            settings.unorm_v_sign = VSign::Positive;
        }
        settings.child_x_correction |= self.child_x_correction;
        log::debug!("Settings: {settings:?}");
        Ok(settings)
    }
}

/// Writes `value` as pretty JSON to `out`, or to stdout.
pub fn write_json<T: Serialize>(out: Option<&Path>, value: &T) -> Result<()> {
    match out {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create '{}'", path.display()))?;
            let mut w = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut w, value)?;
            w.flush()?;
            log::info!("Wrote {}", path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut w = stdout.lock();
            serde_json::to_writer_pretty(&mut w, value)?;
            writeln!(w)?;
        }
    }
    Ok(())
}
