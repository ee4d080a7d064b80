use clap::Parser;
use heic2png_core::{BatchConfig, OverwritePolicy};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "heic2png")]
#[command(about = "Convert HEIC images to PNG in parallel", disable_version_flag = true)]
pub struct Cli {
    /// Find all *.heic files in the current directory and convert them to *.png
    #[arg(short, long)]
    pub all: bool,

    /// Convert a single heic file to .png
    #[arg(short, long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Max number of files to process in parallel [default: number of CPUs]
    #[arg(short, long, value_name = "N")]
    pub procs: Option<usize>,

    /// Delete each source file after it was converted successfully
    #[arg(short, long)]
    pub delete: bool,

    /// Overwrite existing .png files
    #[arg(long)]
    pub force: bool,

    /// Print a JSON summary of the batch to stdout
    #[arg(long)]
    pub json: bool,

    /// Print version information and exit
    #[arg(short = 'v', long)]
    pub version: bool,
}

impl Cli {
    /// Whether any input was named.
    pub fn has_input(&self) -> bool {
        self.all || self.file.is_some()
    }

    /// Batch configuration from the parsed flags.
    pub fn batch_config(&self) -> BatchConfig {
        let defaults = BatchConfig::default();
        BatchConfig {
            workers: self.procs.unwrap_or(defaults.workers),
            ..defaults
        }
        .delete_on_success(self.delete)
        .overwrite(OverwritePolicy::from_force(self.force))
    }
}
