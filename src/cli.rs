use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use ocr_result::{ImageType, ResultMode};

#[derive(Parser, Debug)]
#[command(
    name = "ocr-result",
    version,
    about = "Result generation for line-level OCR projects"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Result(ResultArgs),
    Pages(PagesArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    #[arg(long)]
    pub project_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = ImageType::Binary)]
    pub image_type: ImageType,

    /// JSON file with result settings; missing fields keep their defaults.
    #[arg(long)]
    pub settings_path: Option<PathBuf>,

    #[arg(long)]
    pub rec_ext: Option<String>,

    #[arg(long)]
    pub gt_ext: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ResultArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    #[arg(long, value_enum, default_value_t = ResultMode::Text)]
    pub mode: ResultMode,

    /// Pages to process; defaults to every page with completed recognition.
    #[arg(long = "page")]
    pub pages: Vec<String>,

    /// Names of processes currently running on the project.
    #[arg(long = "running")]
    pub running: Vec<String>,

    #[arg(long)]
    pub converter: Option<String>,

    #[arg(long)]
    pub converter_timeout_secs: Option<u64>,

    #[arg(long, default_value_t = 500)]
    pub poll_interval_ms: u64,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct PagesArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}
