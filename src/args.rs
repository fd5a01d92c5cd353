use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gridview")]
#[command(about = "Browse, filter and sort CSV data in the terminal", long_about = None)]
pub struct Cli {
    /// CSV file to open
    pub data: PathBuf,

    /// YAML column schema; inferred from the CSV header when omitted
    #[arg(short, long)]
    pub schema: Option<PathBuf>,

    /// Rows per page (must be one of the configured page sizes)
    #[arg(short, long)]
    pub page_size: Option<usize>,

    /// Answer filter, sort and page requests from a simulated backend
    #[arg(long)]
    pub manual: bool,

    /// Allow only one selected row at a time
    #[arg(long)]
    pub single_select: bool,

    /// Log level written to ~/.gridview/gridview.log
    #[arg(long)]
    pub log_level: Option<String>,
}
