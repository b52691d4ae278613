use std::io::{self, Write};

use anyhow::{Context, Result};
use ocr_result::ResultJob;
use tracing::info;

use crate::cli::PagesArgs;
use crate::commands::load_config;

pub fn run(args: PagesArgs) -> Result<()> {
    let config = load_config(&args.project)?;
    let job = ResultJob::new(config);

    let page_ids = job
        .valid_page_ids_for_result()
        .context("failed to list pages with completed recognition")?;
    info!(pages = page_ids.len(), "listed pages ready for result generation");

    let mut output = io::BufWriter::new(io::stdout().lock());
    if args.json {
        serde_json::to_writer_pretty(&mut output, &page_ids)
            .context("failed to serialize page list")?;
        writeln!(output)?;
    } else {
        for page_id in &page_ids {
            writeln!(output, "{page_id}")?;
        }
    }
    output.flush()?;

    Ok(())
}
