use std::path::PathBuf;

use bufmgr::{BufferError, BufferManager, BufferResult, FileHandle, PagedFileManager};
use clap::Parser;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Run a small workload through a buffer pool and print the frame table
#[derive(Debug, Parser)]
#[command(name = "bufmgr", version)]
struct Args {
    /// Page file to use; created when missing
    path: Option<PathBuf>,

    /// Number of frames in the pool
    #[arg(short, long, default_value_t = 8)]
    frames: usize,

    /// Number of pages to allocate
    #[arg(short, long, default_value_t = 12)]
    pages: usize,

    /// Use an in-memory page file instead of PATH
    #[arg(long, conflicts_with = "path")]
    memory: bool,

    /// Print the dump as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut file_manager = PagedFileManager::new();
    let handle = open_target(&mut file_manager, &args)?;
    let mut bm = BufferManager::with_capacity(file_manager, args.frames);

    let mut page_ids = Vec::with_capacity(args.pages);
    for _ in 0..args.pages {
        let (page_id, page) = bm.alloc_page(handle)?;
        page.data_mut()[..8].copy_from_slice(&(page_id as u64).to_le_bytes());
        bm.unpin_page(handle, page_id, true)?;
        page_ids.push(page_id);
    }

    // Touch every other page again so the clock has reference bits to clear
    for &page_id in page_ids.iter().step_by(2) {
        bm.fetch_page(handle, page_id)?;
        bm.unpin_page(handle, page_id, false)?;
    }

    let dump = bm.dump();
    if args.json {
        let json = serde_json::to_string_pretty(&dump)?;
        println!("{}", json);
    } else {
        print!("{}", dump);
    }

    bm.close_file(handle)?;
    info!(stats = ?bm.file_manager().stats(), "closed page file");

    Ok(())
}

fn open_target(file_manager: &mut PagedFileManager, args: &Args) -> BufferResult<FileHandle> {
    match &args.path {
        Some(path) if !args.memory => {
            if !path.exists() {
                file_manager.create_file(path)?;
            }
            Ok(file_manager.open_file(path)?)
        }
        _ => Ok(file_manager.open_memory()?),
    }
}
