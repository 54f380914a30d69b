//! # TinyIndex CLI Entry Point
//!
//! Maintenance commands for document indexes.
//!
//! ## Usage
//!
//! ```bash
//! # Create an index of 100 pages of 4096 bytes
//! tinyindex create ./index.tinykv 100 4096
//!
//! # Show dimensions and store statistics
//! tinyindex info ./index.tinykv
//!
//! # Dump a page, or the results for a term
//! tinyindex page ./index.tinykv 42
//! tinyindex retrieve ./index.tinykv python
//!
//! # Copy a legacy flat file into a new page store
//! tinyindex migrate ./index.tinysearch ./index.tinykv
//!
//! # Drop superseded page versions from the log
//! tinyindex compact ./index.tinykv
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `info`).

use std::env;
use std::path::{Path, PathBuf};

use eyre::{bail, Result, WrapErr};
use tinyindex::config::DEFAULT_PAGE_SIZE;
use tinyindex::storage::{is_legacy_file, LegacyIndexFile};
use tinyindex::{migrate, Document, Mode, TinyIndex};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();

    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();

    let Some(command) = args.first() else {
        print_usage();
        return Ok(());
    };
    let rest = &args[1..];

    match command.as_str() {
        "--help" | "-h" | "help" => {
            print_usage();
            Ok(())
        }
        "--version" | "-v" => {
            println!("tinyindex {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "create" => {
            let [path, num_pages, page_size @ ..] = rest else {
                bail!("usage: tinyindex create <path> <num_pages> [page_size]");
            };
            let num_pages: u32 = parse_number(num_pages, "num_pages")?;
            let page_size = match page_size {
                [] => DEFAULT_PAGE_SIZE,
                [size] => parse_number(size, "page_size")?,
                _ => bail!("usage: tinyindex create <path> <num_pages> [page_size]"),
            };
            create(Path::new(path), num_pages, page_size)
        }
        "info" => {
            let [path] = rest else {
                bail!("usage: tinyindex info <path>");
            };
            info(Path::new(path))
        }
        "page" => {
            let [path, page] = rest else {
                bail!("usage: tinyindex page <path> <page>");
            };
            let page: u32 = parse_number(page, "page")?;
            let index = TinyIndex::<Document>::open(path, Mode::Read)?;
            print_documents(&index.get_page(page)?);
            Ok(())
        }
        "retrieve" => {
            let [path, key] = rest else {
                bail!("usage: tinyindex retrieve <path> <key>");
            };
            let index = TinyIndex::<Document>::open(path, Mode::Read)?;
            println!("page {}", index.get_key_page_index(key));
            print_documents(&index.retrieve(key)?);
            Ok(())
        }
        "migrate" => {
            let [legacy, dest] = rest else {
                bail!("usage: tinyindex migrate <legacy_file> <dest>");
            };
            migrate_file(Path::new(legacy), &PathBuf::from(dest))
        }
        "compact" => {
            let [path] = rest else {
                bail!("usage: tinyindex compact <path>");
            };
            let index = TinyIndex::<Document>::open(path, Mode::Write)?;
            let stats = index.compact()?;
            println!(
                "generation {}: {} -> {} bytes",
                stats.generation, stats.old_bytes, stats.new_bytes
            );
            Ok(())
        }
        other => bail!("Unknown command: {}", other),
    }
}

fn parse_number<N>(value: &str, name: &str) -> Result<N>
where
    N: std::str::FromStr,
    N::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .wrap_err_with(|| format!("invalid {} '{}'", name, value))
}

fn create(path: &Path, num_pages: u32, page_size: usize) -> Result<()> {
    let index = TinyIndex::<Document>::create(path, num_pages, page_size)
        .wrap_err_with(|| format!("failed to create index at '{}'", path.display()))?;
    println!(
        "created {} pages of {} bytes at {}",
        index.num_pages(),
        index.page_size(),
        index.store_path().display()
    );
    Ok(())
}

fn info(path: &Path) -> Result<()> {
    let index = TinyIndex::<Document>::open(path, Mode::Read)?;
    let metadata = index.metadata();
    let stats = index.stats();

    println!("path:         {}", index.store_path().display());
    println!("version:      {}", metadata.version);
    println!("item type:    {}", metadata.item_type_name);
    println!("pages:        {}", metadata.num_pages);
    println!("page size:    {}", metadata.page_size);
    println!("generation:   {}", stats.generation);
    println!("committed:    {}", stats.committed);
    println!("log bytes:    {}", stats.log_bytes);
    println!("live bytes:   {}", stats.live_bytes);
    Ok(())
}

fn migrate_file(legacy: &Path, dest: &Path) -> Result<()> {
    if !is_legacy_file(legacy) {
        bail!("'{}' is not a legacy index file", legacy.display());
    }
    let source = LegacyIndexFile::open(legacy)?;
    let metadata = migrate(&source, dest)?;
    println!(
        "migrated {} pages of {} bytes into {}",
        metadata.num_pages,
        metadata.page_size,
        dest.display()
    );
    Ok(())
}

fn print_documents(documents: &[Document]) {
    for doc in documents {
        println!(
            "{}\t{}\t{}\t{}",
            doc.title,
            doc.url,
            doc.term.as_deref().unwrap_or("-"),
            doc.score.map_or_else(|| "-".to_string(), |s| s.to_string())
        );
    }
    println!("({} documents)", documents.len());
}

fn print_usage() {
    println!("TinyIndex - paged key-value search index");
    println!();
    println!("USAGE:");
    println!("    tinyindex <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    create <path> <num_pages> [page_size]   Create an empty index");
    println!("    info <path>                             Show dimensions and store statistics");
    println!("    page <path> <page>                      Print the documents of a page");
    println!("    retrieve <path> <key>                   Print the documents for a key");
    println!("    migrate <legacy_file> <dest>            Copy a legacy index into a page store");
    println!("    compact <path>                          Rewrite the log without stale versions");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help         Print help information");
    println!("    -v, --version      Print version information");
}
