//! Lists the entries of an archive produced by `filepack`.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use filepack::inspect;

/// List the contents of an archive without extracting it.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The archive file to list contents of.
    archive: PathBuf,

    /// Print the `(listfile)` record instead of the archive directory.
    #[arg(long)]
    listing: bool,
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(filepack::ErrorKind::ArgError.exit_code())
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    filepack::cli_runner::init_logging();

    if let Err(e) = list(&args) {
        eprintln!("Error: {}", e);
        return ExitCode::from(e.exit_code());
    }
    ExitCode::SUCCESS
}

fn list(args: &Args) -> Result<(), filepack::PackError> {
    if args.listing {
        match inspect::read_listing(&args.archive)? {
            Some(names) => names.iter().for_each(|n| println!("{n}")),
            None => println!("Archive has no listing record."),
        }
        return Ok(());
    }

    let entries = inspect::list_entries(&args.archive)?;
    println!("Archive Index ({} files):", entries.len());
    for entry in entries {
        println!("- {} ({} bytes, {} compressed)", entry.name, entry.size, entry.compressed_size);
    }
    Ok(())
}
