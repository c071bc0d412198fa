use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tarsh::archive::{self, ArchiveEntry};
use tarsh::fs::InMemoryFs;
use tarsh::{Shell, ShellOptions};

#[derive(Parser)]
#[command(name = "tarsh")]
#[command(about = "An interactive shell over an archive-backed file tree")]
#[command(version)]
struct Cli {
    /// Username shown in the prompt
    #[arg(long)]
    username: String,

    /// Path to the virtual filesystem archive (.tar or .tar.gz)
    #[arg(long = "filesystem")]
    filesystem: PathBuf,

    /// Path the audit log is flushed to on exit
    #[arg(long)]
    logfile: PathBuf,

    /// Write a sample filesystem archive to the --filesystem path and exit
    #[arg(long = "generate-files")]
    generate_files: bool,
}

fn sample_archive() -> Vec<ArchiveEntry> {
    vec![
        ArchiveEntry::file("file1.txt", b"This is the contents of file 1.\n".to_vec()),
        ArchiveEntry::file("file2.txt", b"1\n2\n3\n".to_vec()),
        ArchiveEntry::directory("subdir"),
        ArchiveEntry::file("subdir/file3.txt", b"A file in a subdirectory.\n".to_vec()),
    ]
}

fn generate_files(path: &Path) -> io::Result<()> {
    let mut data = archive::pack(&sample_archive());
    if path.extension().is_some_and(|ext| ext == "gz") {
        data = archive::tar::gzip(&data).map_err(io::Error::other)?;
    }
    std::fs::write(path, data)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.generate_files {
        match generate_files(&cli.filesystem) {
            Ok(()) => {
                println!(
                    "Sample filesystem archive written to {}",
                    cli.filesystem.display()
                );
                return;
            }
            Err(e) => {
                eprintln!("Error: cannot write {}: {}", cli.filesystem.display(), e);
                std::process::exit(1);
            }
        }
    }

    let bytes = match std::fs::read(&cli.filesystem) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!(
                "Error: cannot read filesystem archive {}: {} (run with --generate-files to create one)",
                cli.filesystem.display(),
                e
            );
            std::process::exit(1);
        }
    };

    let entries = match archive::read_archive(&bytes) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("Error: {}: {}", cli.filesystem.display(), e);
            std::process::exit(1);
        }
    };

    let fs = Arc::new(InMemoryFs::new());
    if let Err(e) = archive::materialize(fs.as_ref(), "/", &entries).await {
        eprintln!("Error: cannot materialize archive: {}", e);
        std::process::exit(1);
    }

    let mut shell = Shell::new(ShellOptions {
        username: Some(cli.username),
        fs: Some(fs),
        log_path: Some(cli.logfile),
        ..Default::default()
    });

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{}", shell.prompt());
        let _ = io::stdout().flush();

        let (line, eof) = match lines.next() {
            Some(Ok(line)) => (line, false),
            // EOF or read failure: terminate cleanly so the log is flushed.
            _ => ("exit".to_string(), true),
        };

        let result = shell.execute(&line).await;
        if !result.text.is_empty() {
            println!("{}", result.text);
        }
        // A failed flush on exit leaves the session active for a retry,
        // but at EOF there is nothing more to read.
        if result.terminated || eof {
            break;
        }
    }
}
