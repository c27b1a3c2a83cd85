//! CLI binary: fetch instance metadata and write an environment file.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use openstack_environment::{MetadataError, MetadataFormat, MetadataSource};

/// Default path of the output environment file.
const DEFAULT_OUTPUT: &str = "/etc/openstack-environment";

#[derive(Parser)]
#[command(name = "setup-openstack-environment")]
#[command(
    author,
    version,
    about = "Create an environment file with openstack information"
)]
struct Cli {
    /// Meta data format ("openstack" or "ec2")
    #[arg(short, long, default_value = "openstack", value_parser = parse_format)]
    format: MetadataFormat,

    /// Path of output file
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Path of config drive
    #[arg(short, long)]
    config_drive: Option<PathBuf>,
}

fn parse_format(s: &str) -> Result<MetadataFormat, String> {
    s.parse().map_err(|e: MetadataError| e.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), MetadataError> {
    let source = match cli.config_drive {
        Some(root) => MetadataSource::new(cli.format).with_config_drive(root),
        None => MetadataSource::new(cli.format),
    };

    let metadata = source.fetch().await?;

    write_output(&cli.output, &metadata.flatten())
}

/// Write the environment file with permissive mode. This only runs after
/// retrieval and flattening have fully succeeded, so a failed run never
/// leaves partial output behind.
fn write_output(path: &Path, text: &str) -> Result<(), MetadataError> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o777);
    }

    let mut file = options.open(path)?;
    file.write_all(text.as_bytes())?;
    Ok(())
}
