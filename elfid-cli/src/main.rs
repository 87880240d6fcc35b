use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::Parser;
use colored::Colorize;
use elfid_core::{Binary, Header, IdentError, Identification};
use serde::Serialize;
use tabled::{Table, Tabled};

/// Simple ELF identification CLI
#[derive(Parser)]
#[command(
    name = "elfid",
    about = "Check the ELF magic and report class, endianness, and header version",
    version,
    author
)]
struct Cli {
    /// Paths to the files to inspect
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Print one JSON object per file
    #[arg(long, conflicts_with = "table")]
    json: bool,

    /// Inspect every file, then print a summary table
    #[arg(long)]
    table: bool,

    /// Also print OS/ABI and ABI version (JSON output always includes them)
    #[arg(long, conflicts_with_all = ["json", "table"])]
    extended: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    path: &'a str,
    format: &'static str,
    class: &'static str,
    endianness: &'static str,
    version: &'static str,
    os_abi: Option<String>,
    abi_version: Option<u8>,
}

impl<'a> From<&'a Binary> for Report<'a> {
    fn from(bin: &'a Binary) -> Self {
        let id = &bin.identification;
        Report {
            path: &bin.path,
            format: id.format_name(),
            class: id.class.as_str(),
            endianness: id.endianness.as_str(),
            version: id.version.as_str(),
            os_abi: id.os_abi.map(|abi| abi.to_string()),
            abi_version: id.abi_version,
        }
    }
}

#[derive(Tabled)]
struct Row {
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Class")]
    class: String,
    #[tabled(rename = "Endianness")]
    endianness: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "OS/ABI")]
    os_abi: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl Row {
    fn ok(bin: &Binary) -> Self {
        let id = &bin.identification;
        Row {
            path: bin.path.clone(),
            class: id.class.to_string(),
            endianness: id.endianness.to_string(),
            version: id.version.to_string(),
            os_abi: id.os_abi.map(|abi| abi.to_string()).unwrap_or_default(),
            status: "ok".to_string(),
        }
    }

    fn failed(path: &Path, err: &anyhow::Error) -> Self {
        Row {
            path: path.display().to_string(),
            class: "-".to_string(),
            endianness: "-".to_string(),
            version: "-".to_string(),
            os_abi: "-".to_string(),
            status: err.root_cause().to_string(),
        }
    }
}

/// I/O errors already name the path; validation errors get it prepended.
fn load(path: &Path) -> Result<Binary> {
    Binary::open(path).map_err(|e| {
        if e.is::<IdentError>() {
            e.context(path.display().to_string())
        } else {
            e
        }
    })
}

fn render_text(id: &Identification, extended: bool) -> String {
    let mut out = id.to_string();
    if extended {
        if let Some(abi) = id.os_abi {
            out.push_str(&format!("\nOS/ABI: {abi}"));
        }
        if let Some(abi_version) = id.abi_version {
            out.push_str(&format!("\nABI Version: {abi_version}"));
        }
    }
    out
}

fn run(cli: &Cli, out: &mut impl Write) -> Result<()> {
    if cli.table {
        let mut rows = Vec::with_capacity(cli.paths.len());
        let mut failed = 0;
        for path in &cli.paths {
            match load(path) {
                Ok(bin) => rows.push(Row::ok(&bin)),
                Err(e) => {
                    log::warn!("{:#}", e);
                    failed += 1;
                    rows.push(Row::failed(path, &e));
                }
            }
        }

        writeln!(out, "{}", Table::new(rows))?;
        if failed > 0 {
            bail!("{} of {} files failed identification", failed, cli.paths.len());
        }
        return Ok(());
    }

    for path in &cli.paths {
        let bin = load(path)?;
        if cli.json {
            writeln!(out, "{}", serde_json::to_string(&Report::from(&bin))?)?;
        } else {
            writeln!(out, "{}", render_text(&bin.identification, cli.extended))?;
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let mut stdout = io::stdout().lock();
    match run(&cli, &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
