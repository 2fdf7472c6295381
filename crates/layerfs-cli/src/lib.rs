//! layerfs command-line front end.
//!
//! Builds a [`LayeredFs`] from a config file and/or `--layer` directories and
//! runs one read-only command against it. Rendering lives here, apart from
//! the binary, so it can be tested without spawning a process.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use layerfs::{DirEntry, DirectoryMode, LayerConfig, LayeredFs, ReadLimit, Tolerance};

/// Entries requested per read when draining an overlay directory handle.
const LIST_BATCH: usize = 64;

#[derive(Debug, Parser)]
#[command(name = "layerfs")]
#[command(version)]
#[command(about = "Read files through a stack of layered directories")]
pub struct Cli {
    /// Layer configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host directory to use as a layer; repeat for more, highest priority first
    #[arg(short, long = "layer", value_name = "DIR")]
    pub layers: Vec<PathBuf>,

    /// Keep going past broken layers instead of failing on the first one
    #[arg(long)]
    pub best_effort: bool,

    /// Merge directories across layers when opening them
    #[arg(long)]
    pub overlay: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print a file's contents
    Cat { path: String },

    /// List a directory
    Ls {
        #[arg(default_value = ".")]
        path: String,

        /// Emit JSON instead of one name per line
        #[arg(long)]
        json: bool,
    },

    /// Show metadata for a path
    Stat {
        path: String,

        /// Emit JSON instead of key: value lines
        #[arg(long)]
        json: bool,
    },
}

/// Assemble the layered filesystem described by the command line.
///
/// `--layer` directories come after any configured layers. Policy flags only
/// ever turn a setting on, overriding the config file.
pub async fn build_fs(cli: &Cli) -> Result<LayeredFs> {
    let mut config = match &cli.config {
        Some(path) => LayerConfig::load(path)
            .await
            .with_context(|| format!("Failed to load layer config {}", path.display()))?,
        None => LayerConfig::default(),
    };

    for dir in &cli.layers {
        config.push_local(dir);
    }
    if cli.best_effort {
        config.policy.tolerance = Tolerance::BestEffort;
    }
    if cli.overlay {
        config.policy.directory_mode = DirectoryMode::Overlay;
    }

    tracing::debug!(
        layers = config.layers.len(),
        policy = ?config.policy,
        "built layered filesystem"
    );
    Ok(config.build())
}

/// Run `command` and return the bytes to print.
///
/// `cat` passes file contents through untouched; the other commands
/// render UTF-8 text.
pub async fn execute(fs: &LayeredFs, command: &Command) -> Result<Vec<u8>> {
    match command {
        Command::Cat { path } => Ok(fs.read_file(path).await?),
        Command::Ls { path, json } => {
            let entries = list(fs, path).await?;
            if *json {
                return Ok(serde_json::to_vec_pretty(&entries)?);
            }
            let mut out = String::new();
            for entry in &entries {
                let suffix = if entry.is_dir() { "/" } else { "" };
                writeln!(out, "{}{}", entry.name, suffix)?;
            }
            Ok(out.into_bytes())
        }
        Command::Stat { path, json } => {
            let info = fs.stat(path).await?;
            if *json {
                return Ok(serde_json::to_vec_pretty(&info)?);
            }
            Ok(render_stat(&info)?.into_bytes())
        }
    }
}

/// Overlay mode lists through the merged directory handle; otherwise the
/// merged `read_dir` result is used directly.
async fn list(fs: &LayeredFs, path: &str) -> Result<Vec<DirEntry>> {
    if fs.policy().directory_mode == DirectoryMode::FirstWins {
        return Ok(fs.read_dir(path).await?);
    }

    let mut handle = fs.open(path).await?;
    let Some(dir) = handle.as_dir() else {
        anyhow::bail!("{path}: not a directory");
    };
    let mut entries = Vec::new();
    loop {
        let batch = dir.read_entries(ReadLimit::Up(LIST_BATCH)).await?;
        entries.extend(batch.entries);
        if batch.end {
            break;
        }
    }
    Ok(entries)
}

fn render_stat(info: &DirEntry) -> Result<String> {
    let kind = if info.is_dir() { "directory" } else { "file" };
    let mut out = String::new();
    writeln!(out, "name: {}", info.name)?;
    writeln!(out, "kind: {kind}")?;
    writeln!(out, "size: {}", info.size)?;
    if let Some(mode) = info.permissions {
        writeln!(out, "permissions: {:o}", mode & 0o7777)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags_and_subcommand() {
        let cli = Cli::try_parse_from([
            "layerfs", "-l", "a", "--layer", "b", "--overlay", "ls", "views", "--json",
        ])
        .unwrap();
        assert_eq!(cli.layers, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert!(cli.overlay);
        assert!(!cli.best_effort);
        assert!(matches!(
            cli.command,
            Command::Ls { ref path, json: true } if path == "views"
        ));
    }

    #[test]
    fn test_ls_defaults_to_root() {
        let cli = Cli::try_parse_from(["layerfs", "ls"]).unwrap();
        assert!(matches!(cli.command, Command::Ls { ref path, json: false } if path == "."));
    }

    #[test]
    fn test_render_stat() {
        let info = layerfs::DirEntry::file("a.txt", 3).with_permissions(0o100644);
        let out = render_stat(&info).unwrap();
        assert_eq!(out, "name: a.txt\nkind: file\nsize: 3\npermissions: 644\n");
    }

    #[tokio::test]
    async fn test_flags_override_config_policy() {
        let cli = Cli::try_parse_from(["layerfs", "--best-effort", "--overlay", "ls"]).unwrap();
        let fs = build_fs(&cli).await.unwrap();
        assert!(fs.is_empty());
        assert_eq!(fs.policy().tolerance, Tolerance::BestEffort);
        assert_eq!(fs.policy().directory_mode, DirectoryMode::Overlay);
    }
}
