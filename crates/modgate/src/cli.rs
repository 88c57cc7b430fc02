use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Clone, Debug, Parser)]
#[command(name = "modgate", version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
pub struct App {
    /// Configuration file; `MODGATE_*` environment variables override it.
    #[arg(short, long, global = true, default_value = "modgate.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Show the project, subdirectory and tag a module version maps to
    #[command(alias = "r", name = "resolve")]
    Resolve { path: String, version: String },

    /// List known versions of a module
    #[command(alias = "ls", name = "list")]
    List { path: String },

    /// Print the info record of a module version
    #[command(alias = "q", name = "query")]
    Query {
        path:    String,
        /// Canonical version; `latest` is only answered by the upstream proxy
        version: String,
    },

    /// Fetch the info, go.mod and zip of a module version
    #[command(alias = "dl", name = "download")]
    Download {
        path:    String,
        version: String,
        /// Directory the three files are written to
        #[arg(short, long, default_value = ".")]
        out:     PathBuf,
    },

    /// Show metadata of a cached object
    #[command(name = "cache-get")]
    CacheGet { name: String },

    /// Print the effective configuration
    #[command(alias = "cfg", name = "config")]
    Config,
}
