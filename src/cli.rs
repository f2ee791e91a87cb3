use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "ridx",
    version,
    about = "Plugin registry indexer and reference resolver",
    after_help = r#"Examples:
  ridx index --workspace .
  ridx update --workspace . --path lib/modules/eld/eld-service.js
  ridx resolve --workspace . --path lib/modules/eld/eld-controller.js --name checkEldPermission --line 42
  ridx request --method status --params '{}'
  ridx serve --workspace .
"#
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Index the workspace once and exit.
    Index {
        #[arg(long, default_value = ".")]
        workspace: PathBuf,
        /// Skip writing the .ridx cache.
        #[arg(long)]
        no_cache: bool,
    },
    /// Re-extract a single registry file and merge it into the cached tree.
    Update {
        #[arg(long, default_value = ".")]
        workspace: PathBuf,
        /// File to re-extract, relative to the workspace root.
        #[arg(long)]
        path: PathBuf,
    },
    /// Resolve a member reference in a document to its definition.
    Resolve {
        #[arg(long, default_value = ".")]
        workspace: PathBuf,
        /// Document containing the reference, relative to the workspace root.
        #[arg(long)]
        path: PathBuf,
        /// Member name to resolve.
        #[arg(long)]
        name: String,
        /// 1-based line number where the reference appears.
        #[arg(long)]
        line: u32,
    },
    /// Run a single JSONL request and exit.
    Request {
        #[arg(long, default_value = ".")]
        workspace: PathBuf,
        #[arg(long)]
        method: String,
        #[arg(long, default_value = "{}")]
        params: String,
        #[arg(long, value_name = "PATH")]
        params_file: Option<PathBuf>,
        #[arg(long, default_value = "1")]
        id: String,
    },
    /// Run JSONL RPC server over stdin/stdout.
    Serve {
        #[arg(long, default_value = ".")]
        workspace: PathBuf,
    },
}
