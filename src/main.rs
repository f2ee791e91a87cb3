use anyhow::Result;
use clap::Parser;
use ridx::registry::IndexBuilder;
use ridx::resolve::Resolver;
use ridx::{cache, cli, rpc, util};
use serde_json::json;

fn main() -> Result<()> {
    let args = cli::Args::parse();

    match args.command {
        cli::Command::Index {
            workspace,
            no_cache,
        } => {
            let builder = IndexBuilder::new(workspace);
            let result = builder.build_full()?;
            if !no_cache {
                cache::store(builder.workspace_root(), &result.tree, &result.file_hashes)?;
            }
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "stats": result.stats,
                    "registered": result.tree.leaf_count(),
                }))?
            );
            Ok(())
        }
        cli::Command::Update { workspace, path } => {
            let builder = IndexBuilder::new(workspace);
            let mut cached = match cache::load(builder.workspace_root()) {
                Some(cached) => cached,
                None => {
                    let result = builder.build_full()?;
                    cache::RegistryCache {
                        tree: result.tree,
                        files: result.file_hashes,
                    }
                }
            };
            let updated = match builder.build_partial(&path)? {
                Some(partial) => {
                    let changed = cached.files.get(&partial.rel_path) != Some(&partial.hash);
                    if changed {
                        cached.tree.merge(partial.tree);
                        cached.files.insert(partial.rel_path, partial.hash);
                    }
                    changed
                }
                None => false,
            };
            cache::store(builder.workspace_root(), &cached.tree, &cached.files)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "updated": updated,
                    "registered": cached.tree.leaf_count(),
                }))?
            );
            Ok(())
        }
        cli::Command::Resolve {
            workspace,
            path,
            name,
            line,
        } => {
            let builder = IndexBuilder::new(workspace);
            let tree = match cache::load(builder.workspace_root()) {
                Some(cached) => cached.tree,
                None => {
                    let result = builder.build_full()?;
                    cache::store(builder.workspace_root(), &result.tree, &result.file_hashes)?;
                    result.tree
                }
            };
            let text = util::read_to_string(&builder.workspace_root().join(&path))?;
            let resolver = Resolver::new(builder.workspace_root().to_path_buf(), &tree);
            match resolver.resolve(&text, &name, line) {
                Some(definition) => {
                    println!("{}", serde_json::to_string_pretty(&definition)?);
                }
                None => {
                    println!("null");
                }
            }
            Ok(())
        }
        cli::Command::Request {
            workspace,
            method,
            params,
            params_file,
            id,
        } => {
            let params_raw = if let Some(path) = params_file {
                std::fs::read_to_string(&path)?
            } else {
                params
            };
            let response = rpc::call(workspace, method, &params_raw, &id)?;
            println!("{response}");
            Ok(())
        }
        cli::Command::Serve { workspace } => rpc::serve(workspace),
    }
}
