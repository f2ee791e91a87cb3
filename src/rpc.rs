use crate::cache;
use crate::registry::tree::RegistryTree;
use crate::registry::{BuildStats, IndexBuilder};
use crate::resolve::Resolver;
use crate::util;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

#[derive(Deserialize)]
struct RpcRequest {
    #[serde(default)]
    id: Value,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Serialize)]
struct RpcResponse {
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

#[derive(Serialize)]
struct RpcError {
    message: String,
}

#[derive(Deserialize)]
struct UpdateFileParams {
    path: String,
}

#[derive(Deserialize)]
struct ResolveParams {
    #[serde(alias = "name", alias = "reference")]
    reference_name: String,
    line: u32,
    /// Inline document text; when absent, `path` is read from disk.
    text: Option<String>,
    path: Option<String>,
}

const METHOD_LIST: &[&str] = &["reindex", "update_file", "resolve", "status", "help"];

fn method_help() -> Value {
    json!({
        "summary": "ridx indexes Hapi-convention plugin registries and serves JSONL RPC over stdin/stdout.",
        "methods": METHOD_LIST,
        "examples": [
            { "method": "reindex", "params": {} },
            { "method": "update_file", "params": { "path": "lib/modules/eld/eld-service.js" } },
            { "method": "resolve", "params": { "reference_name": "checkEldPermission", "line": 42, "path": "lib/modules/eld/eld-controller.js" } }
        ]
    })
}

pub fn serve(workspace_root: PathBuf) -> Result<()> {
    let mut app = App::new(workspace_root)?;
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(value) => value,
            Err(err) => {
                eprintln!("stdin error: {err}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(request) => app.handle_request(request),
            Err(err) => error_response(Value::Null, &format!("invalid request: {err}")),
        };

        writeln!(stdout, "{}", serde_json::to_string(&response)?)?;
        stdout.flush()?;
    }

    Ok(())
}

/// Run a single method without the serve loop, for `ridx request`.
pub fn call(workspace_root: PathBuf, method: String, params_raw: &str, id_raw: &str) -> Result<String> {
    let params: Value = serde_json::from_str(params_raw).with_context(|| "parse params JSON")?;
    let id = parse_value(id_raw);
    let mut app = App::new(workspace_root)?;
    let request = RpcRequest { id, method, params };
    let response = app.handle_request(request);
    Ok(serde_json::to_string(&response)?)
}

struct App {
    builder: IndexBuilder,
    tree: RegistryTree,
    file_hashes: BTreeMap<String, String>,
}

impl App {
    fn new(workspace_root: PathBuf) -> Result<Self> {
        let builder = IndexBuilder::new(workspace_root);
        let mut app = Self {
            builder,
            tree: RegistryTree::new(),
            file_hashes: BTreeMap::new(),
        };
        match cache::load(app.builder.workspace_root()) {
            Some(cached) => {
                app.tree = cached.tree;
                app.file_hashes = cached.files;
            }
            None => {
                app.reindex()?;
            }
        }
        Ok(app)
    }

    fn handle_request(&mut self, req: RpcRequest) -> RpcResponse {
        let id = req.id.clone();
        let result = self.handle_method(&req.method, req.params);

        match result {
            Ok(value) => RpcResponse {
                id,
                result: Some(value),
                error: None,
            },
            Err(err) => error_response(id, &err.to_string()),
        }
    }

    fn handle_method(&mut self, method: &str, params: Value) -> Result<Value> {
        match method {
            "reindex" => {
                let stats = self.reindex()?;
                Ok(json!({
                    "stats": stats,
                    "registered": self.tree.leaf_count(),
                }))
            }
            "update_file" => {
                let params: UpdateFileParams = serde_json::from_value(params)?;
                let updated = self.update_file(&params.path)?;
                Ok(json!({
                    "updated": updated,
                    "registered": self.tree.leaf_count(),
                }))
            }
            "resolve" => {
                let params: ResolveParams = serde_json::from_value(params)?;
                let text = match (params.text, params.path.as_deref()) {
                    (Some(text), _) => text,
                    (None, Some(path)) => {
                        util::read_to_string(&self.builder.workspace_root().join(path))?
                    }
                    (None, None) => anyhow::bail!("resolve requires either text or path"),
                };
                let resolver =
                    Resolver::new(self.builder.workspace_root().to_path_buf(), &self.tree);
                match resolver.resolve(&text, &params.reference_name, params.line) {
                    Some(definition) => Ok(serde_json::to_value(definition)?),
                    None => Ok(Value::Null),
                }
            }
            "status" => Ok(json!({
                "workspace": self.builder.workspace_root().display().to_string(),
                "registered": self.tree.leaf_count(),
                "files": self.file_hashes.len(),
            })),
            "help" | "list_methods" => Ok(method_help()),
            other => anyhow::bail!("unknown method: {other}"),
        }
    }

    fn reindex(&mut self) -> Result<BuildStats> {
        let result = self.builder.build_full()?;
        self.tree = result.tree;
        self.file_hashes = result.file_hashes;
        self.persist();
        Ok(result.stats)
    }

    fn update_file(&mut self, path: &str) -> Result<bool> {
        let Some(partial) = self.builder.build_partial(Path::new(path))? else {
            return Ok(false);
        };
        if self.file_hashes.get(&partial.rel_path) == Some(&partial.hash) {
            return Ok(false);
        }
        self.tree.merge(partial.tree);
        self.file_hashes.insert(partial.rel_path, partial.hash);
        self.persist();
        Ok(true)
    }

    fn persist(&self) {
        if let Err(err) = cache::store(self.builder.workspace_root(), &self.tree, &self.file_hashes)
        {
            eprintln!("ridx: warning: failed to write cache: {err}");
        }
    }
}

fn error_response(id: Value, message: &str) -> RpcResponse {
    RpcResponse {
        id,
        result: None,
        error: Some(RpcError {
            message: message.to_string(),
        }),
    }
}

fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
