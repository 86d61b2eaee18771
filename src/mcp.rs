//! Go documentation MCP implementation.
//!
//! This module exposes `go doc` as the MCP tool `get_doc`. Each call goes
//! through the same stages, strictly in order:
//!
//! 1. validate the arguments (flags against an allow-list, working directory),
//! 2. resolve the `path` argument into an import path,
//! 3. provision a throwaway module when no working directory was given,
//! 4. run `go doc` through the shared [`DocEngine`] cache,
//! 5. cut the output into the requested page.
//!
//! The whole pipeline runs under a per-request deadline. When it expires the
//! in-flight future is dropped, which kills any running `go` process and
//! removes the temporary module.
//!
//! # Example
//! ```no_run
//! use godoc_mcp::config::Config;
//! use godoc_mcp::mcp::GoDocServer;
//!
//! let server = GoDocServer::new(Config::default());
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use itertools::Itertools;
use rmcp::model::{Implementation, ProtocolVersion, ServerCapabilities};
use rmcp::{ServerHandler, model::ServerInfo, tool};
use rmcp::{schemars, model::{Content, IntoContents}};
use serde::{Deserialize, Serialize};

use crate::cache::{CacheKey, InMemoryCache};
use crate::command::GoCommand;
use crate::config::Config;
use crate::error::DocError;
use crate::godoc::{DocEngine, GoDocExtractor};
use crate::paginate::paginate;
use crate::resolver::{self, ResolvedReference};
use crate::workspace::TempModule;

/// `go doc` flags a client may pass through `cmd_flags`.
pub const ALLOWED_FLAGS: [&str; 5] = ["-all", "-src", "-u", "-short", "-c"];

#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GetDocParams {
    #[serde(default)]
    #[schemars(description = "Path to the Go package or file. Import path (e.g., 'io', 'github.com/user/repo') or local file path. Required.")]
    pub path: String,

    #[schemars(description = "Specific symbol to document (function, type, interface). Leave empty for full package docs.")]
    pub target: Option<String>,

    #[schemars(description = "Additional go doc flags: -all (all docs), -src (source code), -u (unexported symbols), -short, -c.")]
    pub cmd_flags: Option<Vec<String>>,

    #[schemars(description = "Working directory for module context. Required for relative paths (including '.').")]
    pub working_dir: Option<String>,

    #[schemars(description = "Page number (1-based) for paginated results. Defaults to 1.")]
    pub page: Option<i64>,

    #[schemars(description = "Lines per page, between 100 and 5000. Defaults to 1000.")]
    pub page_size: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct DocContent {
    pub content: String,
}

impl IntoContents for DocContent {
    fn into_contents(self) -> Vec<Content> {
        vec![Content::text(self.content)]
    }
}

/// MCP server answering `get_doc` calls.
///
/// Cloning is cheap; every clone shares the same document cache.
#[derive(Clone)]
pub struct GoDocServer {
    engine: DocEngine,
    go: GoCommand,
    config: Arc<Config>,
}

#[tool(tool_box)]
impl GoDocServer {
    pub fn new(config: Config) -> Self {
        let go = GoCommand::new(config.go_binary.clone(), config.command_timeout());
        let cache = Arc::new(InMemoryCache::new(config.cache_ttl(), config.cache_max_entries()));
        let extractor = Arc::new(GoDocExtractor::new(go.clone()));
        Self::with_engine(config, DocEngine::new(cache, extractor))
    }

    /// Builds a server around an existing engine, e.g. one shared by several
    /// transports or one with a substitute extractor.
    pub fn with_engine(config: Config, engine: DocEngine) -> Self {
        let go = GoCommand::new(config.go_binary.clone(), config.command_timeout());
        Self {
            engine,
            go,
            config: Arc::new(config),
        }
    }

    pub fn engine(&self) -> &DocEngine {
        &self.engine
    }

    #[tool(description = "Get Go documentation for a package, type, function, or method. \
        This is the preferred and most efficient way to understand Go packages, providing official package \
        documentation in a concise format. Use this before attempting to read source files directly. \
        Standard library: use just the package name (e.g., \"io\", \"net/http\"). \
        External packages: use the full import path (e.g., \"github.com/user/repo\"). \
        Local packages: use a relative path (e.g., \"./pkg\") with working_dir, or an absolute path. \
        Use -all for comprehensive package documentation. Results are cached and paginated.")]
    pub async fn get_doc(
        &self,
        #[tool(aggr)] params: GetDocParams,
    ) -> Result<DocContent, DocError> {
        let deadline = self.config.request_timeout();
        tracing::info!(
            "get_doc path={:?} target={:?} flags={:?} working_dir={:?}",
            params.path,
            params.target,
            params.cmd_flags,
            params.working_dir
        );

        match tokio::time::timeout(deadline, self.handle(params)).await {
            Ok(result) => result.inspect_err(|e| tracing::warn!("get_doc failed: {}", e)),
            Err(_) => {
                tracing::warn!("get_doc exceeded its {}s deadline", deadline.as_secs());
                Err(DocError::Timeout {
                    what: "get_doc request".to_string(),
                    after: deadline,
                })
            }
        }
    }

    async fn handle(&self, params: GetDocParams) -> Result<DocContent, DocError> {
        let path = params.path.trim();
        if path.is_empty() {
            return Err(DocError::InvalidInput("path argument is required".to_string()));
        }

        let working_dir = params
            .working_dir
            .as_deref()
            .map(str::trim)
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from);
        if let Some(dir) = &working_dir {
            if !dir.is_dir() {
                return Err(DocError::InvalidInput(format!(
                    "invalid working directory: {}",
                    dir.display()
                )));
            }
        }

        let flags = params.cmd_flags.unwrap_or_default();
        validate_flags(&flags)?;

        let import_path = match locate(path, working_dir.as_deref()).await? {
            ResolvedReference::ImportPath(import_path) => import_path,
            ResolvedReference::SubPackages(packages) => {
                let base = path.trim_end_matches('/');
                let listing = packages.iter().map(|pkg| format!("{base}/{pkg}")).join("\n");
                return Ok(DocContent {
                    content: format!(
                        "No Go files found in {path}, but found Go packages in:\n{listing}"
                    ),
                });
            }
        };

        let mut args = flags;
        args.push(import_path.clone());
        if let Some(target) = params.target.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            args.push(target.to_string());
        }

        let doc = match &working_dir {
            Some(dir) => self.engine.run(dir, &args).await?,
            None => self.run_in_temp_module(&import_path, &args).await?,
        };

        let page_size = self.config.page_size(params.page_size);
        let page = paginate(&doc, params.page.unwrap_or(1), page_size)?;
        Ok(DocContent {
            content: page.to_string(),
        })
    }

    /// Serves from the cache when possible; only a miss pays for `go mod init`
    /// and `go get`.
    async fn run_in_temp_module(
        &self,
        import_path: &str,
        args: &[String],
    ) -> Result<String, DocError> {
        let key = CacheKey::ephemeral(args);
        if let Some(doc) = self.engine.cached(&key).await {
            return Ok(doc);
        }

        let base = self.config.temp_root();
        let module = TempModule::create_in(&base, &self.go, import_path).await?;
        let doc = self.engine.run_keyed(key, module.path(), args).await;
        module.close();
        doc
    }
}

#[tool(tool_box)]
impl ServerHandler for GoDocServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "This server provides Go documentation through go doc. \
                Use the 'get_doc' tool with a standard library package name ('io'), \
                a full import path ('github.com/user/repo'), or a local path ('./pkg' with working_dir). \
                Start with package documentation before looking up specific symbols. \
                Long output is paginated; results are cached for a few minutes.".to_string()
            ),
        }
    }
}

fn validate_flags(flags: &[String]) -> Result<(), DocError> {
    match flags.iter().find(|flag| !ALLOWED_FLAGS.contains(&flag.as_str())) {
        Some(flag) => Err(DocError::InvalidInput(format!(
            "unsupported flag {flag:?} (allowed: {})",
            ALLOWED_FLAGS.iter().join(", ")
        ))),
        None => Ok(()),
    }
}

/// Resolves `path`, then checks whether a local directory is a package at
/// all. A directory without Go files but with nested packages is answered
/// with the list of those packages instead of a `go doc` failure.
async fn locate(path: &str, working_dir: Option<&Path>) -> Result<ResolvedReference, DocError> {
    let import_path = resolver::resolve(path, working_dir).await?;

    if let Some(dir) = resolver::local_dir(path, working_dir) {
        let scan = tokio::task::spawn_blocking(move || resolver::find_sub_packages(&dir));
        if let Some(packages) = scan.await.ok().flatten() {
            return Ok(ResolvedReference::SubPackages(packages));
        }
    }

    Ok(ResolvedReference::ImportPath(import_path))
}
