use std::path::Path;

use tempfile::TempDir;

use crate::command::{CommandError, GoCommand};
use crate::error::DocError;

const TEMP_PREFIX: &str = "godoc-mcp-";
const TEMP_MODULE: &str = "godoc-temp";

/// A throwaway Go module for queries that arrive without a working directory.
///
/// The directory is removed when the handle is dropped, so every exit path of
/// the owning request cleans up, errors and timeouts included.
#[derive(Debug)]
pub struct TempModule {
    dir: TempDir,
}

impl TempModule {
    /// Runs `go mod init` in a fresh directory under `base`, then `go get`s
    /// `import_path` unless it looks like a standard library package.
    pub async fn create_in(
        base: &Path,
        go: &GoCommand,
        import_path: &str,
    ) -> Result<Self, DocError> {
        let dir = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempdir_in(base)
            .map_err(|e| DocError::Provisioning {
                step: "failed to create temp directory".to_string(),
                output: e.to_string(),
            })?;
        let module = Self { dir };

        module
            .go(go, &["mod", "init", TEMP_MODULE], "failed to initialize go.mod")
            .await?;

        if !is_std_lib(import_path) {
            let step = format!("failed to get package {import_path}");
            module.go(go, &["get", import_path], &step).await?;
        }

        tracing::debug!("Prepared temporary module at {}", module.path().display());
        Ok(module)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Removes the directory now, logging instead of failing if it can't.
    pub fn close(self) {
        let path = self.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            tracing::warn!("Failed to remove temporary module {}: {}", path.display(), e);
        }
    }

    async fn go(&self, go: &GoCommand, args: &[&str], step: &str) -> Result<(), DocError> {
        let out = go.run(self.path(), args).await.map_err(|e| DocError::Provisioning {
            step: step.to_string(),
            output: match e {
                CommandError::TimedOut { after, output, .. } => {
                    format!("timed out after {}s\n{output}", after.as_secs())
                }
                CommandError::Spawn { .. } => e.to_string(),
            },
        })?;

        if !out.success() {
            return Err(DocError::Provisioning {
                step: format!("{step}: {}", out.status),
                output: out.output,
            });
        }
        Ok(())
    }
}

/// Standard library packages have no dot in their first path element.
pub fn is_std_lib(import_path: &str) -> bool {
    let first = import_path.split('/').next().unwrap_or_default();
    !first.contains('.')
}
