use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

/// Runtime settings shared by every request.
#[derive(Args, Debug, Clone)]
pub struct Config {
    /// Go toolchain binary used for `go doc`, `go mod init` and `go get`
    #[arg(long, default_value = "go")]
    pub go_binary: PathBuf,

    /// Seconds a cached document stays valid
    #[arg(long, default_value_t = 300)]
    pub cache_ttl_secs: u64,

    /// Maximum number of cached documents
    #[arg(long, default_value_t = 500, value_parser = clap::value_parser!(u64).range(1..))]
    pub cache_max_entries: u64,

    /// Timeout in seconds for each external command
    #[arg(long, default_value_t = 30)]
    pub command_timeout_secs: u64,

    /// Deadline in seconds for a whole get_doc request
    #[arg(long, default_value_t = 120)]
    pub request_timeout_secs: u64,

    /// Lines per page when the client does not ask for a page size
    #[arg(long, default_value_t = 1000)]
    pub default_page_size: usize,

    #[arg(long, default_value_t = 100)]
    pub min_page_size: usize,

    #[arg(long, default_value_t = 5000)]
    pub max_page_size: usize,

    /// Directory that holds temporary modules [default: system temp dir]
    #[arg(long)]
    pub temp_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            go_binary: PathBuf::from("go"),
            cache_ttl_secs: 300,
            cache_max_entries: 500,
            command_timeout_secs: 30,
            request_timeout_secs: 120,
            default_page_size: 1000,
            min_page_size: 100,
            max_page_size: 5000,
            temp_dir: None,
        }
    }
}

impl Config {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn cache_max_entries(&self) -> usize {
        usize::try_from(self.cache_max_entries).unwrap_or(usize::MAX)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn temp_root(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Applies the default and clamps into `[min_page_size, max_page_size]`.
    pub fn page_size(&self, requested: Option<i64>) -> usize {
        let min = self.min_page_size.max(1);
        let max = self.max_page_size.max(min);
        match requested {
            None => self.default_page_size.clamp(min, max),
            Some(n) if n < 1 => min,
            Some(n) => usize::try_from(n).unwrap_or(max).clamp(min, max),
        }
    }
}
