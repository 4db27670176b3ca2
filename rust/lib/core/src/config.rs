use std::path::PathBuf;

/// URI scheme accepted in front of a database path.
pub const DB_URI_SCHEME: &str = "redb://";

/// Runtime configuration shared by the server binary and tests.
///
/// The binary fills this from command-line flags or environment variables,
/// then passes it to storage initialization and the listener.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Directory holding the database file when `db_path` is relative or unset.
    pub data_dir: Option<PathBuf>,

    /// Path to the redb database file.
    /// Defaults to `{data_dir}/bugs.redb` if not specified.
    pub db_path: Option<PathBuf>,

    /// Listen address for the HTTP server.
    pub listen: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            db_path: None,
            listen: "0.0.0.0:5000".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Set the database location from a connection string.
    ///
    /// Accepts either `redb:///var/lib/bugs.redb` or a bare filesystem path.
    pub fn with_connection_string(mut self, uri: &str) -> Self {
        let path = uri.strip_prefix(DB_URI_SCHEME).unwrap_or(uri);
        self.db_path = Some(PathBuf::from(path));
        self
    }

    /// Replace the port of the listen address, keeping its host.
    pub fn with_port(mut self, port: u16) -> Self {
        let host = self
            .listen
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| self.listen.clone());
        self.listen = format!("{host}:{port}");
        self
    }

    /// Resolve the redb database path, falling back to `{data_dir}/bugs.redb`.
    /// A relative `db_path` is joined onto `data_dir` when one is set.
    pub fn resolve_db_path(&self) -> PathBuf {
        match &self.db_path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => self.resolve_data_subpath(path),
            None => self.resolve_data_subpath("bugs.redb"),
        }
    }

    fn resolve_data_subpath(&self, name: impl AsRef<std::path::Path>) -> PathBuf {
        self.data_dir
            .as_ref()
            .map(|d| d.join(name.as_ref()))
            .unwrap_or_else(|| name.as_ref().to_path_buf())
    }
}
