//! Client configuration loaded from a JSON file.

use crate::bridge::domain::{ClientConfig, ClientConfigError};
use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;

/// Reads and validates a client configuration file.
///
/// # Errors
///
/// Returns [`ClientConfigError::Read`] when the file cannot be opened or
/// read, and the errors of [`ClientConfig::from_json_str`] otherwise.
pub fn load_client_config(path: &Utf8Path) -> Result<ClientConfig, ClientConfigError> {
    let read_error = |source: std::io::Error| ClientConfigError::Read {
        path: path.to_string(),
        source,
    };
    let file_name = path.file_name().ok_or_else(|| {
        read_error(std::io::Error::other("path must include a file name"))
    })?;
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));

    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(read_error)?;
    let document = dir.read_to_string(file_name).map_err(read_error)?;
    let config = ClientConfig::from_json_str(&document)?;
    tracing::debug!(path = %path, providers = config.providers().len(), "loaded client config");
    Ok(config)
}
