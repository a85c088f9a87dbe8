use crate::config::CliConfig;
use crate::error::CliError;

/// Print the socket path of a `local:` backend URL. Used over SSH to find
/// the socket to forward.
pub fn run_socket(config: &CliConfig) -> Result<(), CliError> {
    let url = config.backend_url()?;
    match url.socket_path() {
        Some(path) => {
            println!("{}", path.display());
            Ok(())
        }
        None => Err(CliError::NotASocketUrl(url.to_string())),
    }
}
