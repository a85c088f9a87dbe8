//! Backend connection URLs.
//!
//! | form | transport |
//! |---|---|
//! | `http://host:port`, `https://…` | TCP |
//! | `local:/path/to/backend.sock` | HTTP over a Unix domain socket |
//! | `http+ssh://user@host:port` | HTTP over an SSH-forwarded Unix socket |

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use url::Url;

use super::ClientError;

const DEFAULT_SSH_PORT: u16 = 22;

/// Where a backend can be reached and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NeteUrl {
    Tcp {
        base_url: String,
    },
    Unix {
        socket_path: PathBuf,
    },
    Ssh {
        host: String,
        port: u16,
        username: Option<String>,
    },
}

impl NeteUrl {
    pub const fn is_socket_url(&self) -> bool {
        matches!(self, Self::Unix { .. })
    }

    pub fn socket_path(&self) -> Option<&Path> {
        match self {
            Self::Unix { socket_path } => Some(socket_path),
            _ => None,
        }
    }
}

impl FromStr for NeteUrl {
    type Err = ClientError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        let parsed =
            Url::parse(raw).map_err(|error| ClientError::InvalidUrl(format!("{raw}: {error}")))?;

        match parsed.scheme() {
            "http" | "https" => Ok(Self::Tcp {
                base_url: raw.trim_end_matches('/').to_string(),
            }),
            "local" => {
                let path = parsed.path();
                if path.is_empty() {
                    return Err(ClientError::InvalidUrl(format!(
                        "{raw}: socket path is missing"
                    )));
                }
                Ok(Self::Unix {
                    socket_path: PathBuf::from(path),
                })
            }
            "http+ssh" => {
                let host = parsed
                    .host_str()
                    .filter(|host| !host.is_empty())
                    .ok_or_else(|| ClientError::InvalidUrl(format!("{raw}: host is missing")))?;
                let username = Some(parsed.username())
                    .filter(|name| !name.is_empty())
                    .map(str::to_string);
                Ok(Self::Ssh {
                    host: host.to_string(),
                    port: parsed.port().unwrap_or(DEFAULT_SSH_PORT),
                    username,
                })
            }
            scheme => Err(ClientError::InvalidUrl(format!(
                "Connection type »{scheme}« not supported"
            ))),
        }
    }
}

impl fmt::Display for NeteUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp { base_url } => write!(f, "{base_url}"),
            Self::Unix { socket_path } => write!(f, "local:{}", socket_path.display()),
            Self::Ssh {
                host,
                port,
                username: Some(username),
            } => write!(f, "http+ssh://{username}@{host}:{port}"),
            Self::Ssh {
                host,
                port,
                username: None,
            } => write!(f, "http+ssh://{host}:{port}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tcp_urls() {
        let url: NeteUrl = "http://localhost:8080/".parse().unwrap();
        assert_eq!(
            url,
            NeteUrl::Tcp {
                base_url: "http://localhost:8080".to_string()
            }
        );
        assert!(!url.is_socket_url());
    }

    #[test]
    fn parses_socket_urls() {
        let url: NeteUrl = "local:/run/user/1000/nete/backend.sock".parse().unwrap();
        assert!(url.is_socket_url());
        assert_eq!(
            url.socket_path(),
            Some(Path::new("/run/user/1000/nete/backend.sock"))
        );
        assert_eq!(url.to_string(), "local:/run/user/1000/nete/backend.sock");
    }

    #[test]
    fn parses_ssh_urls_with_default_port() {
        let url: NeteUrl = "http+ssh://alice@notes.example.com".parse().unwrap();
        assert_eq!(
            url,
            NeteUrl::Ssh {
                host: "notes.example.com".to_string(),
                port: 22,
                username: Some("alice".to_string()),
            }
        );

        let url: NeteUrl = "http+ssh://notes.example.com:2222".parse().unwrap();
        assert_eq!(url.to_string(), "http+ssh://notes.example.com:2222");
    }

    #[test]
    fn rejects_unknown_schemes() {
        let err = "ftp://example.com".parse::<NeteUrl>().unwrap_err();
        assert!(err.to_string().contains("ftp"));
        assert!("not a url".parse::<NeteUrl>().is_err());
    }
}
