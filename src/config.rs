//! This module holds the configuration for the server

use std::net::IpAddr;

use actix_toolbox::logging::LoggingConfig;
use serde::{Deserialize, Serialize};

/// Configuration regarding the server
#[derive(Deserialize, Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct ServerConfig {
    /// The address the server should bind to
    pub listen_address: IpAddr,
    /// The port the server should bind to
    pub listen_port: u16,
    /// Base64 encoded secret key used to sign the session cookies.
    ///
    /// Use `minifb keygen` to generate one.
    pub secret_key: String,
    /// The directory uploaded images are stored in
    pub media_path: String,
    /// The lifetime of a session in hours
    #[serde(default = "default_session_ttl")]
    pub session_ttl_hours: i64,
}

fn default_session_ttl() -> i64 {
    24
}

/// Configuration regarding the database
#[derive(Deserialize, Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct DBConfig {
    /// Host of the database
    pub host: String,
    /// Port of the database
    pub port: u16,
    /// Name of the database
    pub name: String,
    /// User to connect to the database
    pub user: String,
    /// Password of the user
    pub password: String,
}

/// This struct can be parsed from the configuration file
#[derive(Deserialize, Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    /// Configuration regarding the server
    pub server: ServerConfig,
    /// Configuration regarding the database
    pub database: DBConfig,
    /// The logging configuration
    pub logging: LoggingConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_server_and_database_sections() {
        let server: ServerConfig = toml::from_str(
            r#"
            ListenAddress = "127.0.0.1"
            ListenPort = 8080
            SecretKey = "c2VjcmV0"
            MediaPath = "/var/lib/minifb/media"
            "#,
        )
        .unwrap();

        assert_eq!(server.listen_address.to_string(), "127.0.0.1");
        assert_eq!(server.listen_port, 8080);
        assert_eq!(server.media_path, "/var/lib/minifb/media");
        assert_eq!(server.session_ttl_hours, 24);

        let db: DBConfig = toml::from_str(
            r#"
            Host = "localhost"
            Port = 5432
            Name = "minifb"
            User = "minifb"
            Password = "hunter2"
            "#,
        )
        .unwrap();

        assert_eq!(db.port, 5432);
        assert_eq!(db.name, "minifb");
    }

    #[test]
    fn missing_secret_key_is_rejected() {
        let res: Result<ServerConfig, _> = toml::from_str(
            r#"
            ListenAddress = "::1"
            ListenPort = 8080
            MediaPath = "/tmp"
            "#,
        );
        assert!(res.is_err());
    }
}
