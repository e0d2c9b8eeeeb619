//! Command line and environment configuration.

use clap::Parser;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 8056;
pub const DEFAULT_FOLDER: &str = "tiddler";
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

#[derive(Parser, Debug, Clone)]
#[command(name = "tiddler-hub")]
#[command(about = "Serve a TiddlyWiki from a folder of tiddler files")]
pub struct ServerConfig {
    /// Port to listen on
    #[arg(long, env = "TIDDLER_HUB_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Listen on localhost only
    #[arg(long, env = "TIDDLER_HUB_LOCALHOST")]
    pub localhost: bool,

    /// Folder used to store all tiddlers; index.html is served from here too
    #[arg(long, env = "TIDDLER_HUB_FOLDER", default_value = DEFAULT_FOLDER)]
    pub folder: PathBuf,

    /// Largest request body accepted, in bytes
    #[arg(long, env = "TIDDLER_HUB_MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,
}

impl ServerConfig {
    pub fn listen_addr(&self) -> SocketAddr {
        let ip = if self.localhost {
            Ipv4Addr::LOCALHOST
        } else {
            Ipv4Addr::UNSPECIFIED
        };
        SocketAddr::from((ip, self.port))
    }
}
