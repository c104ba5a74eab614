//! Command-line and environment configuration for the `boincrpc` tool.
//!
//! Precedence is command line, then environment, then defaults.
//! Env overrides: BOINCRPC_HOST, BOINCRPC_PORT, BOINCRPC_PASSWORD_FILE.

use boincrpc_proto::{GUI_RPC_FILE, GUI_RPC_PORT};
use std::io;
use std::path::{Path, PathBuf};

/// Password file read when no password is given on the command line.
pub const DEFAULT_PASSWORD_FILE: &str = "gui_rpc_auth.cfg";

const DEFAULT_HOST: &str = "localhost";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Connect over this Unix-domain socket instead of TCP.
    pub unix_path: Option<PathBuf>,
    pub password: Option<String>,
    pub password_file: PathBuf,
    /// Print replies as JSON.
    pub json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: GUI_RPC_PORT,
            unix_path: None,
            password: None,
            password_file: PathBuf::from(DEFAULT_PASSWORD_FILE),
            json: false,
        }
    }
}

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, msg)
}

/// Split `HOST[:PORT]`. A bare IPv6 address is taken as a host.
fn split_host_port(spec: &str) -> io::Result<(String, Option<u16>)> {
    match spec.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') => {
            let port = port
                .parse::<u16>()
                .map_err(|_| invalid(format!("invalid port in '{}'", spec)))?;
            Ok((host.to_string(), Some(port)))
        }
        _ => Ok((spec.to_string(), None)),
    }
}

impl Config {
    /// Parse global options from `args`, returning the config and the
    /// remaining arguments (command and its operands). `env` looks up an
    /// environment variable.
    pub fn from_args<F>(args: &[String], env: F) -> io::Result<(Config, Vec<String>)>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut c = Config::default();
        if let Some(host) = env("BOINCRPC_HOST") {
            let (host, port) = split_host_port(&host)?;
            c.host = host;
            if let Some(port) = port {
                c.port = port;
            }
        }
        if let Some(s) = env("BOINCRPC_PORT") {
            if let Ok(p) = s.parse::<u16>() {
                c.port = p;
            }
        }
        if let Some(path) = env("BOINCRPC_PASSWORD_FILE") {
            c.password_file = PathBuf::from(path);
        }

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--host" => {
                    i += 1;
                    let spec = args
                        .get(i)
                        .ok_or_else(|| invalid("--host needs a value".to_string()))?;
                    let (host, port) = split_host_port(spec)?;
                    c.host = host;
                    if let Some(port) = port {
                        c.port = port;
                    }
                }
                "--passwd" => {
                    i += 1;
                    let pw = args
                        .get(i)
                        .ok_or_else(|| invalid("--passwd needs a value".to_string()))?;
                    c.password = Some(pw.clone());
                }
                "--unix" => {
                    // The path is optional; only an operand containing '/'
                    // is taken as one, so a command name is never swallowed.
                    match args.get(i + 1) {
                        Some(path) if path.contains('/') => {
                            c.unix_path = Some(PathBuf::from(path));
                            i += 1;
                        }
                        _ => c.unix_path = Some(PathBuf::from(GUI_RPC_FILE)),
                    }
                }
                "--json" => c.json = true,
                "--" => {
                    i += 1;
                    break;
                }
                _ => break,
            }
            i += 1;
        }

        if c.password.is_none() {
            c.password = read_password_file(&c.password_file)?;
        }
        Ok((c, args[i.min(args.len())..].to_vec()))
    }

    /// Load from the process arguments (without the program name) and
    /// environment.
    pub fn load(args: &[String]) -> io::Result<(Config, Vec<String>)> {
        Self::from_args(args, |key| std::env::var(key).ok())
    }
}

/// First line of the password file, or `None` if the file does not exist.
pub fn read_password_file(path: &Path) -> io::Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            let line = text.lines().next().unwrap_or("").trim();
            log::debug!("read password from {}", path.display());
            Ok(Some(line.to_string()))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io::Error::new(
            e.kind(),
            format!("can't read {}: {}", path.display(), e),
        )),
    }
}
