//! Command line for the `hardn_agent` binary.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use tokio::net::lookup_host;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentArgs {
    pub host: String,
    pub port: u16,
    pub verbose: bool,
    pub config: Option<PathBuf>,
}

impl Default for AgentArgs {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            verbose: false,
            config: None,
        }
    }
}

impl AgentArgs {
    /// Address to bind. IP literals are used as-is; names are resolved and the first
    /// result wins.
    pub async fn resolve(&self) -> Result<SocketAddr, String> {
        if let Ok(ip) = self.host.parse::<IpAddr>() {
            return Ok(SocketAddr::new(ip, self.port));
        }
        lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|e| format!("cannot resolve host {}: {e}", self.host))?
            .next()
            .ok_or_else(|| format!("host {} has no addresses", self.host))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgError {
    /// `--help` was given; carries the usage text.
    Help(String),
    Invalid(String),
}

pub fn usage(prog: &str) -> String {
    format!(
        "Usage: {prog} [--host ADDR|-H ADDR] [--port PORT|-p PORT] [--verbose|-v] [--config PATH|-c PATH]\n\
         \n\
         HARDN security API server.\n\
         \n\
         \x20 -H, --host ADDR     address to bind (default {DEFAULT_HOST})\n\
         \x20 -p, --port PORT     port to listen on (default {DEFAULT_PORT})\n\
         \x20 -v, --verbose       debug logging\n\
         \x20 -c, --config PATH   JSON configuration file\n\
         \x20 -h, --help          show this help"
    )
}

pub fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<AgentArgs, ArgError> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "hardn_agent".into());
    let mut out = AgentArgs::default();

    let invalid = |msg: String| ArgError::Invalid(format!("{msg}\n{}", usage(&prog)));

    while let Some(arg) = it.next() {
        // --flag=value
        let (flag, inline) = match arg.split_once('=') {
            Some((f, v)) if f.starts_with("--") => (f.to_string(), Some(v.to_string())),
            _ => (arg.clone(), None),
        };
        match flag.as_str() {
            "-h" | "--help" => return Err(ArgError::Help(usage(&prog))),
            "-v" | "--verbose" => out.verbose = true,
            "-H" | "--host" => {
                out.host = inline
                    .or_else(|| it.next())
                    .filter(|v| !v.is_empty())
                    .ok_or_else(|| invalid(format!("{flag} requires a value")))?;
            }
            "-p" | "--port" => {
                let raw = inline
                    .or_else(|| it.next())
                    .ok_or_else(|| invalid(format!("{flag} requires a value")))?;
                out.port = raw
                    .parse::<u16>()
                    .map_err(|_| invalid(format!("invalid port: {raw}")))?;
            }
            "-c" | "--config" => {
                let raw = inline
                    .or_else(|| it.next())
                    .filter(|v| !v.is_empty())
                    .ok_or_else(|| invalid(format!("{flag} requires a value")))?;
                out.config = Some(PathBuf::from(raw));
            }
            _ => return Err(invalid(format!("unexpected argument: {arg}"))),
        }
    }
    Ok(out)
}
