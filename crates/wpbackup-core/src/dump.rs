//! Database dumps through an external utility (`mysqldump` by default).

use crate::error::{Error, Result};
use crate::models::DatabaseCredentials;
use std::fs::{self, File};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, info, instrument, warn};

/// `DB_HOST` split into its parts. WordPress accepts `host`, `host:port` and `host:/path/to.sock`.
#[derive(Debug, PartialEq, Eq)]
pub struct HostSpec<'a> {
    pub host: &'a str,
    pub port: Option<&'a str>,
    pub socket: Option<&'a str>,
}

impl<'a> HostSpec<'a> {
    pub fn parse(raw: &'a str) -> Self {
        let (host, rest) = if let Some(bracketed) = raw.strip_prefix('[') {
            match bracketed.split_once(']') {
                Some((host, rest)) => (host, rest.strip_prefix(':')),
                None => (raw, None),
            }
        } else if raw.matches(':').count() == 1 {
            raw.split_once(':').map_or((raw, None), |(h, r)| (h, Some(r)))
        } else {
            (raw, None)
        };

        let host = if host.is_empty() { "localhost" } else { host };
        match rest.filter(|r| !r.is_empty()) {
            Some(socket) if socket.starts_with('/') => Self { host, port: None, socket: Some(socket) },
            Some(port) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => {
                Self { host, port: Some(port), socket: None }
            }
            Some(_) => Self { host: raw, port: None, socket: None },
            None => Self { host, port: None, socket: None },
        }
    }
}

#[derive(Debug, Clone)]
pub struct DumpRunner {
    program: String,
    output_dir: PathBuf,
}

impl DumpRunner {
    pub fn new(program: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            output_dir: output_dir.into(),
        }
    }

    /// `<output_dir>/<database>.sql`, with path separators in the name neutralised.
    pub fn dump_path(&self, credentials: &DatabaseCredentials) -> PathBuf {
        let file_name: String = credentials
            .database
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        self.output_dir.join(format!("{}.sql", file_name))
    }

    /// The argument vector handed to the dump utility. Never passed through a shell.
    pub fn arguments(credentials: &DatabaseCredentials) -> Vec<String> {
        let host = HostSpec::parse(&credentials.host);
        let mut args = vec!["-u".to_string(), credentials.user.clone()];
        // A bare `-p` would make mysqldump prompt for a password.
        if !credentials.password.is_empty() {
            args.push(format!("-p{}", credentials.password));
        }
        args.push("-h".to_string());
        args.push(host.host.to_string());
        if let Some(port) = host.port {
            args.push("--port".to_string());
            args.push(port.to_string());
        }
        if let Some(socket) = host.socket {
            args.push("--socket".to_string());
            args.push(socket.to_string());
        }
        args.push(credentials.database.clone());
        args
    }

    #[instrument(skip_all, fields(database = %credentials.database))]
    pub fn run(&self, credentials: &DatabaseCredentials) -> Result<PathBuf> {
        let dump_path = self.dump_path(credentials);
        debug!(program = %self.program, path = %dump_path.display(), "Creating database dump.");
        let dump_file = File::create(&dump_path)?;

        let output = Command::new(&self.program)
            .args(Self::arguments(credentials))
            .stdin(Stdio::null())
            .stdout(Stdio::from(dump_file))
            .stderr(Stdio::piped())
            .output();

        let output = match output {
            Ok(output) => output,
            Err(source) => {
                self.discard(&dump_path);
                return Err(Error::DumpSpawn {
                    program: self.program.clone(),
                    source,
                });
            }
        };

        if !output.status.success() {
            self.discard(&dump_path);
            return Err(Error::DumpFailed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let bytes = fs::metadata(&dump_path)?.len();
        info!(path = %dump_path.display(), bytes, "Database dump complete.");
        Ok(dump_path)
    }

    fn discard(&self, dump_path: &std::path::Path) {
        if let Err(e) = fs::remove_file(dump_path) {
            warn!(path = %dump_path.display(), error = %e, "Could not remove partial dump file.");
        }
    }
}
