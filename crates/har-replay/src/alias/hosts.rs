//! Hosts-file backed [`AliasStore`].

use super::AliasStore;
use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use tracing::warn;

#[cfg(windows)]
const SYSTEM_HOSTS_FILE: &str = r"C:\Windows\System32\drivers\etc\hosts";
#[cfg(not(windows))]
const SYSTEM_HOSTS_FILE: &str = "/etc/hosts";

/// Reads and rewrites a hosts file one mapping at a time.
///
/// Every mutation is a read-modify-write under a mutex. Comments and lines
/// that are not touched are written back verbatim.
#[derive(Debug)]
pub struct HostsFile {
    path: PathBuf,
    lock: Mutex<()>,
}

impl HostsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// The platform's hosts file.
    pub fn system() -> Self {
        Self::new(SYSTEM_HOSTS_FILE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> io::Result<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e),
        }
    }
}

impl AliasStore for HostsFile {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn check_writable(&self) -> io::Result<()> {
        OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map(|_| ())
    }

    fn set(&self, ip: IpAddr, hostname: &str) -> io::Result<()> {
        let _guard = self.lock.lock();
        let content = self.read()?;
        if content.lines().any(|line| maps(line, ip, hostname)) {
            return Ok(());
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        if !content.is_empty() && !content.ends_with('\n') {
            file.write_all(b"\n")?;
        }
        writeln!(file, "{ip}\t{hostname}")
    }

    fn remove(&self, ip: IpAddr, hostname: &str) -> io::Result<()> {
        let _guard = self.lock.lock();
        let content = self.read()?;
        if !content.lines().any(|line| maps(line, ip, hostname)) {
            return Ok(());
        }

        let mut rewritten = String::with_capacity(content.len());
        for line in content.lines() {
            if let Some(kept) = without_hostname(line, ip, hostname) {
                rewritten.push_str(&kept);
                rewritten.push('\n');
            }
        }
        if !content.ends_with('\n') && rewritten.ends_with('\n') {
            rewritten.pop();
        }
        self.replace(&rewritten)
    }
}

impl HostsFile {
    /// Swap in new content through a sibling temp file and a rename.
    ///
    /// Falls back to an in-place write when the rename is refused, as with
    /// a hosts file bind-mounted into a container.
    fn replace(&self, content: &str) -> io::Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let permissions = std::fs::metadata(&self.path)?.permissions();

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.as_file().set_permissions(permissions)?;

        match tmp.persist(&self.path) {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(
                    "Could not rename over {}, rewriting in place: {}",
                    self.path.display(),
                    e.error
                );
                std::fs::write(&self.path, content)
            }
        }
    }
}

/// Split a hosts line into its address, hostnames and trailing comment.
fn parse_line(line: &str) -> Option<(IpAddr, Vec<&str>, Option<&str>)> {
    let (data, comment) = match line.find('#') {
        Some(pos) => (&line[..pos], Some(&line[pos..])),
        None => (line, None),
    };
    let mut fields = data.split_whitespace();
    let ip = fields.next()?.parse::<IpAddr>().ok()?;
    Some((ip, fields.collect(), comment))
}

fn maps(line: &str, ip: IpAddr, hostname: &str) -> bool {
    match parse_line(line) {
        Some((line_ip, names, _)) => {
            line_ip == ip && names.iter().any(|n| n.eq_ignore_ascii_case(hostname))
        }
        None => false,
    }
}

/// The line with `hostname` removed, `None` when nothing is left of it.
fn without_hostname(line: &str, ip: IpAddr, hostname: &str) -> Option<String> {
    if !maps(line, ip, hostname) {
        return Some(line.to_string());
    }
    let (_, names, comment) = parse_line(line)?;
    let remaining: Vec<&str> = names
        .into_iter()
        .filter(|n| !n.eq_ignore_ascii_case(hostname))
        .collect();
    if remaining.is_empty() {
        return None;
    }

    let mut rebuilt = format!("{ip}\t{}", remaining.join(" "));
    if let Some(comment) = comment {
        rebuilt.push(' ');
        rebuilt.push_str(comment);
    }
    Some(rebuilt)
}
