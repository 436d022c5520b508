//! Best-effort persistence of failing requests for offline diagnosis.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;

/// Narrow collaborator interface so the translation path has no filesystem
/// dependency. Failures are logged by the caller, never escalated.
pub trait RequestDump {
    fn record(&self, raw_request: &[u8], detail: &[u8]) -> io::Result<()>;
}

/// Writes `request-<timestamp>.txt` files under a directory, write-once: an
/// existing same-named file is left untouched.
pub struct FileDump {
    dir: PathBuf,
}

impl FileDump {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl RequestDump for FileDump {
    fn record(&self, raw_request: &[u8], detail: &[u8]) -> io::Result<()> {
        let name = format!("request-{}.txt", Local::now().format("%Y-%m-%d %H:%M:%S"));

        let mut body = Vec::with_capacity(raw_request.len() + detail.len() + 2);
        body.extend_from_slice(raw_request);
        body.extend_from_slice(b"\n\n");
        body.extend_from_slice(detail);

        write_if_not_exists(&self.dir.join(name), &body)
    }
}

fn write_if_not_exists(path: &Path, body: &[u8]) -> io::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }

    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => file.write_all(body),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_request_and_detail() {
        let dir = tempfile::tempdir().unwrap();
        let dump = FileDump::new(dir.path());

        dump.record(b"{\"model\":\"m\"}", b"quota exceeded").unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let content = fs::read_to_string(entries[0].as_ref().unwrap().path()).unwrap();
        assert_eq!(content, "{\"model\":\"m\"}\n\nquota exceeded");
    }

    #[test]
    fn existing_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("request.txt");

        write_if_not_exists(&path, b"first").unwrap();
        write_if_not_exists(&path, b"second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "first");
    }

    #[test]
    fn creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/request.txt");

        write_if_not_exists(&path, b"body").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "body");
    }
}
