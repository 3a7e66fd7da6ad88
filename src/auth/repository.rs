use std::fs::OpenOptions;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One persisted `username:hash` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub username: String,
    pub password_hash: String,
}

impl CredentialRecord {
    /// Parse a stored line, splitting on the first colon.
    ///
    /// The username is kept byte-for-byte, surrounding whitespace included.
    /// Only the hash is trimmed; neither hash format contains whitespace.
    fn parse_line(line: &str) -> Option<Self> {
        let (username, password_hash) = line.split_once(':')?;
        Some(Self {
            username: username.to_string(),
            password_hash: password_hash.trim().to_string(),
        })
    }

    fn to_line(&self) -> String {
        format!("{}:{}\n", self.username, self.password_hash)
    }
}

/// Storage seam for credential records.
///
/// Records are append-only: there is no update or delete.
pub trait CredentialRepository: Send + Sync {
    /// Every record stored under `username`, in file order.
    ///
    /// Normally zero or one; more only if the file was written by
    /// two processes racing on the same name.
    fn lookup(&self, username: &str) -> io::Result<Vec<CredentialRecord>>;

    /// Persist a new record.
    fn append(&self, record: &CredentialRecord) -> io::Result<()>;
}

/// Newline-delimited `username:hash` file, scanned in full on every lookup.
#[derive(Debug)]
pub struct FlatFileRepository {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FlatFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialRepository for FlatFileRepository {
    fn lookup(&self, username: &str) -> io::Result<Vec<CredentialRecord>> {
        let file = match std::fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut matches = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            let line = line.trim_end_matches(['\r', '\n']);
            if line.trim().is_empty() {
                continue;
            }
            match CredentialRecord::parse_line(line) {
                Some(record) if record.username == username => matches.push(record),
                Some(_) => {}
                None => {
                    tracing::warn!(
                        path = %self.path.display(),
                        line = idx + 1,
                        "Skipping credential line without ':' separator"
                    );
                }
            }
        }
        Ok(matches)
    }

    fn append(&self, record: &CredentialRecord) -> io::Result<()> {
        // In-process single writer; other processes are not coordinated.
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut options = OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&self.path)?;
        file.write_all(record.to_line().as_bytes())?;
        file.flush()?;

        tracing::debug!(path = %self.path.display(), user = %record.username, "Appended credential record");
        Ok(())
    }
}
