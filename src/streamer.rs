//! Log / Session Streamer (spec §4.8, component C8): tailing drone/attempt
//! logs and parsing session transcripts for the TUI's Session Viewer.

use crate::state;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Tracks a position within a log file across poll calls, restarting from
/// the beginning if the file shrinks or its inode changes underneath it
/// (rotation/truncation, spec §4.8 `tail`).
/// Bytes fingerprinted from the start of the file to catch a
/// copy-truncate rewrite that happens to land at or past the old offset
/// before the next poll, which a bare length comparison would miss.
const HEAD_FINGERPRINT_LEN: usize = 64;

pub struct Tail {
    path: PathBuf,
    offset: u64,
    head_fingerprint: Option<Vec<u8>>,
    #[cfg(unix)]
    inode: Option<u64>,
}

impl Tail {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            offset: 0,
            head_fingerprint: None,
            #[cfg(unix)]
            inode: None,
        }
    }

    #[cfg(unix)]
    fn current_inode(&self) -> Option<u64> {
        use std::os::unix::fs::MetadataExt;
        std::fs::metadata(&self.path).ok().map(|m| m.ino())
    }

    /// Read whatever new lines have appeared since the last poll. Returns
    /// an empty vec (not an error) when the file doesn't exist yet.
    pub fn poll(&mut self) -> Result<Vec<String>> {
        let mut file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).with_context(|| format!("opening {}", self.path.display())),
        };

        let len = file.metadata()?.len();

        #[cfg(unix)]
        {
            let inode = self.current_inode();
            if inode != self.inode {
                self.offset = 0;
                self.inode = inode;
            }
        }
        if len < self.offset {
            // Truncated or rotated out from under us; restart.
            self.offset = 0;
        }

        let mut head = vec![0u8; HEAD_FINGERPRINT_LEN.min(len as usize)];
        file.read_exact(&mut head)?;
        if let Some(previous) = &self.head_fingerprint {
            // Compare only the bytes both fingerprints cover: a plain append
            // grows `head` past `previous` without changing its prefix, so
            // only a genuine rewrite of those leading bytes should trip this.
            let overlap = previous.len().min(head.len());
            if previous[..overlap] != head[..overlap] {
                // Same inode, same-or-greater length, but the leading bytes
                // changed: a copy-truncate rewrite landed between polls.
                self.offset = 0;
            }
        }
        self.head_fingerprint = Some(head);

        file.seek(SeekFrom::Start(self.offset))?;
        let mut buf = String::new();
        file.read_to_string(&mut buf)
            .with_context(|| format!("reading {}", self.path.display()))?;
        self.offset = len;

        Ok(buf.lines().map(str::to_string).collect())
    }
}

/// Open a `Tail` over a drone's primary process log (spec §4.8).
pub fn tail_drone_log(drone_dir: &Path) -> Tail {
    Tail::new(state::drone_log_path(drone_dir))
}

/// §4.8 `read_attempts`: every `(task, attempt)` this drone has recorded,
/// newest first, alongside the metadata if present.
pub fn read_attempts(drone_dir: &Path) -> Vec<(usize, u32, Option<crate::types::AttemptMeta>)> {
    let mut pairs = state::list_attempts(drone_dir);
    pairs.sort_by(|a, b| b.cmp(a));
    pairs
        .into_iter()
        .map(|(task, attempt)| {
            let meta = state::read_attempt_meta(drone_dir, task, attempt).ok();
            (task, attempt, meta)
        })
        .collect()
}

/// One line of a parsed session transcript, tagged by the wire kinds spec §6
/// enumerates as the minimum (`system/init`, `assistant`, `user`, `tool_use`,
/// `tool_result`, `result`, `usage`, `session.completed`). Unknown kinds
/// round-trip through `Other` rather than being dropped (event-kind Open
/// Question resolution, SPEC_FULL.md B.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionTurn {
    #[serde(rename = "system/init")]
    SystemInit { subtype: Option<String> },
    #[serde(rename = "assistant")]
    Assistant { message: Value },
    #[serde(rename = "user")]
    User { message: Value },
    #[serde(rename = "tool_use")]
    ToolUse { name: String, input: Value },
    #[serde(rename = "tool_result")]
    ToolResult { content: Value },
    #[serde(rename = "result")]
    Result { result: Option<Value> },
    #[serde(rename = "usage")]
    Usage { usage: Value },
    #[serde(rename = "session.completed")]
    SessionCompleted,
    #[serde(other)]
    Other,
}

/// A transcript line that didn't match any known shape is kept verbatim
/// instead of dropped.
#[derive(Debug, Clone)]
pub enum SessionLine {
    Turn(SessionTurn),
    Unrecognized(Value),
}

/// §4.8 `load_session_transcript`: parse a line-delimited JSON attempt log
/// into typed turns, skipping blank lines and tolerating any line that
/// doesn't parse as JSON at all (malformed line is kept as a raw string
/// passthrough so a single bad line doesn't hide the rest of the session).
pub fn load_session_transcript(path: &Path) -> Result<Vec<SessionLine>> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let mut turns = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(_) => {
                turns.push(SessionLine::Unrecognized(Value::String(line.to_string())));
                continue;
            }
        };
        match serde_json::from_value::<SessionTurn>(value.clone()) {
            Ok(turn) => turns.push(SessionLine::Turn(turn)),
            Err(_) => turns.push(SessionLine::Unrecognized(value)),
        }
    }
    Ok(turns)
}
