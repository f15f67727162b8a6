use super::RawObject;
use crate::{Error, Oid, Result};
use bytes::Bytes;
use chrono::{DateTime, FixedOffset};
use regex::Regex;
use std::fmt;
use std::io::{Read, Write};
use std::sync::LazyLock;

// A "safe" string is one-or-more characters where the first and last
// exclude NUL, newline, space and the punctuation below, and interior
// characters exclude NUL, newline and angle brackets.
const SAFE: &str = r#"(?:[^ .,:;<>"'\x00\n]|[^ .,:;<>"'\x00\n][^\x00\n<>]*[^ .,:;<>"'\x00\n])"#;

// groups: name, email, seconds since epoch, utc offset
static SIGNATURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^({SAFE}) <({SAFE})> ([0-9]+) ([+-](?:0[0-9]|1[012])[0-5][0-9])$"
    ))
    .unwrap()
});

/// Who authored or committed, and when. The instant carries the fixed
/// UTC offset it was recorded in; it is not normalized to UTC.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub when: DateTime<FixedOffset>,
}

impl Signature {
    /// Parses `"<name> <<email>> <unix-seconds> <±HHMM>"`. The offset
    /// hour runs 00-12, the minute 00-59, and the sign is mandatory.
    pub fn parse(s: &str) -> Result<Self> {
        let caps = SIGNATURE_RE.captures(s).ok_or(Error::Format)?;

        let secs: i64 = caps[3].parse().map_err(|_| Error::Format)?;
        let tz = &caps[4];
        let hours: i32 = tz[1..3].parse().map_err(|_| Error::Format)?;
        let minutes: i32 = tz[3..5].parse().map_err(|_| Error::Format)?;
        let mut offset_secs = (hours * 60 + minutes) * 60;
        if tz.starts_with('-') {
            offset_secs = -offset_secs;
        }

        let offset = FixedOffset::east_opt(offset_secs).ok_or(Error::Format)?;
        let when = DateTime::from_timestamp(secs, 0)
            .ok_or(Error::Format)?
            .with_timezone(&offset);

        Ok(Self {
            name: caps[1].to_string(),
            email: caps[2].to_string(),
            when,
        })
    }

    /// The wire form used in commit headers; the inverse of
    /// [`Signature::parse`].
    pub fn to_raw(&self) -> String {
        let offset_minutes = self.when.offset().local_minus_utc() / 60;
        let (sign, offset_minutes) = if offset_minutes < 0 {
            ('-', -offset_minutes)
        } else {
            ('+', offset_minutes)
        };
        format!(
            "{} <{}> {} {}{:02}{:02}",
            self.name,
            self.email,
            self.when.timestamp(),
            sign,
            offset_minutes / 60,
            offset_minutes % 60,
        )
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} <{}> {}",
            self.name,
            self.email,
            self.when.format("%a, %d %b %Y %H:%M:%S %z"),
        )
    }
}

/// A commit: the tree it snapshots, its parents in historical order,
/// who wrote and who committed it, and a free-form message.
#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    pub tree: Oid,
    pub parents: Vec<Oid>,
    pub author: Signature,
    pub committer: Signature,
    pub message: Bytes,
}

impl Commit {
    /// Decodes header lines up to the first empty line, then takes the
    /// rest of the stream as the message, byte for byte. Singleton
    /// headers may not repeat and unknown keywords are rejected.
    pub(crate) fn parse(mut obj: RawObject) -> Result<Self> {
        let mut data = Vec::new();
        obj.read_to_end(&mut data)?;

        let mut tree = None;
        let mut parents = Vec::new();
        let mut author = None;
        let mut committer = None;

        let mut rest = data.as_slice();
        loop {
            let nl = rest.iter().position(|&b| b == b'\n').ok_or(Error::Format)?;
            let line = &rest[..nl];
            rest = &rest[nl + 1..];
            if line.is_empty() {
                break;
            }

            let line = std::str::from_utf8(line).map_err(|_| Error::Format)?;
            let (keyword, value) = line.split_once(' ').ok_or(Error::Format)?;
            match keyword {
                "tree" => {
                    if tree.is_some() {
                        return Err(Error::Format);
                    }
                    tree = Some(value.parse()?);
                }
                "parent" => parents.push(value.parse()?),
                "author" => {
                    if author.is_some() {
                        return Err(Error::Format);
                    }
                    author = Some(Signature::parse(value)?);
                }
                "committer" => {
                    if committer.is_some() {
                        return Err(Error::Format);
                    }
                    committer = Some(Signature::parse(value)?);
                }
                _ => return Err(Error::Format),
            }
        }

        Ok(Self {
            tree: tree.ok_or(Error::Format)?,
            parents,
            author: author.ok_or(Error::Format)?,
            committer: committer.ok_or(Error::Format)?,
            message: Bytes::copy_from_slice(rest),
        })
    }

    /// The wire form: `tree`, each `parent` in order, `author`,
    /// `committer`, a blank line, then the message. The line order is
    /// fixed regardless of how the value was built.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = String::new();
        out.push_str(&format!("tree {}\n", self.tree));
        for parent in &self.parents {
            out.push_str(&format!("parent {parent}\n"));
        }
        out.push_str(&format!("author {}\n", self.author.to_raw()));
        out.push_str(&format!("committer {}\n", self.committer.to_raw()));
        out.push('\n');

        let mut bytes = out.into_bytes();
        bytes.extend_from_slice(&self.message);
        bytes
    }

    /// Like [`Commit::encode`] but with signatures rendered for
    /// display rather than re-parsing.
    pub fn dump(&self, w: &mut dyn Write) -> Result<()> {
        writeln!(w, "tree {}", self.tree)?;
        for parent in &self.parents {
            writeln!(w, "parent {parent}")?;
        }
        writeln!(w, "author {}", self.author)?;
        writeln!(w, "committer {}", self.committer)?;
        writeln!(w)?;
        w.write_all(&self.message)?;
        Ok(())
    }
}
