use std::{
    fs,
    io::{BufRead, BufReader},
    path::Path,
};

use tracing::debug;
use xz2::read::XzDecoder;

use crate::{
    error::{Result, SimError},
    hierarchy::{AccessRequest, Op},
};

/// Recorded access stream.
///
/// One access per line: `r <hex>`, `w <hex>` or a bare hex address (a read).
/// Blank lines and `#` comments are skipped. Files ending in `.xz` are
/// decompressed while reading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace {
    pub requests: Vec<AccessRequest>,
}

impl Trace {
    pub fn load(path: &Path) -> Result<Trace> {
        let file = fs::File::open(path)?;
        let reader: Box<dyn BufRead> = if path.extension().is_some_and(|ext| ext == "xz") {
            Box::new(BufReader::new(XzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };
        let trace = Trace::read(reader)?;
        debug!(path = %path.display(), accesses = trace.len(), "loaded trace");
        Ok(trace)
    }

    pub fn read<R: BufRead>(reader: R) -> Result<Trace> {
        let mut requests = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if let Some(req) = parse_line(&line).map_err(|message| SimError::Trace {
                line: idx + 1,
                message,
            })? {
                requests.push(req);
            }
        }
        Ok(Trace { requests })
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = AccessRequest> + '_ {
        self.requests.iter().copied()
    }
}

impl IntoIterator for Trace {
    type Item = AccessRequest;
    type IntoIter = std::vec::IntoIter<AccessRequest>;

    fn into_iter(self) -> Self::IntoIter {
        self.requests.into_iter()
    }
}

fn parse_line(line: &str) -> std::result::Result<Option<AccessRequest>, String> {
    let line = match line.split_once('#') {
        Some((content, _comment)) => content,
        None => line,
    }
    .trim();
    if line.is_empty() {
        return Ok(None);
    }

    let mut fields = line.split_whitespace();
    let (op, addr) = match (fields.next(), fields.next(), fields.next()) {
        (Some(addr), None, None) => (Op::Read, addr),
        (Some(op), Some(addr), None) => (parse_op(op)?, addr),
        _ => return Err(format!("expected `[r|w] <address>`, got `{line}`")),
    };
    Ok(Some(AccessRequest {
        address: parse_address(addr)?,
        op,
    }))
}

fn parse_op(op: &str) -> std::result::Result<Op, String> {
    match op {
        "r" | "R" | "read" => Ok(Op::Read),
        "w" | "W" | "write" => Ok(Op::Write),
        _ => Err(format!("unknown operation `{op}`")),
    }
}

fn parse_address(addr: &str) -> std::result::Result<u64, String> {
    let digits = addr
        .strip_prefix("0x")
        .or_else(|| addr.strip_prefix("0X"))
        .unwrap_or(addr);
    u64::from_str_radix(digits, 16).map_err(|e| format!("bad address `{addr}`: {e}"))
}
