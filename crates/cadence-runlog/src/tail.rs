//! Reading the end of a newline-delimited file.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

const CHUNK_SIZE: usize = 8 * 1024;

/// Decode the last `n` lines of `path` that `decode` accepts, oldest first.
///
/// The file is read backwards in fixed-size chunks and reading stops as soon
/// as `n` records are collected, so memory follows `n` and the longest line
/// rather than the file size. Blank lines and lines `decode` rejects do not
/// count towards `n`.
pub fn read_last<T, F>(path: &Path, n: usize, decode: F) -> io::Result<Vec<T>>
where
    F: FnMut(&[u8]) -> Option<T>,
{
    read_last_chunked(path, n, CHUNK_SIZE, decode)
}

pub(crate) fn read_last_chunked<T, F>(
    path: &Path,
    n: usize,
    chunk_size: usize,
    mut decode: F,
) -> io::Result<Vec<T>>
where
    F: FnMut(&[u8]) -> Option<T>,
{
    // grows with the records found, never with the caller's `n`
    let mut records = Vec::new();
    if n == 0 {
        return Ok(records);
    }

    let mut file = File::open(path)?;
    let mut pos = file.seek(SeekFrom::End(0))?;
    let mut buf = vec![0u8; chunk_size.max(1)];
    // pieces of the line being assembled, latest first
    let mut pieces: Vec<Vec<u8>> = Vec::new();

    let mut accept = |line: &[u8], records: &mut Vec<T>| {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.iter().all(u8::is_ascii_whitespace) {
            return;
        }
        if let Some(record) = decode(line) {
            records.push(record);
        }
    };

    'scan: while pos > 0 {
        let len = (buf.len() as u64).min(pos) as usize;
        pos -= len as u64;
        file.seek(SeekFrom::Start(pos))?;
        let chunk = &mut buf[..len];
        file.read_exact(chunk)?;

        let mut end = len;
        for i in (0..len).rev() {
            if chunk[i] != b'\n' {
                continue;
            }
            let head = &chunk[i + 1..end];
            if pieces.is_empty() {
                accept(head, &mut records);
            } else {
                accept(&join_pieces(head, &mut pieces), &mut records);
            }
            if records.len() == n {
                break 'scan;
            }
            end = i;
        }

        if end > 0 {
            pieces.push(chunk[..end].to_vec());
        }
    }

    if records.len() < n && !pieces.is_empty() {
        accept(&join_pieces(&[], &mut pieces), &mut records);
    }

    records.reverse();
    Ok(records)
}

/// `head` followed by `pieces` in file order, copied once. Empties `pieces`.
fn join_pieces(head: &[u8], pieces: &mut Vec<Vec<u8>>) -> Vec<u8> {
    let total = head.len() + pieces.iter().map(Vec::len).sum::<usize>();
    let mut line = Vec::with_capacity(total);
    line.extend_from_slice(head);
    for piece in pieces.drain(..).rev() {
        line.extend_from_slice(&piece);
    }
    line
}

#[cfg(test)]
#[path = "tail_tests.rs"]
mod tests;
