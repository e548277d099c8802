//! Command implementations behind the `kalo` binary.
//!
//! Input files hold one `key=value` entry per line. Surrounding whitespace is
//! trimmed, blank lines and lines starting with `#` are skipped, and a line
//! without `=` stores its key with an empty value.

use std::io::{BufRead, Write};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::data_structures::kalo_trie::{KaloTrie, KaloTrieConfig, KaloTrieError};
use crate::error::{KaloError, KaloResult};

/// One key/value pair read from an input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    /// Trie key
    pub key: String,
    /// Stored value
    pub value: String,
}

/// Outcome of a stress run.
#[derive(Debug, Clone, Serialize)]
pub struct StressReport {
    /// Writer threads used
    pub threads: usize,
    /// Keys inserted successfully
    pub inserted: usize,
    /// Keys found with the expected value afterwards
    pub verified: usize,
    /// Wall time of the insert phase
    pub elapsed: Duration,
}

/// Parses input entries from `reader`.
///
/// # Errors
///
/// `InvalidInput` for a line with an empty key, `Io` on read failure.
pub fn read_entries<R: BufRead>(reader: R) -> KaloResult<Vec<Entry>> {
    let mut entries = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (key, value) = match trimmed.split_once('=') {
            Some((key, value)) => (key.trim_end(), value.trim_start()),
            None => (trimmed, ""),
        };
        if key.is_empty() {
            return Err(KaloError::InvalidInput {
                line: index + 1,
                message: "missing key".to_string(),
            });
        }

        entries.push(Entry {
            key: key.to_string(),
            value: value.to_string(),
        });
    }
    Ok(entries)
}

/// Builds a trie from `entries`. Later duplicates of a key are skipped.
pub fn build_trie(entries: Vec<Entry>, config: KaloTrieConfig) -> KaloResult<KaloTrie<String>> {
    let trie = KaloTrie::with_config(config);
    for entry in entries {
        match trie.try_insert(&entry.key, entry.value) {
            Ok(()) => {}
            Err(KaloTrieError::DuplicateKey(key)) => {
                warn!(key = %key, "duplicate key in input, keeping the first value");
            }
            Err(e) => return Err(e.into()),
        }
    }
    debug!(keys = trie.len(), "trie built");
    Ok(trie)
}

/// Writes the tree rendering of `trie` to `out`.
pub fn print_trie<W: Write>(trie: &KaloTrie<String>, out: &mut W) -> KaloResult<()> {
    trie.print(out)?;
    Ok(())
}

/// Writes every entry whose key starts with `prefix`, as `key<TAB>value`
/// lines or as a JSON array.
pub fn query_prefix<W: Write>(
    trie: &KaloTrie<String>,
    prefix: &str,
    json: bool,
    out: &mut W,
) -> KaloResult<usize> {
    let matches: Vec<Entry> = trie
        .find_by_prefix(prefix)
        .into_iter()
        .map(|(key, value)| Entry { key, value })
        .collect();

    if json {
        serde_json::to_writer_pretty(&mut *out, &matches)?;
        writeln!(out)?;
    } else {
        for entry in &matches {
            writeln!(out, "{}\t{}", entry.key, entry.value)?;
        }
    }
    Ok(matches.len())
}

/// Inserts `keys_per_thread` disjoint keys from each of `threads` threads,
/// then checks that every key reads back with its own value.
pub fn run_stress(
    threads: usize,
    keys_per_thread: usize,
    config: KaloTrieConfig,
) -> KaloResult<StressReport> {
    let trie = Arc::new(KaloTrie::<usize>::with_config(config));
    let barrier = Arc::new(Barrier::new(threads));
    let started = Instant::now();

    let handles: Vec<_> = (0..threads)
        .map(|thread_id| {
            let trie = Arc::clone(&trie);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                (0..keys_per_thread)
                    .filter(|&i| trie.insert(&stress_key(thread_id, i), i))
                    .count()
            })
        })
        .collect();

    let mut inserted = 0;
    for handle in handles {
        inserted += handle
            .join()
            .map_err(|_| KaloError::Custom("stress worker panicked".to_string()))?;
    }
    let elapsed = started.elapsed();

    let verified = (0..threads)
        .flat_map(|thread_id| (0..keys_per_thread).map(move |i| (thread_id, i)))
        .filter(|&(thread_id, i)| trie.lookup_maybe(&stress_key(thread_id, i)) == Some(i))
        .count();

    info!(
        threads = threads,
        inserted = inserted,
        verified = verified,
        elapsed = ?elapsed,
        "stress run finished"
    );
    Ok(StressReport {
        threads,
        inserted,
        verified,
        elapsed,
    })
}

fn stress_key(thread_id: usize, index: usize) -> String {
    format!("t{thread_id}/k{index}")
}
