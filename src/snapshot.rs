//! JSON documents published for the dashboard.
//!
//! A [`Snapshot`] is rendered from one [`Batch`] in full before anything
//! touches disk. Each document goes to a sibling `*.tmp` file first, and the
//! renames into place only start once all three temporaries exist. If a
//! rename fails, documents already renamed are restored from their `*.bak`
//! links, so the three files on disk always come from the same batch.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Map;

use crate::error::WriteError;
use crate::metrics::{best_performer, sort_by_performance};
use crate::model::batch::Batch;
use crate::model::quote::Quote;

pub const TRENDING_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotPaths {
    pub stocks: PathBuf,
    pub best: PathBuf,
    pub trending: PathBuf,
}

impl Default for SnapshotPaths {
    fn default() -> Self {
        Self {
            stocks: PathBuf::from("web/stock_data.json"),
            best: PathBuf::from("web/best_stock.json"),
            trending: PathBuf::from("web/trending.json"),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteEntry {
    pub symbol: String,
    pub price: f64,
    pub change_percent: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestEntry {
    pub symbol: String,
    pub price: f64,
    pub change_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendingEntry {
    pub symbol: String,
    pub change_percent: f64,
}

impl From<&Quote> for QuoteEntry {
    fn from(quote: &Quote) -> Self {
        Self {
            symbol: quote.symbol().to_string(),
            price: round2(quote.current_price()),
            change_percent: round2(quote.change_percent()),
            volume: round2(quote.volume()),
        }
    }
}

impl From<&Quote> for BestEntry {
    fn from(quote: &Quote) -> Self {
        Self {
            symbol: quote.symbol().to_string(),
            price: round2(quote.current_price()),
            change_percent: round2(quote.change_percent()),
        }
    }
}

impl From<&Quote> for TrendingEntry {
    fn from(quote: &Quote) -> Self {
        Self {
            symbol: quote.symbol().to_string(),
            change_percent: round2(quote.change_percent()),
        }
    }
}

/// The three published documents, all derived from the same batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub quotes: Vec<QuoteEntry>,
    pub best: Option<BestEntry>,
    pub trending: Vec<TrendingEntry>,
}

impl Snapshot {
    pub fn from_batch(batch: &Batch) -> Self {
        let valid = batch.valid_quotes();
        Self {
            quotes: valid.clone().map(QuoteEntry::from).collect(),
            best: best_performer(valid.clone()).map(BestEntry::from),
            trending: sort_by_performance(valid)
                .into_iter()
                .take(TRENDING_LIMIT)
                .map(TrendingEntry::from)
                .collect(),
        }
    }

    fn render(&self) -> Result<[Vec<u8>; 3], WriteError> {
        let best = match &self.best {
            Some(best) => encode("best", best)?,
            // No valid quote: the dashboard expects an empty object, not null.
            None => encode("best", &Map::new())?,
        };
        Ok([
            encode("stocks", &self.quotes)?,
            best,
            encode("trending", &self.trending)?,
        ])
    }
}

fn encode<T: Serialize + ?Sized>(
    document: &'static str,
    value: &T,
) -> Result<Vec<u8>, WriteError> {
    let mut out = serde_json::to_vec_pretty(value)
        .map_err(|source| WriteError::Serialize { document, source })?;
    out.push(b'\n');
    Ok(out)
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> WriteError + '_ {
    move |source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    }
}

pub struct SnapshotWriter {
    paths: SnapshotPaths,
}

impl SnapshotWriter {
    pub fn new(paths: SnapshotPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &SnapshotPaths {
        &self.paths
    }

    pub fn publish(&self, batch: &Batch) -> Result<(), WriteError> {
        self.write_snapshot(&Snapshot::from_batch(batch))
    }

    pub fn write_snapshot(&self, snapshot: &Snapshot) -> Result<(), WriteError> {
        let documents = snapshot.render()?;
        let targets = [&self.paths.stocks, &self.paths.best, &self.paths.trending];

        let mut pending: Vec<Pending<'_>> = Vec::with_capacity(targets.len());
        for (target, bytes) in targets.into_iter().zip(documents.iter()) {
            let step = stage(target, bytes).and_then(|tmp| {
                let backup = match back_up(target) {
                    Ok(backup) => backup,
                    Err(e) => {
                        let _ = fs::remove_file(&tmp);
                        return Err(e);
                    }
                };
                Ok(Pending {
                    target: target.as_path(),
                    tmp,
                    backup,
                })
            });
            match step {
                Ok(p) => pending.push(p),
                Err(e) => {
                    discard(&pending);
                    return Err(e);
                }
            }
        }

        for (i, p) in pending.iter().enumerate() {
            if let Err(e) = fs::rename(&p.tmp, p.target) {
                roll_back(&pending[..i]);
                discard(&pending[i..]);
                return Err(io_err(p.target)(e));
            }
        }
        for p in &pending {
            if let Some(backup) = &p.backup {
                let _ = fs::remove_file(backup);
            }
        }

        tracing::debug!(
            stocks = %self.paths.stocks.display(),
            best = %self.paths.best.display(),
            trending = %self.paths.trending.display(),
            "Snapshot published"
        );
        Ok(())
    }
}

/// A staged document waiting to be renamed over `target`.
struct Pending<'a> {
    target: &'a Path,
    tmp: PathBuf,
    /// Hard link (or copy) of the previous document, if there was one.
    backup: Option<PathBuf>,
}

/// Keeps the current contents of `target` reachable under `*.bak` until the
/// whole snapshot is in place. Only regular files are backed up.
fn back_up(target: &Path) -> Result<Option<PathBuf>, WriteError> {
    let is_file = fs::symlink_metadata(target)
        .map(|m| m.is_file())
        .unwrap_or(false);
    if !is_file {
        return Ok(None);
    }
    let backup = sibling(target, ".bak");
    let _ = fs::remove_file(&backup);
    if fs::hard_link(target, &backup).is_err() {
        fs::copy(target, &backup).map_err(io_err(&backup))?;
    }
    Ok(Some(backup))
}

/// Drops staged temporaries and backups of documents that were never renamed.
fn discard(pending: &[Pending<'_>]) {
    for p in pending {
        let _ = fs::remove_file(&p.tmp);
        if let Some(backup) = &p.backup {
            let _ = fs::remove_file(backup);
        }
    }
}

/// Puts the previous documents back over targets that were already renamed.
fn roll_back(renamed: &[Pending<'_>]) {
    for p in renamed {
        let restored = match &p.backup {
            Some(backup) => fs::rename(backup, p.target),
            None => fs::remove_file(p.target),
        };
        if let Err(e) = restored {
            tracing::error!(
                path = %p.target.display(),
                error = %e,
                "Could not restore previous snapshot document"
            );
        }
    }
}

fn stage(target: &Path, bytes: &[u8]) -> Result<PathBuf, WriteError> {
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    let tmp = sibling(target, ".tmp");
    if let Err(e) = fs::write(&tmp, bytes) {
        let _ = fs::remove_file(&tmp);
        return Err(io_err(&tmp)(e));
    }
    Ok(tmp)
}
