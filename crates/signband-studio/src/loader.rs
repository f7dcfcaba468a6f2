//! Background record acquisition.
//!
//! The loader reads the record file on its own thread and hands the records
//! to the render thread in fixed-size batches, the way a paged data service
//! would deliver them.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use anyhow::{Context, Result};
use signband_model::record::parse_batch;
use signband_model::InputRecord;

#[derive(Debug)]
pub enum LoaderEvent {
    Batch(Vec<InputRecord>),
    Done { total: usize },
    Failed(String),
}

/// Starts the loader thread for `path`.
pub fn spawn(path: PathBuf, batch_size: usize) -> Result<Receiver<LoaderEvent>> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("signband_loader".to_string())
        .spawn(move || load(&path, batch_size, &tx))
        .context("spawning record loader thread")?;
    Ok(rx)
}

pub fn read_records(path: &Path) -> Result<Vec<InputRecord>> {
    let src = fs::read_to_string(path).with_context(|| format!("reading records {}", path.display()))?;
    parse_batch(&src).with_context(|| format!("parsing records {}", path.display()))
}

/// Splits `records` into batches of at most `batch_size`, preserving order.
pub fn into_batches(records: Vec<InputRecord>, batch_size: usize) -> Vec<Vec<InputRecord>> {
    let batch_size = batch_size.max(1);
    let mut batches = Vec::with_capacity(records.len().div_ceil(batch_size));
    let mut iter = records.into_iter().peekable();
    while iter.peek().is_some() {
        batches.push(iter.by_ref().take(batch_size).collect());
    }
    batches
}

fn load(path: &Path, batch_size: usize, tx: &Sender<LoaderEvent>) {
    let records = match read_records(path) {
        Ok(records) => records,
        Err(err) => {
            let _ = tx.send(LoaderEvent::Failed(format!("{err:#}")));
            return;
        }
    };

    let total = records.len();
    log::debug!("loader read {total} records from {}", path.display());

    for batch in into_batches(records, batch_size) {
        if tx.send(LoaderEvent::Batch(batch)).is_err() {
            // Render thread is gone.
            return;
        }
    }
    let _ = tx.send(LoaderEvent::Done { total });
}
