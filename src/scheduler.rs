//! Parallel WARC indexing: one worker per input file, bounded by CPU count,
//! their local batches merged serially on the calling thread so the final
//! ordering never depends on completion order.

use std::path::PathBuf;
use std::sync::Arc;

use rayon::ThreadPoolBuilder;

use crate::{
    cdxj::CdxjEntry,
    clock::IdGenerator,
    error::WaczError,
    log::LogSink,
    page::PageInferrer,
    sorted_index::SortedIndex,
    warc::WarcReader,
};

/// Indexes every file in `inputs`, merging results into one [`SortedIndex`].
/// Returns the first error encountered, after any in-flight workers finish.
pub fn index_all(
    inputs: &[PathBuf],
    id_generator: Arc<dyn IdGenerator>,
    log: &dyn LogSink,
) -> Result<SortedIndex, WaczError> {
    index_all_with_detection(inputs, id_generator, log, true)
}

/// As [`index_all`], but lets the caller disable automatic page detection —
/// used when the caller supplied its own page list up front.
pub fn index_all_with_detection(
    inputs: &[PathBuf],
    id_generator: Arc<dyn IdGenerator>,
    log: &dyn LogSink,
    detect_pages: bool,
) -> Result<SortedIndex, WaczError> {
    if inputs.is_empty() {
        return Err(WaczError::InputNotFound(
            "no .warc or .warc.gz files found in the input set".to_owned(),
        ));
    }

    let worker_count = num_cpus().min(inputs.len()).max(1);
    log.info(&format!(
        "indexing {} file(s) across {} worker(s)",
        inputs.len(),
        worker_count
    ));

    let pool = ThreadPoolBuilder::new()
        .num_threads(worker_count)
        .build()
        .map_err(|error| WaczError::IndexingFailed(Box::new(WaczError::ConfigInvalid(error.to_string()))))?;

    let results: Vec<Result<SortedIndex, WaczError>> = pool.install(|| {
        use rayon::prelude::*;
        inputs
            .par_iter()
            .map(|path| index_one_file(path, Arc::clone(&id_generator), detect_pages))
            .collect()
    });

    let mut merged = SortedIndex::new();
    let mut first_error = None;
    for result in results {
        match result {
            Ok(local) => merged.merge(local),
            Err(error) => {
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }
    }

    if let Some(error) = first_error {
        return Err(WaczError::IndexingFailed(Box::new(error)));
    }

    log.info(&format!("indexed {} record(s)", merged.len()));
    Ok(merged)
}

fn index_one_file(
    path: &PathBuf,
    id_generator: Arc<dyn IdGenerator>,
    detect_pages: bool,
) -> Result<SortedIndex, WaczError> {
    let reader = WarcReader::open(path)?;
    let mut local = SortedIndex::new();
    let mut pages = PageInferrer::new(id_generator);
    if !detect_pages {
        pages.disable_auto_detect();
    }

    for record in reader {
        let record = record?;
        pages.observe(&record);
        if let Some(entry) = CdxjEntry::from_record(&record) {
            local.insert_entry(entry);
        }
    }

    for page in pages.into_pages() {
        local.insert_page(page);
    }

    Ok(local)
}

fn num_cpus() -> usize {
    std::thread::available_parallelism().map(|count| count.get()).unwrap_or(1)
}
