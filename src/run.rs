//! One-shot orchestrator: builds a [`WaczRun`] from a [`RunBuilder`], then
//! consumes it with [`WaczRun::process`] to assemble one WACZ file.

use std::{
    fs::File,
    io::{BufReader, Cursor},
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crate::{
    clock::{Clock, IdGenerator, RandomIdGenerator, SystemClock},
    datapackage::{DataPackage, ManifestOptions},
    error::WaczError,
    log::{LogSink, NullLog},
    page::PageInferrer,
    scheduler,
    signer::Signer,
    zipnum,
    zipwriter::StreamingZipWriter,
};

/// A page supplied up front by the caller, bypassing automatic detection.
struct ManualPage {
    url: String,
    title: Option<String>,
    timestamp: Option<String>,
}

pub struct RunBuilder {
    inputs: Vec<PathBuf>,
    output: Option<PathBuf>,
    log: Arc<dyn LogSink>,
    clock: Arc<dyn Clock>,
    id_generator: Arc<dyn IdGenerator>,
    signer: Option<Arc<dyn Signer>>,
    manual_pages: Vec<ManualPage>,
    detect_pages: bool,
    main_page_url: Option<String>,
    main_page_date: Option<String>,
    title: Option<String>,
    description: Option<String>,
    datapackage_extras: Option<serde_json::Map<String, serde_json::Value>>,
}

impl Default for RunBuilder {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            output: None,
            log: Arc::new(NullLog),
            clock: Arc::new(SystemClock),
            id_generator: Arc::new(RandomIdGenerator),
            signer: None,
            manual_pages: Vec::new(),
            detect_pages: true,
            main_page_url: None,
            main_page_date: None,
            title: None,
            description: None,
            datapackage_extras: None,
        }
    }
}

impl RunBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn add_input(mut self, path: impl Into<PathBuf>) -> Self {
        self.inputs.push(path.into());
        self
    }

    #[must_use]
    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    #[must_use]
    pub fn log(mut self, log: Arc<dyn LogSink>) -> Self {
        self.log = log;
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn id_generator(mut self, id_generator: Arc<dyn IdGenerator>) -> Self {
        self.id_generator = id_generator;
        self
    }

    #[must_use]
    pub fn signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Registers a page up front. Once any manual page is registered,
    /// automatic page detection is skipped entirely for this run unless
    /// [`RunBuilder::detect_pages`] was explicitly set to `true`.
    #[must_use]
    pub fn add_page(mut self, url: impl Into<String>, title: Option<String>, timestamp: Option<String>) -> Self {
        self.manual_pages.push(ManualPage {
            url: url.into(),
            title,
            timestamp,
        });
        self
    }

    /// Explicitly enables or disables automatic page detection. Overrides
    /// the default of detecting pages only when no manual pages were added,
    /// so a caller can disable detection while still supplying zero pages.
    #[must_use]
    pub fn detect_pages(mut self, detect_pages: bool) -> Self {
        self.detect_pages = detect_pages;
        self
    }

    /// Sets the main page URL recorded as `mainPageUrl` in `datapackage.json`.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.main_page_url = Some(url.into());
        self
    }

    /// Sets the main page timestamp recorded as `mainPageDate` in `datapackage.json`.
    #[must_use]
    pub fn ts(mut self, ts: impl Into<String>) -> Self {
        self.main_page_date = Some(ts.into());
        self
    }

    /// Sets the archive title recorded in `datapackage.json`. Defaults to `"WACZ"`.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the archive description recorded in `datapackage.json`. Defaults to `""`.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets arbitrary extra fields to flatten into `datapackage.json`.
    #[must_use]
    pub fn datapackage_extras(mut self, extras: serde_json::Map<String, serde_json::Value>) -> Self {
        self.datapackage_extras = Some(extras);
        self
    }

    pub fn build(self) -> Result<WaczRun, WaczError> {
        let output = self
            .output
            .ok_or_else(|| WaczError::ConfigInvalid("an output path is required".to_owned()))?;

        if self.inputs.is_empty() {
            return Err(WaczError::ConfigInvalid(
                "at least one input WARC file is required".to_owned(),
            ));
        }

        Ok(WaczRun {
            inputs: self.inputs,
            output,
            log: self.log,
            clock: self.clock,
            id_generator: self.id_generator,
            signer: self.signer,
            manual_pages: self.manual_pages,
            detect_pages: self.detect_pages,
            manifest_options: ManifestOptions {
                title: self.title,
                description: self.description,
                main_page_url: self.main_page_url,
                main_page_date: self.main_page_date,
                extras: self.datapackage_extras,
            },
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }
}

/// A handle a caller can use to cooperatively cancel a run in progress from
/// another thread.
#[derive(Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

pub struct RunOutcome {
    pub output: PathBuf,
    pub record_count: usize,
    pub page_count: usize,
}

pub struct WaczRun {
    inputs: Vec<PathBuf>,
    output: PathBuf,
    log: Arc<dyn LogSink>,
    clock: Arc<dyn Clock>,
    id_generator: Arc<dyn IdGenerator>,
    signer: Option<Arc<dyn Signer>>,
    manual_pages: Vec<ManualPage>,
    detect_pages: bool,
    manifest_options: ManifestOptions,
    cancel: Arc<AtomicBool>,
}

impl WaczRun {
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(Arc::clone(&self.cancel))
    }

    /// Runs the full pipeline: index every input, assemble the ZIP, sign
    /// and write the manifest. On any failure the partially-written output
    /// file is removed.
    pub fn process(self) -> Result<RunOutcome, WaczError> {
        match self.process_inner() {
            Ok(outcome) => Ok(outcome),
            Err(error) => {
                let _ = std::fs::remove_file(&self.output);
                Err(error)
            }
        }
    }

    fn check_cancelled(&self) -> Result<(), WaczError> {
        if self.cancel.load(Ordering::SeqCst) {
            return Err(WaczError::Cancelled);
        }
        Ok(())
    }

    fn process_inner(&self) -> Result<RunOutcome, WaczError> {
        self.check_cancelled()?;

        let detect_pages = self.detect_pages && self.manual_pages.is_empty();
        let mut index = scheduler::index_all_with_detection(&self.inputs, Arc::clone(&self.id_generator), self.log.as_ref(), detect_pages)?;

        self.check_cancelled()?;

        if !detect_pages {
            let mut manual = PageInferrer::new(Arc::clone(&self.id_generator));
            for page in &self.manual_pages {
                manual.add_page(page.url.clone(), page.title.clone(), page.timestamp.clone().unwrap_or_default());
            }
            for page in manual.into_pages() {
                index.insert_page(page);
            }
        }

        let lines: Vec<String> = index.lines().map(str::to_owned).collect();
        let pages_jsonl = render_pages_jsonl(index.pages());
        let record_count = lines.len();
        let page_count = index.pages().len();

        self.check_cancelled()?;

        let shard_index = zipnum::build(&lines)?;

        let output_file = File::create(&self.output).map_err(WaczError::WriteFailed)?;
        let mut writer = StreamingZipWriter::new(output_file);

        writer.add_entry("indexes/index.cdx.gz", Cursor::new(shard_index.cdx_gz))?;
        writer.add_entry("indexes/index.idx", Cursor::new(shard_index.idx.into_bytes()))?;
        writer.add_entry("pages/pages.jsonl", Cursor::new(pages_jsonl.into_bytes()))?;

        for input in &self.inputs {
            self.check_cancelled()?;
            let basename = input
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "data.warc.gz".to_owned());
            let file = File::open(input).map_err(WaczError::WriteFailed)?;
            writer.add_entry(&format!("archive/{basename}"), BufReader::new(file))?;
        }

        let resources = writer.resources_so_far();

        let data_package = DataPackage::new(&resources, self.clock.now(), self.signer.as_deref(), &self.manifest_options)
            .map_err(|error| WaczError::WriteFailed(std::io::Error::other(error.to_string())))?;
        let data_package_bytes = serde_json::to_vec_pretty(&data_package).map_err(|error| WaczError::WriteFailed(std::io::Error::other(error)))?;
        writer.add_entry("datapackage.json", Cursor::new(data_package_bytes.clone()))?;

        let digest = crate::datapackage::DataPackageDigest {
            path: "datapackage.json".to_owned(),
            hash: format!("sha256:{:x}", <sha2::Sha256 as sha2::Digest>::digest(&data_package_bytes)),
        };
        let digest_bytes = serde_json::to_vec_pretty(&digest).map_err(|error| WaczError::WriteFailed(std::io::Error::other(error)))?;
        writer.add_entry("datapackage-digest.json", Cursor::new(digest_bytes))?;

        writer.finish()?;

        self.log.info(&format!(
            "wrote {} with {record_count} record(s) and {page_count} page(s)",
            self.output.display()
        ));

        Ok(RunOutcome {
            output: self.output.clone(),
            record_count,
            page_count,
        })
    }
}

fn render_pages_jsonl(pages: &[crate::page::PageRecord]) -> String {
    let mut out = String::new();
    let header = serde_json::json!({"format": "json-pages-1.0", "id": "pages", "title": "All Pages"});
    out.push_str(&header.to_string());
    out.push('\n');
    for page in pages {
        out.push_str(&serde_json::to_string(page).expect("PageRecord is always serializable"));
        out.push('\n');
    }
    out
}
