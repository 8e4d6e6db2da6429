use crate::{
    audit::AuditSink,
    client::{parse_json_output, InferenceClient},
    error::{OrganizerError, Result},
    prompt,
    types::{Page, PageSet},
};
use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::mpsc::UnboundedSender;

/// First pipeline stage: discovers per-publication page sets.
///
/// For each directory directly under the input root, the Scanner lists the
/// page files, asks the inference backend to order them, and emits one
/// validated [`PageSet`] onto the outbound channel. A failing source is
/// skipped with one error event; only an unreadable input root ends the
/// stage early. Dropping the sender when the stage returns is the shutdown
/// signal for the Analyzer.
pub struct Scanner {
    input_root: PathBuf,
    client: Arc<InferenceClient>,
    audit: Arc<AuditSink>,
    cancel: Arc<AtomicBool>,
    out: UnboundedSender<PageSet>,
}

impl Scanner {
    pub fn new(
        input_root: PathBuf,
        client: Arc<InferenceClient>,
        audit: Arc<AuditSink>,
        cancel: Arc<AtomicBool>,
        out: UnboundedSender<PageSet>,
    ) -> Self {
        Self {
            input_root,
            client,
            audit,
            cancel,
            out,
        }
    }

    pub async fn run(self) {
        self.audit.info("Scanner service started.");

        let sources = match list_subdirectories(&self.input_root) {
            Ok(dirs) => dirs,
            Err(e) => {
                self.audit.error(format!(
                    "Unable to read the folders from the working directory '{}': {}",
                    self.input_root.display(),
                    e
                ));
                return;
            }
        };

        self.audit.info(format!(
            "Found {} publication folders under '{}'",
            sources.len(),
            self.input_root.display()
        ));

        for source in sources {
            if self.cancel.load(Ordering::Relaxed) {
                self.audit.info("Scanner service cancelled.");
                break;
            }

            match self.scan_source(&source).await {
                Ok(page_set) => {
                    self.audit.info(format!(
                        "Ordered {} pages from '{}'",
                        page_set.pages.len(),
                        source.display()
                    ));
                    if self.out.send(page_set).is_err() {
                        // Analyzer is gone; nothing left to feed.
                        break;
                    }
                }
                Err(e) => {
                    self.audit.error(format!(
                        "Skipping source '{}': {}",
                        source.display(),
                        e
                    ));
                }
            }
        }

        self.audit.info("Scanner service stopped.");
    }

    /// Order one source directory's files into a PageSet.
    async fn scan_source(&self, folder: &Path) -> Result<PageSet> {
        let file_names = list_file_names(folder)?;

        let response = self
            .client
            .complete(&prompt::ordering_prompt(&file_names))
            .await?;

        let ordering: Vec<Page> = parse_json_output(&response).map_err(|e| match e {
            // An empty ordering response is a malformed one, not a backend
            // "cannot determine" answer.
            OrganizerError::EmptyResponse => {
                OrganizerError::MalformedResponse("empty response".to_string())
            }
            other => other,
        })?;

        let pages = normalize_ordering(ordering)?;
        verify_file_set(&pages, &file_names)?;

        Ok(PageSet {
            folder: folder.to_path_buf(),
            pages,
        })
    }
}

/// List the immediate subdirectories of the input root.
fn list_subdirectories(root: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(root).map_err(|e| OrganizerError::SourceUnavailable {
        path: root.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| OrganizerError::SourceUnavailable {
            path: root.to_path_buf(),
            message: e.to_string(),
        })?;
        if entry.path().is_dir() {
            dirs.push(entry.path());
        }
    }
    Ok(dirs)
}

/// List the immediate files of one source directory (subdirectories ignored).
fn list_file_names(folder: &Path) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(folder).map_err(|e| OrganizerError::SourceUnavailable {
        path: folder.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| OrganizerError::SourceUnavailable {
            path: folder.to_path_buf(),
            message: e.to_string(),
        })?;
        if entry.path().is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

/// Validate and normalize an inferred ordering.
///
/// Sorts by the inferred number, then renumbers contiguously from 1. This
/// subsumes the 0-start shift and guarantees the 1..N no-gap invariant even
/// when the backend returns gapped numbering. Duplicate file names are
/// rejected: the emitted set must equal the listed set with no duplication.
pub fn normalize_ordering(mut ordering: Vec<Page>) -> Result<Vec<Page>> {
    if ordering.is_empty() {
        return Err(OrganizerError::EmptyOrdering);
    }

    ordering.sort_by_key(|p| p.number);

    let mut seen: Vec<&str> = ordering.iter().map(|p| p.file.as_str()).collect();
    seen.sort_unstable();
    if let Some(dup) = seen.windows(2).find(|w| w[0] == w[1]) {
        return Err(OrganizerError::MalformedResponse(format!(
            "duplicate file name '{}' in ordering",
            dup[0]
        )));
    }

    for (idx, page) in ordering.iter_mut().enumerate() {
        page.number = idx as u32 + 1;
    }

    Ok(ordering)
}

/// Require the ordered pages to cover the listed files exactly.
///
/// A backend that drops a listed file would silently lose a page, and an
/// invented file name would only surface later as an open error; both are
/// rejected here as malformed.
pub fn verify_file_set(pages: &[Page], listed: &[String]) -> Result<()> {
    let mut ordered: Vec<&str> = pages.iter().map(|p| p.file.as_str()).collect();
    let mut expected: Vec<&str> = listed.iter().map(|s| s.as_str()).collect();
    ordered.sort_unstable();
    expected.sort_unstable();

    if ordered != expected {
        return Err(OrganizerError::MalformedResponse(format!(
            "ordering covers {} of {} listed files, or names files that were not listed",
            ordered.iter().filter(|f| expected.binary_search(f).is_ok()).count(),
            expected.len()
        )));
    }

    Ok(())
}
