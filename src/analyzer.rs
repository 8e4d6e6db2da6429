use crate::{
    audit::AuditSink,
    client::{parse_json_output, InferenceClient},
    error::{OrganizerError, Result},
    prompt,
    types::{ContentIndex, PageSet, Publication, PublicationMetadata, ReviewRecord},
};
use std::path::Path;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Sentinel the backend answers when the cover yields no usable metadata.
const UNKNOWN_SENTINEL: &str = "Unknown";

/// Second pipeline stage: derives publication metadata and a content index.
///
/// Consumes PageSets strictly sequentially. Two independent derivations run
/// per PageSet: cover metadata (which gates emission of a [`Publication`])
/// and the content index with its per-entry review records (which never
/// gates emission). All failures isolate to the PageSet at hand.
pub struct Analyzer {
    client: Arc<InferenceClient>,
    audit: Arc<AuditSink>,
    cancel: Arc<AtomicBool>,
    inbound: UnboundedReceiver<PageSet>,
    out: UnboundedSender<Publication>,
}

impl Analyzer {
    pub fn new(
        client: Arc<InferenceClient>,
        audit: Arc<AuditSink>,
        cancel: Arc<AtomicBool>,
        inbound: UnboundedReceiver<PageSet>,
        out: UnboundedSender<Publication>,
    ) -> Self {
        Self {
            client,
            audit,
            cancel,
            inbound,
            out,
        }
    }

    pub async fn run(mut self) {
        self.audit.info("Analyzer service started.");

        while let Some(page_set) = self.inbound.recv().await {
            if self.cancel.load(Ordering::Relaxed) {
                self.audit.info("Analyzer service cancelled.");
                break;
            }

            self.analyze_cover(&page_set).await;
            self.derive_content_index(&page_set).await;
        }

        // Dropping `out` here closes the Copier's inbound channel.
        self.audit.info("Analyzer service stopped.");
    }

    /// Derive cover metadata and emit a Publication on success.
    async fn analyze_cover(&self, page_set: &PageSet) {
        let cover = match page_set.pages.first() {
            Some(page) => page,
            None => {
                self.audit.info("No pages to analyze.");
                return;
            }
        };

        let cover_path = page_set.page_path(cover);
        self.audit
            .info(format!("Analyzing cover file '{}'", cover_path.display()));

        let image = match read_page(&cover_path) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.audit.error(e.to_string());
                return;
            }
        };

        let response = match self
            .client
            .complete_with_image(prompt::COVER_PAGE_PROMPT, &image)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                self.audit.error(format!(
                    "An error occurred trying to analyze the cover file '{}': {}",
                    cover_path.display(),
                    e
                ));
                return;
            }
        };

        let metadata = match decode_cover_metadata(&response) {
            Ok(metadata) => metadata,
            Err(OrganizerError::EmptyResponse) => {
                self.audit.error(format!(
                    "Unable to retrieve the metadata of the cover file '{}'",
                    cover_path.display()
                ));
                return;
            }
            Err(e) => {
                self.audit.error(format!(
                    "Unable to decode the publication metadata of cover file '{}': {}",
                    cover_path.display(),
                    e
                ));
                self.audit.debug(format!("Received: {}", response));
                return;
            }
        };

        self.audit.info(format!(
            "Analysis done: found publication title is '{}' and its number is '{}'",
            metadata.title, metadata.number
        ));

        let _ = self.out.send(Publication {
            metadata,
            pages: page_set.pages.clone(),
            folder: page_set.folder.clone(),
        });
    }

    /// Find a usable content index and derive per-entry review records.
    ///
    /// Independent of cover analysis; never gates Publication emission. The
    /// review records have no downstream consumer yet and are logged at
    /// debug severity.
    async fn derive_content_index(&self, page_set: &PageSet) {
        if page_set.pages.is_empty() {
            return;
        }

        let index = match self.find_content_index(page_set).await {
            Some(index) => index,
            None => return,
        };

        let reviews = self.collect_reviews(page_set, &index).await;
        self.audit.debug(format!(
            "Derived {} review records from '{}'",
            reviews.len(),
            page_set.folder.display()
        ));
    }

    /// Scan pages after the cover until one yields a usable content index.
    ///
    /// Decode failures move on to the next candidate page; file I/O failures
    /// abort the derivation for this PageSet.
    async fn find_content_index(&self, page_set: &PageSet) -> Option<ContentIndex> {
        for page in &page_set.pages[1..] {
            if self.cancel.load(Ordering::Relaxed) {
                return None;
            }

            let page_path = page_set.page_path(page);

            let image = match read_page(&page_path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    self.audit.error(e.to_string());
                    return None;
                }
            };

            let response = match self
                .client
                .complete_with_image(prompt::CONTENT_INDEX_PROMPT, &image)
                .await
            {
                Ok(text) => text,
                Err(e) => {
                    self.audit.error(format!(
                        "An error occurred trying to analyze the file '{}': {}",
                        page_path.display(),
                        e
                    ));
                    return None;
                }
            };

            if response.trim().is_empty() {
                self.audit.error(format!(
                    "Unable to retrieve the content index of the file '{}'",
                    page_path.display()
                ));
                return None;
            }

            let index: ContentIndex = match parse_json_output(&response) {
                Ok(index) => index,
                Err(e) => {
                    self.audit.error(format!(
                        "Unable to decode the content index of file '{}': {}",
                        page_path.display(),
                        e
                    ));
                    self.audit.debug(format!("Received: {}", response));
                    continue;
                }
            };

            if index.is_usable() {
                return Some(index);
            }
        }

        None
    }

    /// Analyze every page referenced by the content index.
    ///
    /// Resolution or open failure aborts further resolution for this
    /// PageSet; a malformed per-page response is logged and skipped.
    async fn collect_reviews(
        &self,
        page_set: &PageSet,
        index: &ContentIndex,
    ) -> Vec<ReviewRecord> {
        let mut reviews = Vec::new();

        for entry in &index.entries {
            for &page_number in &entry.page_numbers {
                if self.cancel.load(Ordering::Relaxed) {
                    return reviews;
                }

                let page = match page_set.page_by_number(page_number) {
                    Some(page) => page,
                    None => {
                        self.audit.error(format!(
                            "Content index references page {} which is not in '{}'",
                            page_number,
                            page_set.folder.display()
                        ));
                        return reviews;
                    }
                };

                let page_path = page_set.page_path(page);

                let image = match read_page(&page_path) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        self.audit.error(e.to_string());
                        return reviews;
                    }
                };

                let response = match self
                    .client
                    .complete_with_image(prompt::REVIEW_PAGE_PROMPT, &image)
                    .await
                {
                    Ok(text) => text,
                    Err(e) => {
                        self.audit.error(format!(
                            "An error occurred trying to analyze the file '{}': {}",
                            page_path.display(),
                            e
                        ));
                        return reviews;
                    }
                };

                let review: ReviewRecord = match parse_json_output(&response) {
                    Ok(review) => review,
                    Err(e) => {
                        self.audit.error(format!(
                            "Unable to decode the review record of file '{}': {}",
                            page_path.display(),
                            e
                        ));
                        self.audit.debug(format!("Received: {}", response));
                        continue;
                    }
                };

                self.audit.debug(format!(
                    "Review: '{}' on {} scored {}/{}",
                    review.title, review.platform, review.score, review.score_max
                ));
                reviews.push(review);
            }
        }

        reviews
    }
}

fn read_page(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| OrganizerError::SourceUnavailable {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Decode the cover-analysis response into publication metadata.
///
/// An empty response or the literal `Unknown` sentinel means the backend
/// could not determine the metadata; anything else must decode to the
/// expected shape.
pub fn decode_cover_metadata(response: &str) -> Result<PublicationMetadata> {
    let trimmed = response.trim();
    if trimmed.is_empty() || trimmed == UNKNOWN_SENTINEL {
        return Err(OrganizerError::EmptyResponse);
    }

    parse_json_output(trimmed).map_err(|e| match e {
        OrganizerError::MalformedResponse(raw) => OrganizerError::MalformedMetadata(raw),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_cover_metadata() {
        let metadata =
            decode_cover_metadata(r#"{"title":"Tilt","months":[6],"year":1991,"number":42}"#)
                .unwrap();
        assert_eq!(metadata.title, "Tilt");
        assert_eq!(metadata.number, 42);
    }

    #[test]
    fn test_decode_cover_metadata_markdown_wrapped() {
        let response = "```json\n{\"title\":\"Tilt\",\"months\":[1,12],\"year\":1990,\"number\":7}\n```";
        let metadata = decode_cover_metadata(response).unwrap();
        assert_eq!(metadata.months, vec![1, 12]);
    }

    #[test]
    fn test_decode_cover_unknown_sentinel() {
        assert!(matches!(
            decode_cover_metadata("Unknown"),
            Err(OrganizerError::EmptyResponse)
        ));
        assert!(matches!(
            decode_cover_metadata("  Unknown  "),
            Err(OrganizerError::EmptyResponse)
        ));
    }

    #[test]
    fn test_decode_cover_empty() {
        assert!(matches!(
            decode_cover_metadata(""),
            Err(OrganizerError::EmptyResponse)
        ));
    }

    #[test]
    fn test_decode_cover_malformed() {
        assert!(matches!(
            decode_cover_metadata("the cover shows a robot"),
            Err(OrganizerError::MalformedMetadata(_))
        ));
    }

    #[test]
    fn test_read_page_missing_is_source_unavailable() {
        let result = read_page(Path::new("/no/such/page.jpg"));
        assert!(matches!(
            result,
            Err(OrganizerError::SourceUnavailable { .. })
        ));
    }
}
