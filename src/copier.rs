use crate::{
    audit::AuditSink,
    error::{OrganizerError, Result},
    types::{Page, Publication, PublicationMetadata},
};
use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::mpsc::UnboundedReceiver;

const MONTH_NAMES: [&str; 12] = [
    "Janvier",
    "Février",
    "Mars",
    "Avril",
    "Mai",
    "Juin",
    "Juillet",
    "Août",
    "Septembre",
    "Octobre",
    "Novembre",
    "Décembre",
];

/// Final pipeline stage: materializes the destination layout.
///
/// Consumes Publications sequentially and copies each page to
/// `<output>/<title>/Numéro <NN> | <Months> <YYYY>/<NNN>.<ext>`. Directory
/// creation is idempotent and existing destination files are replaced with
/// create-truncate semantics. A failed page aborts the rest of its
/// Publication, never the stage.
pub struct Copier {
    output_root: PathBuf,
    audit: Arc<AuditSink>,
    cancel: Arc<AtomicBool>,
    inbound: UnboundedReceiver<Publication>,
}

impl Copier {
    pub fn new(
        output_root: PathBuf,
        audit: Arc<AuditSink>,
        cancel: Arc<AtomicBool>,
        inbound: UnboundedReceiver<Publication>,
    ) -> Self {
        Self {
            output_root,
            audit,
            cancel,
            inbound,
        }
    }

    pub async fn run(mut self) {
        self.audit.info("Copier service started.");

        while let Some(publication) = self.inbound.recv().await {
            if self.cancel.load(Ordering::Relaxed) {
                self.audit.info("Copier service cancelled.");
                break;
            }

            match transfer(&self.output_root, &publication, &self.audit) {
                Ok(()) => self.audit.info(format!(
                    "Publication '{}' #{} transferred",
                    publication.metadata.title, publication.metadata.number
                )),
                Err(e) => self.audit.error(format!(
                    "Unable to transfer '{}' #{}: {}",
                    publication.metadata.title, publication.metadata.number, e
                )),
            }
        }

        self.audit.info("Copier service stopped.");
    }
}

/// Copy one Publication's pages into the destination layout.
pub fn transfer(output_root: &Path, publication: &Publication, audit: &AuditSink) -> Result<()> {
    let title_dir = output_root.join(&publication.metadata.title);
    create_dir(&title_dir)?;

    let issue_dir = title_dir.join(issue_folder_name(&publication.metadata));
    create_dir(&issue_dir)?;

    for page in &publication.pages {
        let src_path = publication.folder.join(&page.file);
        let dst_path = issue_dir.join(page_file_name(page));

        let mut src =
            std::fs::File::open(&src_path).map_err(|e| OrganizerError::SourceUnavailable {
                path: src_path.clone(),
                message: e.to_string(),
            })?;

        let mut dst =
            std::fs::File::create(&dst_path).map_err(|e| OrganizerError::DestinationWrite {
                path: dst_path.clone(),
                message: e.to_string(),
            })?;

        std::io::copy(&mut src, &mut dst).map_err(|e| OrganizerError::DestinationWrite {
            path: dst_path.clone(),
            message: e.to_string(),
        })?;

        audit.debug(format!("File '{}' copied", dst_path.display()));
    }

    Ok(())
}

fn create_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| OrganizerError::DestinationWrite {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Resolve month numbers to French month names, dropping out-of-range values.
pub fn month_names(months: &[u8]) -> Vec<&'static str> {
    months
        .iter()
        .filter(|&&m| (1..=12).contains(&m))
        .map(|&m| MONTH_NAMES[m as usize - 1])
        .collect()
}

/// Issue-level subfolder name: `Numéro <NN> | <Months> <YYYY>`.
pub fn issue_folder_name(metadata: &PublicationMetadata) -> String {
    let months = month_names(&metadata.months).join(" - ");
    format!(
        "Numéro {:02} | {} {}",
        metadata.number, months, metadata.year
    )
}

/// Destination file name: zero-padded page number + lower-cased extension.
pub fn page_file_name(page: &Page) -> String {
    let ext = Path::new(&page.file)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default();
    format!("{:03}{}", page.number, ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Page;

    fn metadata(number: u32, months: Vec<u8>, year: i32) -> PublicationMetadata {
        PublicationMetadata {
            title: "Tilt".to_string(),
            number,
            months,
            year,
        }
    }

    #[test]
    fn test_month_names_single() {
        assert_eq!(month_names(&[6]), vec!["Juin"]);
    }

    #[test]
    fn test_month_names_multiple() {
        assert_eq!(month_names(&[1, 12]), vec!["Janvier", "Décembre"]);
    }

    #[test]
    fn test_month_names_out_of_range_dropped() {
        assert!(month_names(&[0, 13]).is_empty());
        assert_eq!(month_names(&[0, 6, 13]), vec!["Juin"]);
    }

    #[test]
    fn test_month_names_keeps_insertion_order() {
        assert_eq!(month_names(&[12, 1]), vec!["Décembre", "Janvier"]);
    }

    #[test]
    fn test_issue_folder_name() {
        assert_eq!(
            issue_folder_name(&metadata(42, vec![6], 1991)),
            "Numéro 42 | Juin 1991"
        );
        assert_eq!(
            issue_folder_name(&metadata(7, vec![1, 12], 1990)),
            "Numéro 07 | Janvier - Décembre 1990"
        );
    }

    #[test]
    fn test_page_file_name_zero_pads_and_lowercases() {
        let page = Page {
            file: "SCAN_12.JPG".to_string(),
            number: 3,
        };
        assert_eq!(page_file_name(&page), "003.jpg");
    }

    #[test]
    fn test_page_file_name_without_extension() {
        let page = Page {
            file: "scan".to_string(),
            number: 12,
        };
        assert_eq!(page_file_name(&page), "012");
    }

    #[test]
    fn test_transfer_copies_all_pages() {
        let source = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();

        std::fs::write(source.path().join("p1.jpg"), b"cover").unwrap();
        std::fs::write(source.path().join("p2.jpg"), b"summary").unwrap();

        let publication = Publication {
            metadata: metadata(42, vec![6], 1991),
            pages: vec![
                Page {
                    file: "p1.jpg".to_string(),
                    number: 1,
                },
                Page {
                    file: "p2.jpg".to_string(),
                    number: 2,
                },
            ],
            folder: source.path().to_path_buf(),
        };

        let audit = AuditSink::in_memory();
        transfer(output.path(), &publication, &audit).unwrap();

        let issue_dir = output.path().join("Tilt").join("Numéro 42 | Juin 1991");
        assert_eq!(
            std::fs::read(issue_dir.join("001.jpg")).unwrap(),
            b"cover"
        );
        assert_eq!(
            std::fs::read(issue_dir.join("002.jpg")).unwrap(),
            b"summary"
        );
    }

    #[test]
    fn test_transfer_is_idempotent() {
        let source = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();

        std::fs::write(source.path().join("p1.jpg"), b"v1").unwrap();

        let publication = Publication {
            metadata: metadata(1, vec![3], 1992),
            pages: vec![Page {
                file: "p1.jpg".to_string(),
                number: 1,
            }],
            folder: source.path().to_path_buf(),
        };

        let audit = AuditSink::in_memory();
        transfer(output.path(), &publication, &audit).unwrap();

        // Second run overwrites rather than errors
        std::fs::write(source.path().join("p1.jpg"), b"v2").unwrap();
        transfer(output.path(), &publication, &audit).unwrap();

        let issue_dir = output.path().join("Tilt").join("Numéro 01 | Mars 1992");
        assert_eq!(std::fs::read(issue_dir.join("001.jpg")).unwrap(), b"v2");
        assert_eq!(
            std::fs::read_dir(output.path().join("Tilt")).unwrap().count(),
            1
        );
    }

    #[test]
    fn test_transfer_missing_source_is_error() {
        let source = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();

        let publication = Publication {
            metadata: metadata(2, vec![], 1993),
            pages: vec![Page {
                file: "gone.jpg".to_string(),
                number: 1,
            }],
            folder: source.path().to_path_buf(),
        };

        let audit = AuditSink::in_memory();
        let result = transfer(output.path(), &publication, &audit);
        assert!(matches!(
            result,
            Err(OrganizerError::SourceUnavailable { .. })
        ));
    }
}
