use crate::models::{Envelope, EnvelopeFile, ExtractedEntry, FileCategory, ValidatedRequest};
use mime::Mime;
use std::path::Path;

/// Derives content type, category and the per-file envelope. No I/O.
pub struct MetadataBuilder;

impl MetadataBuilder {
    /// Lower-cased extension including the leading dot, or an empty string.
    pub fn extension(path: &Path) -> String {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .unwrap_or_default()
    }

    pub fn content_type(path: &Path) -> Mime {
        match Self::extension(path).as_str() {
            ".txt" => mime::TEXT_PLAIN,
            ".jpg" | ".jpeg" => mime::IMAGE_JPEG,
            ".png" => mime::IMAGE_PNG,
            _ => mime::APPLICATION_OCTET_STREAM,
        }
    }

    pub fn category(content_type: &Mime) -> FileCategory {
        if content_type.type_() == mime::IMAGE {
            FileCategory::Image
        } else if content_type.type_() == mime::TEXT && content_type.subtype() == mime::PLAIN {
            FileCategory::Text
        } else {
            FileCategory::File
        }
    }

    /// Envelope for the `position`-th (1-based) of `total_files` entries.
    pub fn envelope(
        entry: &ExtractedEntry,
        request: &ValidatedRequest,
        project_id: &str,
        position: usize,
        total_files: usize,
    ) -> Envelope {
        let label = entry
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| entry.name.clone());

        Envelope {
            file: EnvelopeFile {
                path: entry.path.to_string_lossy().into_owned(),
                category: entry.category,
                extension: Self::extension(&entry.path),
                label,
            },
            target: project_id.to_string(),
            process: request.process.clone(),
            output_set: request.output_set.clone(),
            user_id: request.user_id.clone(),
            total_files,
            current_file: position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn request() -> ValidatedRequest {
        ValidatedRequest {
            archive_path: "projects/P1_2/data.zip".to_string(),
            process: json!({"id": "#77:1"}),
            output_set: Some("45:6".to_string()),
            user_id: None,
        }
    }

    #[test]
    fn test_content_type_and_category() {
        let txt = MetadataBuilder::content_type(Path::new("notes/readme.TXT"));
        assert_eq!(txt, mime::TEXT_PLAIN);
        assert_eq!(MetadataBuilder::category(&txt), FileCategory::Text);

        let jpeg = MetadataBuilder::content_type(Path::new("scan.jpeg"));
        assert_eq!(jpeg, mime::IMAGE_JPEG);
        assert_eq!(MetadataBuilder::category(&jpeg), FileCategory::Image);

        let png = MetadataBuilder::content_type(Path::new("page.png"));
        assert_eq!(MetadataBuilder::category(&png), FileCategory::Image);

        let other = MetadataBuilder::content_type(Path::new("data.bin"));
        assert_eq!(other, mime::APPLICATION_OCTET_STREAM);
        assert_eq!(MetadataBuilder::category(&other), FileCategory::File);
    }

    #[test]
    fn test_extension_without_suffix() {
        assert_eq!(MetadataBuilder::extension(Path::new("Makefile")), "");
        assert_eq!(MetadataBuilder::extension(Path::new("a/b.JPG")), ".jpg");
    }

    #[test]
    fn test_envelope_shape() {
        let entry = ExtractedEntry {
            name: "scans/page1.png".to_string(),
            path: PathBuf::from("/stage/abc/scans/page1.png"),
            content_type: mime::IMAGE_PNG,
            category: FileCategory::Image,
        };

        let envelope = MetadataBuilder::envelope(&entry, &request(), "P1:2", 2, 3);
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(
            value,
            json!({
                "file": {
                    "path": "/stage/abc/scans/page1.png",
                    "type": "image",
                    "extension": ".png",
                    "label": "page1.png"
                },
                "target": "P1:2",
                "process": {"id": "#77:1"},
                "output_set": "45:6",
                "userId": null,
                "total_files": 3,
                "current_file": 2
            })
        );
    }
}
