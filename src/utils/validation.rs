use crate::models::{ProcessRequest, ValidatedRequest};
use serde_json::Value;
use std::path::{Component, Path, PathBuf};

/// Marker preceding the project segment of an archive path
const PROJECTS_MARKER: &str = "/projects/";

#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn missing_field(field: &str) -> Self {
        Self {
            code: "MISSING_FIELD",
            message: format!("Missing required field: {}", field),
        }
    }

    fn invalid(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Checks the required fields of an inbound request before any I/O happens.
pub fn validate_request(req: ProcessRequest) -> Result<ValidatedRequest, ValidationError> {
    let archive_path = req
        .file
        .and_then(|f| f.path)
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ValidationError::missing_field("file.path"))?;

    // Required by the request contract; the envelope target comes from the path.
    req.target
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ValidationError::missing_field("target"))?;

    let process = req
        .process
        .filter(has_process_id)
        .ok_or_else(|| ValidationError::missing_field("process.id"))?;

    Ok(ValidatedRequest {
        archive_path,
        process,
        output_set: req.output_set.as_deref().map(normalize_output_set),
        user_id: req.user_id,
    })
}

fn has_process_id(process: &Value) -> bool {
    match process.get("id") {
        Some(Value::String(id)) => !id.is_empty(),
        Some(Value::Number(_)) => true,
        _ => false,
    }
}

/// Strips leading `#` record markers from an output set identifier.
pub fn normalize_output_set(output_set: &str) -> String {
    output_set.trim().trim_start_matches('#').to_string()
}

/// Extracts the project identifier from an archive path.
///
/// The identifier is the segment right after `/projects/`, with `_` mapped
/// back to `:`. A relative path starting with `projects/` also matches.
pub fn project_id_from_path(archive_path: &str) -> Result<String, ValidationError> {
    let anchored = format!("/{}", archive_path.trim_start_matches('/'));
    let start = anchored.find(PROJECTS_MARKER).ok_or_else(|| {
        ValidationError::invalid(
            "INVALID_PATH",
            format!("Cannot derive project from path: {}", archive_path),
        )
    })?;

    let segment = anchored[start + PROJECTS_MARKER.len()..]
        .split('/')
        .next()
        .unwrap_or("");

    if segment.is_empty() {
        return Err(ValidationError::invalid(
            "INVALID_PATH",
            format!("Empty project segment in path: {}", archive_path),
        ));
    }

    Ok(segment.replace('_', ":"))
}

/// Joins a request path onto the data root, refusing anything that could leave it.
pub fn resolve_archive_path(data_root: &Path, archive_path: &str) -> Result<PathBuf, ValidationError> {
    let relative = Path::new(archive_path.trim_start_matches('/'));
    let mut resolved = data_root.to_path_buf();

    for component in relative.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                tracing::warn!("Path traversal attempt detected: {}", archive_path);
                return Err(ValidationError::invalid(
                    "INVALID_PATH",
                    format!("Archive path must stay inside the data root: {}", archive_path),
                ));
            }
        }
    }

    if resolved == data_root {
        return Err(ValidationError::invalid(
            "INVALID_PATH",
            "Archive path cannot be empty",
        ));
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileRef;
    use serde_json::json;

    fn full_request() -> ProcessRequest {
        ProcessRequest {
            file: Some(FileRef {
                path: Some("data/projects/P1_2/files/upload.zip".to_string()),
            }),
            target: Some("#12:3".to_string()),
            output_set: Some("#45:6".to_string()),
            process: Some(json!({"id": "#77:1", "name": "unzip"})),
            user_id: Some("alice".to_string()),
        }
    }

    #[test]
    fn test_validate_request_ok() {
        let validated = validate_request(full_request()).unwrap();
        assert_eq!(validated.archive_path, "data/projects/P1_2/files/upload.zip");
        assert_eq!(validated.output_set.as_deref(), Some("45:6"));
        assert_eq!(validated.user_id.as_deref(), Some("alice"));
    }

    #[test]
    fn test_validate_request_missing_fields() {
        let mut req = full_request();
        req.file = Some(FileRef { path: None });
        assert_eq!(
            validate_request(req).unwrap_err().message,
            "Missing required field: file.path"
        );

        let mut req = full_request();
        req.target = None;
        assert_eq!(
            validate_request(req).unwrap_err().message,
            "Missing required field: target"
        );

        let mut req = full_request();
        req.process = Some(json!({"name": "unzip"}));
        assert_eq!(
            validate_request(req).unwrap_err().message,
            "Missing required field: process.id"
        );
    }

    #[test]
    fn test_output_set_is_optional() {
        let mut req = full_request();
        req.output_set = None;
        assert!(validate_request(req).unwrap().output_set.is_none());
    }

    #[test]
    fn test_normalize_output_set() {
        assert_eq!(normalize_output_set("#45:6"), "45:6");
        assert_eq!(normalize_output_set("##45:6"), "45:6");
        assert_eq!(normalize_output_set("45:6"), "45:6");
    }

    #[test]
    fn test_project_id_from_path() {
        assert_eq!(project_id_from_path("projects/P1_2/data.zip").unwrap(), "P1:2");
        assert_eq!(
            project_id_from_path("/srv/md/projects/12_7/files/a.zip").unwrap(),
            "12:7"
        );
        assert!(project_id_from_path("uploads/data.zip").is_err());
        assert!(project_id_from_path("data/projects//a.zip").is_err());
    }

    #[test]
    fn test_resolve_archive_path() {
        let root = Path::new("/mnt/data");
        assert_eq!(
            resolve_archive_path(root, "projects/P1_2/data.zip").unwrap(),
            PathBuf::from("/mnt/data/projects/P1_2/data.zip")
        );
        assert_eq!(
            resolve_archive_path(root, "/projects/P1_2/data.zip").unwrap(),
            PathBuf::from("/mnt/data/projects/P1_2/data.zip")
        );
        assert!(resolve_archive_path(root, "../etc/passwd").is_err());
        assert!(resolve_archive_path(root, "projects/../../x.zip").is_err());
        assert!(resolve_archive_path(root, "/").is_err());
    }
}
