use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

use super::VendorError;

/// Which revision of a document an element reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WvmKind {
    Workspace,
    Version,
    Microversion,
}

impl WvmKind {
    pub fn as_segment(self) -> &'static str {
        match self {
            WvmKind::Workspace => "w",
            WvmKind::Version => "v",
            WvmKind::Microversion => "m",
        }
    }
}

impl FromStr for WvmKind {
    type Err = VendorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "w" => Ok(WvmKind::Workspace),
            "v" => Ok(WvmKind::Version),
            "m" => Ok(WvmKind::Microversion),
            other => Err(VendorError::InvalidUrl(format!(
                "unknown workspace/version marker {other:?}"
            ))),
        }
    }
}

/// Coordinates of one element (assembly or part studio) inside a document,
/// parsed from a browser URL such as
/// `https://cad.onshape.com/documents/{did}/w/{wid}/e/{eid}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub document_id: String,
    pub wvm: WvmKind,
    pub wvm_id: String,
    pub element_id: String,
}

impl DocumentRef {
    pub fn parse(raw: &str) -> Result<Self, VendorError> {
        let url = Url::parse(raw.trim())
            .map_err(|e| VendorError::InvalidUrl(format!("{raw:?} is not a URL: {e}")))?;
        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        let start = segments
            .iter()
            .position(|seg| *seg == "documents")
            .ok_or_else(|| VendorError::InvalidUrl(format!("{raw:?} is not a document URL")))?;

        match segments.get(start + 1..start + 6) {
            Some([did, wvm, wvm_id, "e", eid]) => Ok(Self {
                document_id: (*did).to_string(),
                wvm: wvm.parse()?,
                wvm_id: (*wvm_id).to_string(),
                element_id: (*eid).to_string(),
            }),
            _ => Err(VendorError::InvalidUrl(format!(
                "{raw:?} does not name a document element"
            ))),
        }
    }

    /// Path fragment shared by the element-scoped REST endpoints.
    pub fn api_path(&self) -> String {
        format!(
            "d/{}/{}/{}/e/{}",
            self.document_id,
            self.wvm.as_segment(),
            self.wvm_id,
            self.element_id
        )
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.api_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    #[test]
    fn parses_workspace_url() {
        let doc = DocumentRef::parse(
            "https://cad.onshape.com/documents/abc123/w/def456/e/ghi789?renderMode=0",
        )
        .unwrap();

        assert_eq!(doc.document_id, "abc123");
        assert_eq!(doc.wvm, WvmKind::Workspace);
        assert_eq!(doc.wvm_id, "def456");
        assert_eq!(doc.element_id, "ghi789");
        assert_eq!(doc.api_path(), "d/abc123/w/def456/e/ghi789");
    }

    #[test]
    fn parses_version_url() {
        let doc = DocumentRef::parse("https://cad.onshape.com/documents/a/v/b/e/c").unwrap();
        assert_eq!(doc.wvm, WvmKind::Version);
        assert_eq!(doc.to_string(), "d/a/v/b/e/c");
    }

    #[rstest]
    #[case("not a url")]
    #[case("https://cad.onshape.com/")]
    #[case("https://cad.onshape.com/documents/a/w/b")]
    #[case("https://cad.onshape.com/documents/a/x/b/e/c")]
    #[case("https://cad.onshape.com/documents/a/w/b/f/c")]
    fn rejects_malformed_urls(#[case] raw: &str) {
        assert_matches!(DocumentRef::parse(raw), Err(VendorError::InvalidUrl(_)));
    }
}
