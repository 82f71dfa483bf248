use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Where a tool call's SVG document comes from: a file inside the workspace
/// or inline text.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DocSource {
    /// Workspace-relative (or workspace-confined absolute) file path.
    File {
        #[schemars(description = "Path of the SVG document, relative to the workspace")]
        path: String,
    },
    /// The SVG document passed inline as text.
    Inline {
        #[schemars(description = "Inline SVG document text")]
        svg: String,
    },
}

impl DocSource {
    pub fn is_file(&self) -> bool {
        matches!(self, DocSource::File { .. })
    }
}

/// Export file format accepted by `action_run`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Png,
    Pdf,
    Svg,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Svg => "svg",
        }
    }
}

/// Which region of the document an export covers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExportArea {
    #[default]
    Page,
    Drawing,
}

impl ExportArea {
    /// The Inkscape action selecting this export area.
    pub fn action(&self) -> &'static str {
        match self {
            ExportArea::Page => "export-area-page",
            ExportArea::Drawing => "export-area-drawing",
        }
    }
}

/// Export request attached to an `action_run` call.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct ExportSpec {
    /// Output format.
    #[serde(rename = "type")]
    pub format: ExportFormat,
    /// Output path, confined to the workspace.
    #[schemars(description = "Output path for the export, relative to the workspace")]
    pub out: String,
    /// Raster resolution; only meaningful for raster formats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dpi: Option<u32>,
    /// Export region; defaults to the page.
    #[serde(default)]
    pub area: ExportArea,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_source_wire_format_matches_the_protocol() {
        let doc: DocSource = serde_json::from_str(r#"{"type": "file", "path": "in.svg"}"#).unwrap();
        assert!(matches!(doc, DocSource::File { ref path } if path == "in.svg"));

        let doc: DocSource = serde_json::from_str(r#"{"type": "inline", "svg": "<svg/>"}"#).unwrap();
        assert!(matches!(doc, DocSource::Inline { ref svg } if svg == "<svg/>"));
    }

    #[test]
    fn file_without_path_is_rejected() {
        assert!(serde_json::from_str::<DocSource>(r#"{"type": "file"}"#).is_err());
        assert!(serde_json::from_str::<DocSource>(r#"{"type": "inline"}"#).is_err());
    }

    #[test]
    fn export_defaults_to_page_area() {
        let export: ExportSpec =
            serde_json::from_str(r#"{"type": "png", "out": "out.png"}"#).unwrap();
        assert_eq!(export.format, ExportFormat::Png);
        assert_eq!(export.area, ExportArea::Page);
        assert!(export.dpi.is_none());
    }
}
