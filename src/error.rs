use thiserror::Error;
use wasm_bindgen::JsValue;

/// A track document that could not be read at all.
///
/// Per-point problems never surface here; they are skipped and reported
/// through [`crate::track_types::TrackWarning`].
#[derive(Debug, Error)]
pub enum TrackError {
    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::Error),

    #[error("document has no root element")]
    NoRootElement,

    #[error("second root element <{element}>")]
    MultipleRoots { element: String },

    #[error("text outside the root element")]
    TextOutsideRoot,

    #[error("element <{element}> is not closed before end of document")]
    UnclosedElement { element: String },
}

impl From<quick_xml::events::attributes::AttrError> for TrackError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        Self::XmlParse(e.into())
    }
}

impl From<TrackError> for JsValue {
    fn from(e: TrackError) -> Self {
        JsValue::from_str(&e.to_string())
    }
}
