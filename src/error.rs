//! Error types.
//!
//! Loading and binding failures get their own enums so callers can tell a
//! missing file from a malformed model or a scene whose node names don't
//! line up with the materials. Application-level plumbing uses `anyhow`.

use std::path::PathBuf;

/// Failure while fetching or decoding the baked texture or the model file.
///
/// The scene stays partially built when this happens: whatever was already
/// on screen (the fireflies) keeps rendering.
#[derive(Debug, thiserror::Error)]
pub enum AssetLoadError {
    #[error("could not read asset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not fetch asset {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("could not decode image {name}: {source}")]
    Image {
        name: String,
        #[source]
        source: image::ImageError,
    },

    #[error("could not parse model {name}: {source}")]
    Gltf {
        name: String,
        #[source]
        source: gltf::Error,
    },

    #[error("model {name} references buffer {index}, which could not be resolved")]
    MissingBuffer { name: String, index: usize },

    #[error("model {name} contains no scene")]
    MissingScene { name: String },

    #[error(
        "model {name} uses {extension}; decode it with the tools in {decoder_path} before loading"
    )]
    CompressedGeometry {
        name: String,
        extension: String,
        decoder_path: String,
    },

    #[error("model {name} requires the unsupported extension {extension}")]
    UnsupportedExtension { name: String, extension: String },
}

/// Failure while binding materials to scene nodes by name.
///
/// Always fatal: a half-bound scene is never rendered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MaterialBindingError {
    #[error("no scene node name contains \"{pattern}\"")]
    NoMatch { pattern: String },

    #[error("expected one scene node containing \"{pattern}\", found {}: {names:?}", names.len())]
    MultipleMatches { pattern: String, names: Vec<String> },
}

/// Failure while writing a value into the debug panel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DebugError {
    #[error("the debug panel has no field named \"{0}\"")]
    UnknownField(String),

    #[error("field \"{name}\" holds a {expected}, not a {found}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },
}
