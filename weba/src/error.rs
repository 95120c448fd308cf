use std::path::PathBuf;

/// Errors produced while building trees and rendering components.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A pop was attempted on an empty context stack.
    #[error("context stack underflow: pop called with no open context")]
    StackUnderflow,

    /// The tag is already open on this context stack.
    #[error("tag <{name}> is already open on the context stack")]
    AlreadyOpen {
        /// Name of the tag that was pushed twice.
        name: String,
    },

    /// A structural operation needed a parent and the tag has none.
    #[error("cannot {operation} a tag that has no parent")]
    DetachedTag {
        /// The operation that was attempted, e.g. `replace_with`.
        operation: &'static str,
    },

    /// A node was inserted into itself or into one of its own descendants.
    #[error("cannot insert a node into itself or one of its descendants")]
    HierarchyRequest,

    /// A required binding matched nothing.
    #[error("tag not found for selector {selector:?} in component {component}")]
    TagNotFound {
        /// The selector that was looked up, or `:root` for selector-less bindings.
        selector: String,
        /// Type name of the component.
        component: &'static str,
    },

    /// A CSS selector or comment marker could not be understood.
    #[error("invalid selector {selector:?}: {reason}")]
    InvalidSelector {
        /// The selector as given.
        selector: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Source markup failed to parse.
    #[error("failed to parse {source_name}: {source}")]
    Parse {
        /// Where the markup came from: a file path, a component name or `raw()`.
        source_name: String,
        /// The underlying parser error.
        #[source]
        source: weba_parser::ParseError,
    },

    /// A component declaration is invalid.
    #[error("invalid configuration for component {component}: {reason}")]
    Configuration {
        /// Type name of the component.
        component: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// A hook returned a future while the component was driven synchronously.
    #[error("{component}::{hook} is asynchronous; await the component instead of calling now()")]
    AsyncHook {
        /// Type name of the component.
        component: &'static str,
        /// The hook that suspended.
        hook: &'static str,
    },

    /// A component source file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        /// The file that was being read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A structured attribute value could not be encoded or decoded.
    #[error("attribute JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A [`Result`](std::result::Result) defaulting to [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;
