//! Error types for directive evaluation.

use stencil_xml::XmlError;

/// Errors caused by the data supplied in the render context.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ContextError {
    /// A loop expression evaluated to a non-collection.
    #[error("the expression {expression} should evaluate to a list but was: {value}")]
    NotIterable { expression: String, value: String },

    /// A `kind:key` context entry uses an unregistered content kind.
    #[error("unknown content kind `{kind}` for key `{key}`")]
    UnknownContentKind { kind: String, key: String },

    /// A content kind received a value of the wrong type.
    #[error("content `{kind}:{key}` expects {expected} but got {actual}")]
    InvalidContent {
        kind: &'static str,
        key: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// Image payload is not valid base64.
    #[error("image `{name}` has invalid base64 data: {source}")]
    InvalidImageData {
        name: String,
        #[source]
        source: base64::DecodeError,
    },

    /// An image directive referenced something other than an image.
    #[error("the expression {expression} should evaluate to an image but was: {value}")]
    NotAnImage { expression: String, value: String },

    /// Ordering comparison between values that have no ordering.
    #[error("cannot compare {left} {operator} {right}")]
    Incomparable {
        left: String,
        operator: &'static str,
        right: String,
    },

    /// The context root is not a JSON object.
    #[error("context must be an object, got {0}")]
    NotAnObject(&'static str),
}

/// Errors in the template's directive markup.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TemplateError {
    /// Directive text that matches no known form.
    #[error("invalid directive `{0}`")]
    InvalidDirective(String),

    /// Comparison operator outside the supported set.
    #[error("unknown operator `{0}`")]
    UnknownOperator(String),

    /// Quoted operand without a matching closing quote.
    #[error("malformed operand {0}: missing closing quote")]
    MalformedOperand(String),

    /// Predicate outside the allowed member names.
    #[error("unknown predicate `{0}`")]
    UnknownPredicate(String),

    /// Closing or branch marker that does not belong to the open block.
    #[error("`{found}` does not match `{open}`")]
    Mismatched { open: String, found: String },

    /// Closing or branch marker without an open block.
    #[error("`{0}` has no matching start directive")]
    UnexpectedMarker(String),

    /// Block start that is never closed.
    #[error("`{0}` is never closed")]
    Unclosed(String),

    /// Two markers of one block sit in the same structural element
    /// at different depths.
    #[error("markers of `{0}` do not share a common parent")]
    OverlappingMarkers(String),
}

/// Error raised while rendering a document.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RenderError {
    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("XML error: {0}")]
    Xml(#[from] XmlError),

    /// Operation on a part the document does not contain.
    #[error("unknown document part `{0}`")]
    UnknownPart(String),

    /// Relationship lookup failed.
    #[error("relationship `{id}` not found in part `{part}`")]
    MissingRelationship { part: String, id: String },

    /// An identifier counter reached the largest representable value.
    #[error("no identifiers left for `{element}/@{attribute}` in part `{part}`")]
    IdsExhausted {
        part: String,
        element: String,
        attribute: String,
    },

    /// Failure while rendering a specific part.
    #[error("in part {part}: {source}")]
    Part {
        part: String,
        #[source]
        source: Box<RenderError>,
    },
}
