//! Part reference resolution shared by the registry and the expression compiler.

use thiserror::Error;

use super::part::PartId;

/// Error when a part reference names nothing in the model.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum LookupError {
    #[error("Model part {reference} isn't specified in {document}")]
    PartNotFound { reference: String, document: String },
}

/// Resolves textual part references to part handles.
///
/// A reference is either a top-level alias (`head`), a colon-separated
/// path (`body:arm:hand`) matched as an ordered subsequence of part paths,
/// or `this`/`part` optionally followed by further segments, which is
/// relative to `context`.
///
/// # Example
///
/// ```
/// use cemkit::registry::{LookupError, PartArena, PartId, ReferenceResolver};
///
/// struct Single(PartId);
///
/// impl ReferenceResolver for Single {
///     fn find_child(&self, reference: &str, _: Option<PartId>) -> Result<PartId, LookupError> {
///         match reference {
///             "head" => Ok(self.0),
///             _ => Err(LookupError::PartNotFound {
///                 reference: reference.to_string(),
///                 document: "inline".to_string(),
///             }),
///         }
///     }
/// }
///
/// let mut parts = PartArena::new();
/// let head = parts.push_root();
/// assert!(Single(head).find_child("head", None).is_ok());
/// assert!(Single(head).find_child("tail", None).is_err());
/// ```
pub trait ReferenceResolver {
    fn find_child(&self, reference: &str, context: Option<PartId>) -> Result<PartId, LookupError>;
}
