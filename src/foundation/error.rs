/// Convenience result type used across montage.
pub type MontageResult<T> = Result<T, MontageError>;

/// Coarse classification of a [`MontageError`], stable across message wording.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid node, geometry, or effect parameters.
    Validation,
    /// A chain of relative time references returns to its origin.
    Cycle,
    /// A reference names a node id that is not in the graph.
    UnresolvedReference,
    /// Render or effect configuration that cannot produce a meaningful result.
    Configuration,
    /// Failure while producing samples for a frame or audio block.
    Evaluation,
    /// Failure while reading or writing configuration documents.
    Serde,
    /// Render aborted through a cancellation token.
    Cancelled,
    /// Error from an external collaborator (IO, decoding, encoding).
    External,
}

/// Top-level error taxonomy used by engine APIs.
///
/// Every variant produced by the core carries the offending node id when one exists, so callers
/// can localize a fault to a specific timeline element.
#[derive(thiserror::Error, Debug)]
pub enum MontageError {
    /// Invalid user-provided node, geometry, or effect data.
    #[error("validation error{}: {message}", node_suffix(.node))]
    Validation {
        /// Offending node id.
        node: Option<String>,
        /// Human readable description.
        message: String,
    },

    /// Cyclic time reference.
    #[error("cycle error{}: {message}", node_suffix(.node))]
    Cycle {
        /// Node where the cycle was detected.
        node: Option<String>,
        /// Human readable description, including the cycle path.
        message: String,
    },

    /// Reference to a node id that does not exist.
    #[error("unresolved reference{}: {message}", node_suffix(.node))]
    UnresolvedReference {
        /// Node holding the dangling reference.
        node: Option<String>,
        /// Human readable description.
        message: String,
    },

    /// Configuration that cannot produce a meaningful render.
    #[error("configuration error{}: {message}", node_suffix(.node))]
    Configuration {
        /// Offending node id.
        node: Option<String>,
        /// Human readable description.
        message: String,
    },

    /// Errors while producing frames or audio.
    #[error("evaluation error{}: {message}", node_suffix(.node))]
    Evaluation {
        /// Offending node id.
        node: Option<String>,
        /// Human readable description.
        message: String,
    },

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Render was cancelled before `frame` started.
    #[error("render cancelled before frame {frame}")]
    Cancelled {
        /// First frame that was not produced.
        frame: u64,
    },

    /// Wrapped lower-level error from dependencies or IO.
    #[error("external error{}: {source:#}", node_suffix(.node))]
    Other {
        /// Node whose media or effect raised the error.
        node: Option<String>,
        /// Underlying error chain.
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for MontageError {
    fn from(source: anyhow::Error) -> Self {
        Self::Other { node: None, source }
    }
}

fn node_suffix(node: &Option<String>) -> String {
    match node {
        Some(id) => format!(" [node '{id}']"),
        None => String::new(),
    }
}

impl MontageError {
    /// Build a [`MontageError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            node: None,
            message: msg.into(),
        }
    }

    /// Build a [`MontageError::Cycle`] value.
    pub fn cycle(msg: impl Into<String>) -> Self {
        Self::Cycle {
            node: None,
            message: msg.into(),
        }
    }

    /// Build a [`MontageError::UnresolvedReference`] value.
    pub fn unresolved(msg: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            node: None,
            message: msg.into(),
        }
    }

    /// Build a [`MontageError::Configuration`] value.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            node: None,
            message: msg.into(),
        }
    }

    /// Build a [`MontageError::Evaluation`] value.
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation {
            node: None,
            message: msg.into(),
        }
    }

    /// Build a [`MontageError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Attach the offending node id. Keeps an id that is already set.
    pub fn at_node(mut self, id: impl Into<String>) -> Self {
        match &mut self {
            Self::Validation { node, .. }
            | Self::Cycle { node, .. }
            | Self::UnresolvedReference { node, .. }
            | Self::Configuration { node, .. }
            | Self::Evaluation { node, .. }
            | Self::Other { node, .. } => {
                if node.is_none() {
                    *node = Some(id.into());
                }
            }
            Self::Serde(_) | Self::Cancelled { .. } => {}
        }
        self
    }

    /// Prefix the message with `context`. Wrapped external errors gain it as an outer layer.
    pub fn context(mut self, context: impl std::fmt::Display) -> Self {
        if let Self::Other { node, source } = self {
            return Self::Other {
                node,
                source: source.context(context.to_string()),
            };
        }
        match &mut self {
            Self::Validation { message, .. }
            | Self::Cycle { message, .. }
            | Self::UnresolvedReference { message, .. }
            | Self::Configuration { message, .. }
            | Self::Evaluation { message, .. } => {
                *message = format!("{context}: {message}");
            }
            Self::Serde(message) => *message = format!("{context}: {message}"),
            Self::Cancelled { .. } | Self::Other { .. } => {}
        }
        self
    }

    /// Error classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Cycle { .. } => ErrorKind::Cycle,
            Self::UnresolvedReference { .. } => ErrorKind::UnresolvedReference,
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::Evaluation { .. } => ErrorKind::Evaluation,
            Self::Serde(_) => ErrorKind::Serde,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Other { .. } => ErrorKind::External,
        }
    }

    /// Offending node id, when the error is attributable to one.
    pub fn node_id(&self) -> Option<&str> {
        match self {
            Self::Validation { node, .. }
            | Self::Cycle { node, .. }
            | Self::UnresolvedReference { node, .. }
            | Self::Configuration { node, .. }
            | Self::Evaluation { node, .. }
            | Self::Other { node, .. } => node.as_deref(),
            Self::Serde(_) | Self::Cancelled { .. } => None,
        }
    }

    /// Message without the kind prefix or node fragment.
    pub fn message(&self) -> String {
        match self {
            Self::Validation { message, .. }
            | Self::Cycle { message, .. }
            | Self::UnresolvedReference { message, .. }
            | Self::Configuration { message, .. }
            | Self::Evaluation { message, .. } => message.clone(),
            Self::Serde(message) => message.clone(),
            Self::Cancelled { frame } => format!("cancelled before frame {frame}"),
            Self::Other { source, .. } => format!("{source:#}"),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
