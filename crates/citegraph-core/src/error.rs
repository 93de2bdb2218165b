use std::fmt;

/// Errors returned by citation graph operations.
///
/// Every variant is a caller-visible, recoverable condition. A failed
/// operation leaves the graph exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// An identifier referenced by the operation has no live publication.
    #[error("publication not found: {0}")]
    PublicationNotFound(String),

    /// A multi-parent create was given no parents at all.
    #[error("publication not found: no parent publications given")]
    EmptyParentList,

    /// Creation requested an identifier that is currently live.
    #[error("publication already created: {0}")]
    PublicationAlreadyCreated(String),

    /// Removal was requested on the root publication.
    #[error("tried to remove root publication {0}")]
    TriedToRemoveRoot(String),

    /// The requested citation would close a cycle.
    #[error("citation {child} -> {parent} would create a cycle")]
    CitationCycle { child: String, parent: String },

    /// A configured limit or the allocator refused to grow the graph.
    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),
}

impl GraphError {
    /// Stable error code for this failure.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::PublicationNotFound(_) | Self::EmptyParentList => ErrorCode::PublicationNotFound,
            Self::PublicationAlreadyCreated(_) => ErrorCode::PublicationAlreadyCreated,
            Self::TriedToRemoveRoot(_) => ErrorCode::TriedToRemoveRoot,
            Self::CitationCycle { .. } => ErrorCode::CitationCycle,
            Self::CapacityExceeded(_) => ErrorCode::CapacityExceeded,
        }
    }

    pub(crate) fn not_found(id: &impl fmt::Debug) -> Self {
        Self::PublicationNotFound(format!("{id:?}"))
    }

    pub(crate) fn already_created(id: &impl fmt::Debug) -> Self {
        Self::PublicationAlreadyCreated(format!("{id:?}"))
    }
}

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    PublicationNotFound,
    PublicationAlreadyCreated,
    TriedToRemoveRoot,
    CitationCycle,
    CapacityExceeded,
}

impl ErrorCode {
    /// Every code, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::PublicationNotFound,
        Self::PublicationAlreadyCreated,
        Self::TriedToRemoveRoot,
        Self::CitationCycle,
        Self::CapacityExceeded,
    ];

    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::PublicationNotFound => "E2001",
            Self::PublicationAlreadyCreated => "E2002",
            Self::TriedToRemoveRoot => "E2003",
            Self::CitationCycle => "E2004",
            Self::CapacityExceeded => "E5001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::PublicationNotFound => "Publication not found",
            Self::PublicationAlreadyCreated => "Publication already created",
            Self::TriedToRemoveRoot => "Tried to remove root",
            Self::CitationCycle => "Citation would create a cycle",
            Self::CapacityExceeded => "Capacity exceeded",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::PublicationNotFound => None,
            Self::PublicationAlreadyCreated => Some("Pick an identifier that is not in use."),
            Self::TriedToRemoveRoot => Some("The root publication lives as long as the graph."),
            Self::CitationCycle => Some("A publication can only cite works that do not cite it."),
            Self::CapacityExceeded => Some("Raise the limits in the graph config and retry."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
