//! Error types for every pipeline stage (§7).
//!
//! Hand-rolled `Display`/`std::error::Error` impls, not `thiserror`: the
//! same convention `codegen/error.rs`'s `CodeGenError` uses elsewhere in
//! this workspace.

use std::fmt;

/// A kind error (§4.2): bad or incoherent kinds in data declarations or
/// signatures. Carries the line of the offending data constructor or
/// signature where one is available.
#[derive(Debug, Clone, PartialEq)]
pub struct KindError {
    pub message: String,
    pub line: Option<u32>,
}

impl KindError {
    pub fn new(message: impl Into<String>, line: Option<u32>) -> Self {
        KindError {
            message: message.into(),
            line,
        }
    }
}

impl fmt::Display for KindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "Line {}: {}", line, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for KindError {}

/// A type error (§4.3 "Failure modes"): any failure during inference,
/// unification, or signature matching.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeError {
    pub message: String,
    pub line: Option<u32>,
}

impl TypeError {
    pub fn new(message: impl Into<String>, line: Option<u32>) -> Self {
        TypeError {
            message: message.into(),
            line,
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "Line {}: {}", line, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for TypeError {}

/// An internal consistency bug: the surface AST or STG IR violated an
/// invariant (§3) that an earlier, supposedly-validating stage should have
/// enforced. Per §7 this is a fatal bug, never a user-facing error — it is
/// kept distinct from `TypeError` so callers do not accidentally report it
/// as "your program is ill-typed".
#[derive(Debug, Clone, PartialEq)]
pub struct StgError(pub String);

impl fmt::Display for StgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "internal error: {}", self.0)
    }
}

impl std::error::Error for StgError {}

/// The top-level error every pipeline stage's public entry point returns,
/// per §7's policy: fatal, propagated to the top, never retried.
#[derive(Debug)]
pub enum CompileError {
    Kind(KindError),
    Type(TypeError),
    Stg(StgError),
    Io(String),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Kind(e) => write!(f, "{}", e),
            CompileError::Type(e) => write!(f, "{}", e),
            CompileError::Stg(e) => write!(f, "{}", e),
            CompileError::Io(s) => write!(f, "{}", s),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<KindError> for CompileError {
    fn from(e: KindError) -> Self {
        CompileError::Kind(e)
    }
}

impl From<TypeError> for CompileError {
    fn from(e: TypeError) -> Self {
        CompileError::Type(e)
    }
}

impl From<StgError> for CompileError {
    fn from(e: StgError) -> Self {
        CompileError::Stg(e)
    }
}

impl From<std::io::Error> for CompileError {
    fn from(e: std::io::Error) -> Self {
        CompileError::Io(e.to_string())
    }
}
