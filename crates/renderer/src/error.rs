use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::types::ContextTier;

/// Shader stage a source file is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Errors raised by the sketch lifecycle and the canvas it draws into.
#[derive(Debug, thiserror::Error)]
pub enum SketchError {
    #[error("failed to read {stage} shader at {path}: {source}")]
    ShaderRead {
        stage: ShaderStage,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{stage} shader {path} failed to compile:\n{message}")]
    ShaderCompile {
        stage: ShaderStage,
        path: PathBuf,
        message: String,
    },
    #[error("unsupported declaration in {stage} shader (line {line}): {detail}")]
    UnsupportedDeclaration {
        stage: ShaderStage,
        line: usize,
        detail: String,
    },
    #[error("uniform `{name}` is declared as {declared} in one stage and {other} in another")]
    UniformConflict {
        name: String,
        declared: &'static str,
        other: &'static str,
    },
    #[error("uniform `{name}` is declared as {declared} but was assigned a {assigned}")]
    UniformType {
        name: String,
        declared: &'static str,
        assigned: &'static str,
    },
    #[error("no shader program is bound; call bind_program before drawing")]
    NoProgramBound,
    #[error("canvas has not been created yet")]
    CanvasMissing,
    #[error("failed to build render pipeline: {0}")]
    Pipeline(String),
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error(transparent)]
    Context(#[from] ContextError),
}

/// One failed step of the context negotiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextAttempt {
    pub tier: ContextTier,
    pub reason: String,
}

impl fmt::Display for ContextAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.tier, self.reason)
    }
}

/// Failures while acquiring a graphics context for the canvas.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("no context tiers were requested")]
    NoTiers,
    #[error("error creating graphics context; every tier failed ({})", join_attempts(.attempts))]
    Unavailable { attempts: Vec<ContextAttempt> },
}

fn join_attempts(attempts: &[ContextAttempt]) -> String {
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
