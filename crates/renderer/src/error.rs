use quantizer::EncodeError;

/// Shader stage named in compile diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Everything that can go wrong while rendering or exporting.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("graphics context unavailable: {0}")]
    ContextUnavailable(String),
    #[error("{stage} shader failed to compile:\n{diagnostic}")]
    ShaderCompileFailed {
        stage: ShaderStage,
        diagnostic: String,
    },
    #[error("shader program failed to link:\n{0}")]
    ProgramLinkFailed(String),
    #[error("source image upload rejected: {0}")]
    TextureUploadFailed(String),
    #[error("encoding dependency failed to load: {0}")]
    DependencyLoadFailed(String),
    #[error("export context setup failed: {0}")]
    ExportContextFailed(String),
    #[error("invalid export options: {0}")]
    InvalidOptions(String),
    #[error("invalid source image: {0}")]
    InvalidImage(String),
    #[error("surface error: {0}")]
    Surface(String),
    #[error("pixel readback failed: {0}")]
    Readback(String),
    #[error(transparent)]
    Encode(EncodeError),
}

impl RenderError {
    /// Whether the live loop must stop after this error.
    ///
    /// Upload and transient surface failures leave the program intact, so the
    /// loop keeps drawing with whatever state it still has.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            RenderError::TextureUploadFailed(_) | RenderError::Surface(_)
        )
    }
}

impl From<EncodeError> for RenderError {
    fn from(err: EncodeError) -> Self {
        match err {
            EncodeError::CodecLoad(message) => RenderError::DependencyLoadFailed(message),
            other => RenderError::Encode(other),
        }
    }
}

pub type RenderResult<T> = Result<T, RenderError>;
