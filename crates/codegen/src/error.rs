//! C backend error type: propagates both logical errors (a malformed IR
//! the backend refuses to render) and the formatting errors `write!`
//! returns while building the output string.

#[derive(Debug)]
pub enum CodegenError {
    Logic(String),
    Format(std::fmt::Error),
}

impl std::fmt::Display for CodegenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodegenError::Logic(s) => write!(f, "{s}"),
            CodegenError::Format(e) => write!(f, "C generation error: {e}"),
        }
    }
}

impl std::error::Error for CodegenError {}

impl From<std::fmt::Error> for CodegenError {
    fn from(e: std::fmt::Error) -> Self {
        CodegenError::Format(e)
    }
}
