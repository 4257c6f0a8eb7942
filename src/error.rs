use std::path::PathBuf;

use crate::program::ShaderStage;

pub type BoxedIncludeProviderError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum PrepperError {
    /// The top-level shader file could not be read
    #[error("error: no such file or directory: {file:?} ({cause})")]
    FileNotFound {
        file: String,
        cause: BoxedIncludeProviderError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ProgramError {
    /// No stage matches the file's extension
    #[error("cannot infer the shader stage of {file:?}")]
    UnknownStage { file: String },

    /// One of the stage sources could not be resolved
    #[error(transparent)]
    Load(#[from] PrepperError),

    /// The driver rejected a stage; `log` is already remapped to the original files
    #[error("{stage:?} shader failed to compile:\n{log}")]
    Compile { stage: ShaderStage, log: String },

    /// The driver refused to link the program
    #[error("program failed to link:\n{log}")]
    Link { log: String },
}

/// Recoverable problem found while flattening a shader; resolution carries on past it.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Diagnostic {
    /// No search directory holds the included file; the directive is dropped
    #[error("In file {}({line}): Cannot open include file: '{include}': No such file or directory.", .file.display())]
    IncludeNotFound {
        file: PathBuf,
        line: usize,
        include: String,
    },

    /// A file was located but its contents could not be read
    #[error("error: no such file or directory: '{}'.", .file.display())]
    UnreadableFile { file: PathBuf },

    /// `#include` without a double-quoted path
    #[error("In file {}({line}): Malformed #include directive, expected #include \"path\".", .file.display())]
    MalformedInclude { file: PathBuf, line: usize },
}
