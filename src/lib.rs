//! **shader-reloader** resolves `#include` directives in GLSL, which has no include
//! support of its own, and keeps the result ready for hot reloading.
//!
//! This crate does not implement a full C-like preprocessor, only `#include` expansion.
//! Other directives are copied into the expanded code, so they can be subsequently
//! handled by the shader compiler.
//!
//! A top-level file and everything it pulls in is flattened into a single source string
//! (a [`ShaderFile`]). Every code line gets a `#line <line> <file index>` directive, where
//! the index points into the unit's inclusion table. Compiler logs therefore carry enough
//! information for [`translate_error_log`] to map them back to the original files,
//! including the chain of files an error was included through.
//!
//! The inclusion table also remembers each file's modification time, so
//! [`ShaderFile::should_reload`] can tell when the unit needs to be rebuilt.
//! [`program::ShaderProgram`] wraps all of this into a GL program that rebuilds itself
//! in place and keeps the last working version when a reload fails to compile.
//!
//! # Example
//!
//! ```rust,no_run
//! use shader_reloader::{FileIncludeProvider, translate_error_log};
//!
//! let mut provider = FileIncludeProvider::new(vec!["shaders/include/"]);
//! let unit = shader_reloader::process_file("shaders/sky.frag", &mut provider)?;
//!
//! // ... hand `unit.source_string` to the GL, and if it fails:
//! let driver_log = "1(12) : error C1008: undefined variable \"sun_dir\"";
//! eprintln!("{}", translate_error_log(&unit, driver_log));
//!
//! // Once per frame:
//! if unit.should_reload(&provider) {
//!     // resolve and compile again
//! }
//! # Ok::<(), shader_reloader::PrepperError>(())
//! ```

use std::path::Path;

mod error;
pub mod error_log;
pub mod gl_compiler;
mod include_provider;
pub mod program;
mod scanner;
mod shader_file;


pub use error::*;
pub use error_log::{detect_log_syntax, translate_error_log, LogSyntax};
pub use include_provider::*;
pub use shader_file::*;

use scanner::Scanner;

/// Process a single file, and then any code recursively referenced.
///
/// `include_provider` is used to read all of the files, including the one at `file_path`.
/// A top-level file that can't be read is an error; problems with included files are
/// recorded in [`ShaderFile::diagnostics`] instead.
pub fn process_file(
    file_path: impl AsRef<Path>,
    include_provider: &mut dyn IncludeProvider,
) -> Result<ShaderFile, PrepperError> {
    let file_path = file_path.as_ref();
    let mut unit = ShaderFile::new(file_path.to_path_buf());

    Scanner::new(include_provider, &mut unit)
        .include_root(file_path)
        .map_err(|cause| {
            log::error!(
                "error: no such file or directory: '{}'.",
                file_path.display()
            );
            PrepperError::FileNotFound {
                file: file_path.display().to_string(),
                cause,
            }
        })?;

    Ok(unit)
}

/// Like [`process_file`], but a missing top-level file yields an empty unit with an
/// [`Diagnostic::UnreadableFile`] entry rather than an error.
pub fn process_file_lenient(
    file_path: impl AsRef<Path>,
    include_provider: &mut dyn IncludeProvider,
) -> ShaderFile {
    let file_path = file_path.as_ref();

    match process_file(file_path, include_provider) {
        Ok(unit) => unit,
        Err(_) => {
            let mut unit = ShaderFile::new(file_path.to_path_buf());
            unit.diagnostics.push(Diagnostic::UnreadableFile {
                file: file_path.to_path_buf(),
            });
            unit
        }
    }
}
