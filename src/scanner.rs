use std::path::Path;

use crate::{
    BoxedIncludeProviderError, Diagnostic, FileRecord, IncludeProvider, ShaderFile,
};

/// How a single source line is treated while flattening.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum LineKind<'a> {
    /// Copied through untouched, without a `#line` prefix
    Verbatim,
    /// `/*` without a closing `*/` on the same line
    BlockCommentStart,
    BlockCommentEnd,
    Version,
    /// `#include` line; `None` if no quoted path could be found
    Include(Option<&'a str>),
    Code,
}

pub(crate) fn classify_line(line: &str, in_block_comment: bool) -> LineKind<'_> {
    if !in_block_comment && line.contains("//") {
        return LineKind::Verbatim;
    }

    if let Some(open) = line.find("/*") {
        return if line[open + 2..].contains("*/") {
            LineKind::Verbatim
        } else {
            LineKind::BlockCommentStart
        };
    }

    if line.contains("*/") {
        return LineKind::BlockCommentEnd;
    }

    if in_block_comment {
        LineKind::Verbatim
    } else if line.contains("#version") {
        LineKind::Version
    } else if line.contains("#include") {
        LineKind::Include(parse_include_path(line))
    } else {
        LineKind::Code
    }
}

/// Text between the first `"` after `#include` and the last `"` on the line.
fn parse_include_path(line: &str) -> Option<&str> {
    let directive = line.find("#include")?;
    let rest = line[directive + "#include".len()..].trim_end();
    let open = rest.find('"')?;
    let close = rest.rfind('"')?;

    if close > open + 1 {
        Some(&rest[open + 1..close])
    } else {
        None
    }
}

pub struct Scanner<'a, 'b> {
    include_provider: &'a mut dyn IncludeProvider,
    unit: &'b mut ShaderFile,
    version_found: bool,
}

impl<'a, 'b> Scanner<'a, 'b> {
    pub fn new(
        include_provider: &'a mut dyn IncludeProvider,
        unit: &'b mut ShaderFile,
    ) -> Scanner<'a, 'b> {
        Scanner {
            include_provider,
            unit,
            version_found: false,
        }
    }

    /// Flattens the top-level file into the unit's `source_string`.
    ///
    /// Fails only if the top-level file itself can't be read; the unit is left untouched then.
    pub fn include_root(&mut self, path: &Path) -> Result<(), BoxedIncludeProviderError> {
        let resolved = self.include_provider.resolve_root(path);
        // Stat before reading, so a save racing the read shows up as stale
        let last_write = self.include_provider.last_write(&resolved).ok();
        let code = self.include_provider.get_include(&resolved)?;

        self.unit.files.push(FileRecord {
            path: resolved.clone(),
            parent: None,
            last_write,
        });
        self.version_found = false;

        self.unit.source_string = self.process_input(&code, &resolved, 0);
        Ok(())
    }

    fn include_child(&mut self, path: &str, from: &Path, from_index: usize, from_line: usize) -> String {
        let resolved = match self.include_provider.resolve_path(path, from) {
            Some(resolved) => resolved,
            None => {
                let diagnostic = Diagnostic::IncludeNotFound {
                    file: from.to_path_buf(),
                    line: from_line,
                    include: path.to_string(),
                };
                log::warn!("{}", diagnostic);
                self.unit.diagnostics.push(diagnostic);
                return String::new();
            }
        };

        // Repeated and circular includes are dropped silently
        if self.unit.files.iter().any(|f| f.path == resolved) {
            log::debug!(
                "skipping repeated include of {} in {}({})",
                resolved.display(),
                from.display(),
                from_line
            );
            return String::new();
        }

        let last_write = self.include_provider.last_write(&resolved).ok();
        self.unit.files.push(FileRecord {
            path: resolved.clone(),
            parent: Some(from_index),
            last_write,
        });
        let file_index = self.unit.files.len() - 1;

        match self.include_provider.get_include(&resolved) {
            Ok(code) => self.process_input(&code, &resolved, file_index),
            Err(err) => {
                let diagnostic = Diagnostic::UnreadableFile { file: resolved };
                log::error!("{} ({})", diagnostic, err);
                self.unit.diagnostics.push(diagnostic);
                String::new()
            }
        }
    }

    fn process_input(&mut self, code: &str, this_file: &Path, file_index: usize) -> String {
        let mut output = String::with_capacity(code.len());
        let mut in_block_comment = false;

        for (i, line) in code.lines().enumerate() {
            let line_num = i + 1;

            match classify_line(line, in_block_comment) {
                LineKind::Verbatim => {}
                LineKind::BlockCommentStart => in_block_comment = true,
                LineKind::BlockCommentEnd => in_block_comment = false,
                LineKind::Version => self.version_found = true,
                LineKind::Include(Some(path)) => {
                    let child = self.include_child(path, this_file, file_index, line_num);
                    output.push_str(&child);
                    continue;
                }
                LineKind::Include(None) => {
                    let diagnostic = Diagnostic::MalformedInclude {
                        file: this_file.to_path_buf(),
                        line: line_num,
                    };
                    log::warn!("{}", diagnostic);
                    self.unit.diagnostics.push(diagnostic);
                    continue;
                }
                LineKind::Code => {
                    // Nothing may precede `#version`, not even a `#line`
                    if self.version_found {
                        output.push_str(&format!("#line {} {}\n", line_num, file_index));
                    }
                }
            }

            output.push_str(line);
            output.push('\n');
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_check_precedes_include() {
        assert_eq!(classify_line("// #include \"a.glsl\"", false), LineKind::Verbatim);
        assert_eq!(
            classify_line("#include \"a.glsl\" // common", false),
            LineKind::Verbatim
        );
    }

    #[test]
    fn block_comments() {
        assert_eq!(classify_line("/* header", false), LineKind::BlockCommentStart);
        assert_eq!(classify_line("#include \"a.glsl\"", true), LineKind::Verbatim);
        assert_eq!(classify_line("int x;", true), LineKind::Verbatim);
        assert_eq!(classify_line("end */", true), LineKind::BlockCommentEnd);
        assert_eq!(classify_line("int x; /* inline */", false), LineKind::Verbatim);
    }

    #[test]
    fn directives() {
        assert_eq!(classify_line("#version 450 core", false), LineKind::Version);
        assert_eq!(classify_line("void main() {}", false), LineKind::Code);
        assert_eq!(
            classify_line("#include \"lib/noise.glsl\"", false),
            LineKind::Include(Some("lib/noise.glsl"))
        );
        assert_eq!(
            classify_line("  #include   \"a.glsl\"  ", false),
            LineKind::Include(Some("a.glsl"))
        );
    }

    #[test]
    fn malformed_includes() {
        assert_eq!(classify_line("#include", false), LineKind::Include(None));
        assert_eq!(classify_line("#include <a.glsl>", false), LineKind::Include(None));
        assert_eq!(classify_line("#include \"a.glsl", false), LineKind::Include(None));
        assert_eq!(classify_line("#include \"\"", false), LineKind::Include(None));
    }
}
