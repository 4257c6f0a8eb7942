//! Maps driver diagnostics back through the inclusion table.
//!
//! The flattened source tags every line with `#line <line> <file index>`, so compiler logs
//! reference table indices instead of paths. The log format is vendor-specific; the NVIDIA,
//! Intel/AMD and Mesa syntaxes are understood, anything else is passed through untouched.

use lazy_static::lazy_static;
use regex::Regex;

use crate::ShaderFile;

lazy_static! {
    static ref NV_ERROR_RE: Regex = Regex::new(r"^(\d+)\((\d*)\)\s*:?\s*(.*)$").unwrap();
    static ref INTEL_AMD_ERROR_RE: Regex =
        Regex::new(r"^(ERROR|WARNING):\s*(\d+):(\d+):\s*(.*)$").unwrap();
    static ref MESA_ERROR_RE: Regex = Regex::new(r"^(\d+):(\d+)\(\d+\):\s*(.*)$").unwrap();
}

/// Diagnostic syntax of a driver's info log
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogSyntax {
    /// `0(12) : error C0000: ...`
    Nvidia,
    /// `ERROR: 0:12: ...`
    IntelAmd,
    /// `0:12(5): error: ...`, the column is dropped
    Mesa,
}

struct Location<'a> {
    file_index: usize,
    line: &'a str,
    message: String,
}

impl LogSyntax {
    fn parse_line<'a>(self, line: &'a str) -> Option<Location<'a>> {
        match self {
            LogSyntax::Nvidia => {
                let captures = NV_ERROR_RE.captures(line)?;
                Some(Location {
                    file_index: captures.get(1)?.as_str().parse().ok()?,
                    line: captures.get(2)?.as_str(),
                    message: captures.get(3)?.as_str().to_string(),
                })
            }
            LogSyntax::IntelAmd => {
                let captures = INTEL_AMD_ERROR_RE.captures(line)?;
                Some(Location {
                    file_index: captures.get(2)?.as_str().parse().ok()?,
                    line: captures.get(3)?.as_str(),
                    message: format!(
                        "{}: {}",
                        captures.get(1)?.as_str().to_lowercase(),
                        captures.get(4)?.as_str()
                    ),
                })
            }
            LogSyntax::Mesa => {
                let captures = MESA_ERROR_RE.captures(line)?;
                Some(Location {
                    file_index: captures.get(1)?.as_str().parse().ok()?,
                    line: captures.get(2)?.as_str(),
                    message: captures.get(3)?.as_str().to_string(),
                })
            }
        }
    }
}

/// Finds which syntax the log is written in, if any line matches a known one.
pub fn detect_log_syntax(log: &str) -> Option<LogSyntax> {
    log.lines().find_map(|line| {
        let line = line.trim_start();
        if NV_ERROR_RE.is_match(line) {
            Some(LogSyntax::Nvidia)
        } else if INTEL_AMD_ERROR_RE.is_match(line) {
            Some(LogSyntax::IntelAmd)
        } else if MESA_ERROR_RE.is_match(line) {
            Some(LogSyntax::Mesa)
        } else {
            None
        }
    })
}

fn translate_line(unit: &ShaderFile, syntax: LogSyntax, line: &str, out: &mut Vec<String>) {
    let location = match syntax.parse_line(line.trim_start()) {
        Some(location) if location.file_index < unit.files.len() => location,
        _ => {
            out.push(line.to_string());
            return;
        }
    };

    let chain = unit.inclusion_chain(location.file_index);
    let path = unit.files[location.file_index].path.display();

    if chain.len() > 1 {
        for &ancestor in &chain[1..] {
            out.push(format!(
                "In file included from {}:",
                unit.files[ancestor].path.display()
            ));
        }
        out.push(format!("{}({}): {}", path, location.line, location.message));
    } else {
        out.push(format!(
            "In file {}({}): {}",
            path, location.line, location.message
        ));
    }
}

/// Rewrites `unit`'s compiler log so each diagnostic names the original file and line,
/// preceded by an "In file included from" trace for nested files.
///
/// Logs in an unknown syntax come back unchanged.
pub fn translate_error_log(unit: &ShaderFile, log: &str) -> String {
    if log.is_empty() {
        return String::new();
    }

    let syntax = match detect_log_syntax(log) {
        Some(syntax) => syntax,
        None => {
            log::warn!(
                "unrecognized shader compiler log syntax; file locations for {} are not remapped",
                unit.filename.display()
            );
            return log.to_string();
        }
    };

    let mut out = Vec::new();
    for line in log.lines() {
        translate_line(unit, syntax, line, &mut out);
    }

    let mut translated = out.join("\n");
    if log.ends_with('\n') {
        translated.push('\n');
    }
    translated
}
