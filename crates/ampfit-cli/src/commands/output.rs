//! Shared output formatting for conversion diagnostics.

use ampfit::{Diagnostics, Severity};
use anyhow::Result;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

use crate::OutputFormat;

/// Diagnostics of one converted file.
#[derive(Debug, Serialize)]
pub struct FileReport {
    /// Input file.
    pub path: PathBuf,
    /// Findings of the conversion.
    pub diagnostics: Diagnostics,
}

impl FileReport {
    /// Returns true if the converted file is not valid AMP.
    #[must_use]
    pub fn has_fatal(&self) -> bool {
        self.diagnostics.has_fatal()
    }
}

/// Writes reports in the specified format.
pub fn print(reports: &[FileReport], format: OutputFormat, out: &mut dyn Write) -> Result<()> {
    match format {
        OutputFormat::Text => print_text(reports, out)?,
        OutputFormat::Json => print_json(reports, out)?,
        OutputFormat::Compact => print_compact(reports, out)?,
    }
    Ok(())
}

fn print_text(reports: &[FileReport], out: &mut dyn Write) -> Result<()> {
    let (mut errors, mut warnings, mut infos) = (0, 0, 0);

    for report in reports {
        for diagnostic in &report.diagnostics {
            let severity_indicator = match diagnostic.severity() {
                Severity::Error => "\x1b[31merror\x1b[0m",
                Severity::Warning => "\x1b[33mwarning\x1b[0m",
                Severity::Info => "\x1b[34minfo\x1b[0m",
            };

            writeln!(
                out,
                "{} {} in {}",
                diagnostic.kind,
                diagnostic.rule_name.as_deref().unwrap_or("-"),
                report.path.display(),
            )?;
            writeln!(out, "  {severity_indicator}: {}", diagnostic.message)?;
            writeln!(out, "  = cause: {}", diagnostic.cause)?;
            writeln!(out)?;
        }
        let (e, w, i) = report.diagnostics.count_by_severity();
        errors += e;
        warnings += w;
        infos += i;
    }

    let summary_color = if errors > 0 {
        "\x1b[31m"
    } else if warnings > 0 {
        "\x1b[33m"
    } else {
        "\x1b[32m"
    };

    writeln!(
        out,
        "{summary_color}Found {errors} error(s), {warnings} warning(s), {infos} info(s) in {} file(s)\x1b[0m",
        reports.len()
    )?;
    Ok(())
}

fn print_json(reports: &[FileReport], out: &mut dyn Write) -> Result<()> {
    let json = serde_json::to_string_pretty(reports)?;
    writeln!(out, "{json}")?;
    Ok(())
}

fn print_compact(reports: &[FileReport], out: &mut dyn Write) -> Result<()> {
    for report in reports {
        for diagnostic in &report.diagnostics {
            writeln!(
                out,
                "{}: {} [{}] {}",
                report.path.display(),
                diagnostic.severity(),
                diagnostic.kind,
                diagnostic.message,
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ampfit::{Cause, Diagnostic, DiagnosticKind};

    fn reports() -> Vec<FileReport> {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::AttributeStripped,
            Cause::Attribute("target".into()),
            "value `_new` is not allowed",
        ));
        vec![FileReport {
            path: PathBuf::from("site/index.html"),
            diagnostics,
        }]
    }

    fn render(format: OutputFormat) -> String {
        let mut out = Vec::new();
        print(&reports(), format, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn compact_is_one_line_per_diagnostic() {
        assert_eq!(
            render(OutputFormat::Compact),
            "site/index.html: info [attribute-stripped] value `_new` is not allowed\n"
        );
    }

    #[test]
    fn json_lists_files_and_diagnostics() {
        let value: serde_json::Value = serde_json::from_str(&render(OutputFormat::Json)).unwrap();
        assert_eq!(value[0]["path"], "site/index.html");
        assert_eq!(value[0]["diagnostics"][0]["kind"], "attribute-stripped");
        assert_eq!(value[0]["diagnostics"][0]["cause"]["name"], "target");
    }

    #[test]
    fn text_ends_with_summary() {
        let text = render(OutputFormat::Text);
        assert!(text.contains("Found 0 error(s), 0 warning(s), 1 info(s) in 1 file(s)"));
    }
}
