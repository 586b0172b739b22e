//! Indented, line-oriented code sink with `#line` tracking.

use std::fmt;

const SPACES_PER_INDENT: usize = 4;

/// Accumulates generated source text. Handles indentation and inserts
/// `#line` markers whenever the requested source location diverges from
/// the writer's running position, so that driver diagnostics point at
/// the original HLSL.
pub struct CodeWriter {
    buffer: String,
    current_line: u32,
    current_file: Option<String>,
    write_lines: bool,
}

impl Default for CodeWriter {
    fn default() -> Self {
        Self::new(true)
    }
}

impl CodeWriter {
    /// Creates a writer. `write_lines` controls `#line` emission.
    pub fn new(write_lines: bool) -> Self {
        Self {
            buffer: String::new(),
            current_line: 1,
            current_file: None,
            write_lines,
        }
    }

    /// Starts a line at the given indent, optionally pinned to a source
    /// location.
    pub fn begin_line(&mut self, indent: usize, location: Option<(&str, u32)>) {
        if let Some((file, line)) = location {
            let file_changed = self.current_file.as_deref() != Some(file);
            if self.write_lines && (file_changed || line != self.current_line) {
                self.buffer.push_str(&format!("#line {line}"));
                if file_changed {
                    self.buffer.push_str(&format!(" \"{file}\""));
                    self.current_file = Some(file.to_string());
                }
                self.buffer.push('\n');
                self.current_line = line;
            }
        }
        for _ in 0..indent * SPACES_PER_INDENT {
            self.buffer.push(' ');
        }
    }

    /// Appends text to the current line.
    pub fn write(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    /// Appends formatted text to the current line.
    pub fn write_fmt(&mut self, args: fmt::Arguments<'_>) {
        self.buffer.push_str(&args.to_string());
    }

    /// Terminates the current line, appending `text` first.
    pub fn end_line(&mut self, text: &str) {
        self.buffer.push_str(text);
        self.buffer.push('\n');
        self.current_line += 1;
    }

    /// Writes a whole line at the given indent.
    pub fn write_line(&mut self, indent: usize, text: &str) {
        self.begin_line(indent, None);
        self.end_line(text);
    }

    /// Writes a whole line pinned to a source location.
    pub fn write_line_at(&mut self, indent: usize, file: &str, line: u32, text: &str) {
        self.begin_line(indent, Some((file, line)));
        self.end_line(text);
    }

    /// Returns the accumulated text.
    pub fn finish(self) -> String {
        self.buffer
    }

    /// The accumulated text so far.
    pub fn as_str(&self) -> &str {
        &self.buffer
    }
}

/// Formats a float literal the way shader source expects: locale
/// independent and round-trip exact, always carrying a decimal point
/// or exponent.
pub fn format_float(value: f32) -> String {
    let text = format!("{value}");
    if text.contains('.') || text.contains('e') || text.contains("inf") || text.contains("NaN") {
        text
    } else {
        format!("{text}.0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lines() {
        let mut w = CodeWriter::new(false);
        w.write_line(0, "void main() {");
        w.write_line(1, "x = 1;");
        w.write_line(0, "}");
        assert_eq!(w.finish(), "void main() {\n    x = 1;\n}\n");
    }

    #[test]
    fn line_marker_on_file_change() {
        let mut w = CodeWriter::new(true);
        w.write_line_at(0, "a.fx", 10, "float x;");
        let text = w.finish();
        assert!(text.starts_with("#line 10 \"a.fx\"\n"));
        assert!(text.contains("float x;"));
    }

    #[test]
    fn no_marker_when_position_matches() {
        let mut w = CodeWriter::new(true);
        w.write_line_at(0, "a.fx", 5, "float x;");
        // The writer is now at line 6 of a.fx; asking for line 6 must
        // not emit another marker.
        w.write_line_at(0, "a.fx", 6, "float y;");
        let text = w.finish();
        assert_eq!(text.matches("#line").count(), 1);
    }

    #[test]
    fn marker_on_line_jump() {
        let mut w = CodeWriter::new(true);
        w.write_line_at(0, "a.fx", 5, "float x;");
        w.write_line_at(0, "a.fx", 20, "float y;");
        let text = w.finish();
        assert!(text.contains("#line 20\n"));
        // Same file: the second marker omits the file name.
        assert_eq!(text.matches("\"a.fx\"").count(), 1);
    }

    #[test]
    fn markers_disabled() {
        let mut w = CodeWriter::new(false);
        w.write_line_at(0, "a.fx", 10, "float x;");
        assert!(!w.finish().contains("#line"));
    }

    #[test]
    fn begin_write_end() {
        let mut w = CodeWriter::new(false);
        w.begin_line(1, None);
        w.write("if (");
        w.write("x");
        w.end_line(") {");
        assert_eq!(w.finish(), "    if (x) {\n");
    }

    #[test]
    fn float_formatting() {
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(0.5), "0.5");
        assert_eq!(format_float(-2.25), "-2.25");
        assert_eq!(format_float(100.0), "100.0");
        // Shortest round-trip representation.
        assert_eq!(format_float(0.1), "0.1");
    }
}
