use std::fmt::Write;

/// Line-oriented text sink for the encoder
///
/// Values on the same line are separated by a single space; each new line is indented by two
/// spaces per nesting level.
#[derive(Debug)]
pub(crate) struct Writer {
    indent: usize,
    outstring: String,
    line_open: bool,
}

impl Writer {
    pub(crate) fn new(indent: usize) -> Self {
        Self {
            indent,
            // an initial capacity of 1024 avoids most reallocations for small nodes
            outstring: String::with_capacity(1024),
            line_open: false,
        }
    }

    // start a new line at the current indentation. Nothing is added at the very start of the output.
    pub(crate) fn new_line(&mut self) {
        if !self.outstring.is_empty() {
            self.outstring.push('\n');
        }
        for _ in 0..self.indent {
            self.outstring.push_str("  ");
        }
        self.line_open = false;
    }

    pub(crate) fn indent(&mut self) {
        self.indent += 1;
    }

    pub(crate) fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    // add a bare word (keyword, identifier, enum label) to the current line
    pub(crate) fn add_str(&mut self, text: &str) {
        self.separate();
        self.outstring.push_str(text);
    }

    // add verbatim text. An empty body adds nothing.
    pub(crate) fn add_verbatim(&mut self, text: &str) {
        if !text.is_empty() {
            self.add_str(text);
        }
    }

    pub(crate) fn add_quoted_string(&mut self, value: &str) {
        self.separate();
        self.outstring.push('"');

        // escaping lots of strings is an expensive operation, so check if anything needs to be done first
        if value.contains(['\'', '"', '\\', '\r', '\n', '\t']) {
            for c in value.chars() {
                match c {
                    '\'' | '"' | '\\' => {
                        self.outstring.push('\\');
                        self.outstring.push(c);
                    }
                    '\r' => self.outstring.push_str("\\r"),
                    '\n' => self.outstring.push_str("\\n"),
                    '\t' => self.outstring.push_str("\\t"),
                    _ => self.outstring.push(c),
                }
            }
        } else {
            self.outstring.push_str(value);
        }
        self.outstring.push('"');
    }

    pub(crate) fn add_integer<T>(&mut self, value: T, is_hex: bool)
    where
        T: std::fmt::Display + std::fmt::UpperHex,
    {
        self.separate();
        // writing to a String cannot fail
        let _ = if is_hex {
            write!(self.outstring, "0x{value:X}")
        } else {
            write!(self.outstring, "{value}")
        };
    }

    pub(crate) fn add_float(&mut self, value: f64) {
        self.separate();
        let _ = if value == 0f64 {
            write!(self.outstring, "0")
        } else if value < -1e+10 || (-0.0001 < value && value < 0.0001) || 1e+10 < value {
            write!(self.outstring, "{value:e}")
        } else {
            write!(self.outstring, "{value}")
        };
    }

    pub(crate) fn add_comment(&mut self, text: &str) {
        self.separate();
        self.outstring.push_str("/*");
        self.outstring.push_str(text);
        self.outstring.push_str("*/");
    }

    fn separate(&mut self) {
        if self.line_open {
            self.outstring.push(' ');
        }
        self.line_open = true;
    }

    pub(crate) fn finish(self) -> String {
        self.outstring
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn write_str() {
        let mut writer = Writer::new(2);
        writer.add_str("test");
        writer.add_str("abc");
        // no line was started, so there is no indentation
        assert_eq!(writer.finish(), "test abc");
    }

    #[test]
    fn write_lines() {
        let mut writer = Writer::new(0);
        writer.new_line();
        writer.add_str("/begin");
        writer.add_str("X");
        writer.indent();
        writer.new_line();
        writer.add_str("Y");
        writer.dedent();
        writer.new_line();
        writer.add_str("/end");
        writer.add_str("X");
        assert_eq!(writer.finish(), "/begin X\n  Y\n/end X");
    }

    #[test]
    fn write_quoted_string() {
        let mut writer = Writer::new(2);
        writer.add_quoted_string("test:\rabc\ndef\tghi\'jkl\"nmo\\pqr");
        assert_eq!(writer.finish(), r#""test:\rabc\ndef\tghi\'jkl\"nmo\\pqr""#);
    }

    #[test]
    fn write_integer() {
        let mut writer = Writer::new(0);
        writer.add_integer(123, false);
        writer.add_integer(123, true);
        writer.add_integer(0xFF00u64, true);
        writer.add_integer(-5i64, false);
        assert_eq!(writer.finish(), "123 0x7B 0xFF00 -5");
    }

    #[test]
    fn write_float() {
        let mut writer = Writer::new(0);
        writer.add_float(123.456);
        // very small value -> scientific notation
        writer.add_float(0.000_012_345_6);
        // very large value -> scientific notation
        writer.add_float(123_456_000_000.0);
        writer.add_float(0.0);
        writer.add_float(-2.5);
        assert_eq!(writer.finish(), "123.456 1.23456e-5 1.23456e11 0 -2.5");
    }

    #[test]
    fn write_comment_and_verbatim() {
        let mut writer = Writer::new(0);
        writer.add_str("IF_DATA");
        writer.add_verbatim("");
        writer.add_comment(" Name ");
        writer.add_verbatim("XCP 1");
        assert_eq!(writer.finish(), "IF_DATA /* Name */ XCP 1");
    }
}
