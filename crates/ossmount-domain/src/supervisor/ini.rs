//! Line-preserving view of a supervisor INI file.
//!
//! Only lines this tool inserts change; everything else renders back byte for
//! byte, including comments, spacing, and `\r\n` endings.

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IniDocument {
    lines: Vec<String>,
    trailing_newline: bool,
}

impl IniDocument {
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
        let trailing_newline = text.ends_with('\n');
        if trailing_newline || text.is_empty() {
            lines.pop();
        }
        Self {
            lines,
            trailing_newline,
        }
    }

    #[must_use]
    pub fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        if self.trailing_newline {
            out.push('\n');
        }
        out
    }

    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Line index of the `[name]` header, if the section exists.
    #[must_use]
    pub fn section_header_index(&self, name: &str) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| section_name(line) == Some(name))
    }

    #[must_use]
    pub fn section_names(&self) -> Vec<&str> {
        self.lines.iter().filter_map(|line| section_name(line)).collect()
    }

    /// Values of `key` inside `[section]`, in file order.
    #[must_use]
    pub fn values(&self, section: &str, key: &str) -> Vec<&str> {
        let mut current: Option<&str> = None;
        let mut found = Vec::new();
        for line in &self.lines {
            if let Some(name) = section_name(line) {
                current = Some(name);
                continue;
            }
            if current != Some(section) {
                continue;
            }
            if let Some((k, v)) = key_value(line) {
                if k == key {
                    found.push(v);
                }
            }
        }
        found
    }

    #[must_use]
    pub fn contains_text(&self, needle: &str) -> bool {
        self.lines.iter().any(|line| line.contains(needle))
    }

    /// Inserts `line` before `index`, ending it the way the line above ends.
    pub fn insert_line(&mut self, index: usize, line: impl Into<String>) {
        let line = self.match_ending(index.checked_sub(1), line.into());
        self.lines.insert(index, line);
    }

    /// Appends a line, making sure the document ends with a newline.
    pub fn push_line(&mut self, line: impl Into<String>) {
        let line = self.match_ending(self.lines.len().checked_sub(1), line.into());
        self.lines.push(line);
        self.trailing_newline = true;
    }

    /// Carries a `\r\n` ending from the neighbouring line over to `line`.
    fn match_ending(&self, neighbour: Option<usize>, mut line: String) -> String {
        let crlf = neighbour
            .and_then(|idx| self.lines.get(idx))
            .is_some_and(|other| other.ends_with('\r'));
        if crlf && !line.ends_with('\r') {
            line.push('\r');
        }
        line
    }

    #[must_use]
    pub fn ends_with_blank_line(&self) -> bool {
        self.lines.last().map_or(true, |line| line.trim().is_empty())
    }
}

fn section_name(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('[')?;
    let end = inner.find(']')?;
    let rest = inner[end + 1..].trim_start();
    if !(rest.is_empty() || rest.starts_with(';') || rest.starts_with('#')) {
        return None;
    }
    Some(inner[..end].trim())
}

fn key_value(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('#') {
        return None;
    }
    let (key, value) = trimmed.split_once(['=', ':'])?;
    Some((key.trim(), value.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_round_trips_exact_bytes() {
        for text in [
            "",
            "[supervisord]\nnodaemon=true\n",
            "; comment\r\n[include]\r\nfiles = a.conf\r\n",
            "no trailing newline",
            "\n\n[x]\n\n",
        ] {
            assert_eq!(IniDocument::parse(text).render(), text, "round trip of {text:?}");
        }
    }

    #[test]
    fn headers_tolerate_whitespace_and_trailing_comments() {
        let doc = IniDocument::parse("  [include]  ; fragments\n[program:x]\nnot [a] header\n");
        assert_eq!(doc.section_header_index("include"), Some(0));
        assert_eq!(doc.section_names(), ["include", "program:x"]);
    }

    #[test]
    fn values_are_scoped_to_their_section() {
        let doc = IniDocument::parse(
            "[include]\nfiles = a.conf\n; files = ignored\n[other]\nfiles = b.conf\n[include]\nfiles=c.conf\n",
        );
        assert_eq!(doc.values("include", "files"), ["a.conf", "c.conf"]);
    }

    #[test]
    fn push_line_terminates_document() {
        let mut doc = IniDocument::parse("[a]");
        doc.push_line("[b]");
        assert_eq!(doc.render(), "[a]\n[b]\n");
    }

    #[test]
    fn inserted_lines_follow_crlf_endings() {
        let mut doc = IniDocument::parse("; c\r\n[include]\r\nfiles = a.conf\r\n");
        doc.insert_line(2, "files = b.conf");
        doc.push_line("[x]");
        assert_eq!(
            doc.render(),
            "; c\r\n[include]\r\nfiles = b.conf\r\nfiles = a.conf\r\n[x]\r\n"
        );
        assert_eq!(doc.values("include", "files"), ["b.conf", "a.conf"]);
    }
}
