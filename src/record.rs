use std::io::Read;
use std::sync::Arc;

use crate::core::ScriptCore;
use crate::error::{Error, Result};

/// Terminator regex for paragraph mode (empty RS): one or more blank lines.
const PARAGRAPH_TERMINATOR: &str = r"\r?\n(\r?\n)+";

const READ_CHUNK: usize = 64 * 1024;

/// How records are delimited, chosen once from RS when the scanner is
/// built.
enum Terminator {
    /// RS is a single code point (and not U+FFFD): literal scan.
    Char(char),
    /// RS is several code points: treated as a regular expression,
    /// recompiled through the cache on every scan so an IgnoreCase flip
    /// affects later records.
    Regex(String),
    /// RS is empty: records are separated by runs of blank lines.
    Paragraph,
}

/// A buffered scanner that yields one record at a time from a byte stream,
/// reporting the exact terminator text (RT) alongside each record.
///
/// AWK documentation calls RS a record separator, but it behaves as a
/// record *terminator*: a trailing unterminated chunk at EOF is still a
/// record, with an empty RT.
pub(crate) struct RecordScanner {
    reader: Box<dyn Read + Send>,
    core: Arc<ScriptCore>,
    terminator: Terminator,
    max_record: usize,
    buf: Vec<u8>,
    eof: bool,
}

enum Scan {
    /// A terminator match: record byte length, bytes to consume, RT text.
    Terminated(usize, usize, String),
    /// A match that touches the end of the buffered data and might still
    /// grow; read more before committing.
    MaybeLonger,
    NoMatch,
}

impl RecordScanner {
    pub(crate) fn new(
        reader: Box<dyn Read + Send>,
        rs: &str,
        core: Arc<ScriptCore>,
        max_record: usize,
    ) -> Self {
        let mut chars = rs.chars();
        let terminator = match (chars.next(), chars.next()) {
            (None, _) => Terminator::Paragraph,
            (Some(c), None) if c != char::REPLACEMENT_CHARACTER => Terminator::Char(c),
            _ => Terminator::Regex(rs.to_string()),
        };
        Self {
            reader,
            core,
            terminator,
            max_record,
            buf: Vec::new(),
            eof: false,
        }
    }

    /// The next record and the terminator text that ended it, or `None` at
    /// end of input.
    pub(crate) fn next_record(&mut self) -> Result<Option<(String, String)>> {
        loop {
            let scan = self.scan_buffer()?;
            match scan {
                Scan::Terminated(rec_len, consumed, rt) => {
                    if rec_len > self.max_record {
                        return Err(Error::scan(format!(
                            "record exceeds maximum record size of {} bytes",
                            self.max_record
                        )));
                    }
                    let record = String::from_utf8_lossy(&self.buf[..rec_len]).into_owned();
                    self.buf.drain(..consumed);
                    return Ok(Some((record, rt)));
                }
                Scan::MaybeLonger => {
                    self.fill()?;
                }
                Scan::NoMatch => {
                    if self.eof {
                        if self.buf.is_empty() {
                            return Ok(None);
                        }
                        if self.buf.len() > self.max_record {
                            return Err(Error::scan(format!(
                                "record exceeds maximum record size of {} bytes",
                                self.max_record
                            )));
                        }
                        let record = String::from_utf8_lossy(&self.buf).into_owned();
                        self.buf.clear();
                        return Ok(Some((record, String::new())));
                    }
                    if self.buf.len() > self.max_record {
                        return Err(Error::scan(format!(
                            "record exceeds maximum record size of {} bytes",
                            self.max_record
                        )));
                    }
                    self.fill()?;
                }
            }
        }
    }

    /// Look for a terminator in the buffered data.
    fn scan_buffer(&self) -> Result<Scan> {
        let text = self.valid_text()?;
        match &self.terminator {
            Terminator::Char(c) => match text.find(*c) {
                Some(i) => Ok(Scan::Terminated(i, i + c.len_utf8(), c.to_string())),
                None => Ok(Scan::NoMatch),
            },
            Terminator::Regex(rs) => self.scan_regex(text, rs),
            Terminator::Paragraph => self.scan_regex(text, PARAGRAPH_TERMINATOR),
        }
    }

    fn scan_regex(&self, text: &str, pattern: &str) -> Result<Scan> {
        let re = self.core.compile_regex(pattern)?;
        match re.find(text) {
            Some(m) => {
                if m.end() == m.start() {
                    return Err(Error::scan("record terminator matched an empty string"));
                }
                // A match flush against the buffer end may extend once
                // more input arrives (e.g. a greedy terminator like \++).
                if m.end() == text.len() && !self.eof {
                    return Ok(Scan::MaybeLonger);
                }
                Ok(Scan::Terminated(
                    m.start(),
                    m.end(),
                    m.as_str().to_string(),
                ))
            }
            None => Ok(Scan::NoMatch),
        }
    }

    /// The buffered bytes as text. A partial UTF-8 sequence at the tail is
    /// tolerated until EOF; anything else invalid is a scan error.
    fn valid_text(&self) -> Result<&str> {
        match std::str::from_utf8(&self.buf) {
            Ok(s) => Ok(s),
            Err(e) => {
                if e.error_len().is_none() && !self.eof {
                    Ok(std::str::from_utf8(&self.buf[..e.valid_up_to()]).unwrap_or(""))
                } else {
                    Err(Error::scan("invalid UTF-8 in input data"))
                }
            }
        }
    }

    fn fill(&mut self) -> Result<()> {
        let mut chunk = [0u8; READ_CHUNK];
        let n = self.reader.read(&mut chunk)?;
        if n == 0 {
            self.eof = true;
        } else {
            self.buf.extend_from_slice(&chunk[..n]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner(input: &str, rs: &str) -> RecordScanner {
        scanner_with_core(input, rs, ScriptCore::new())
    }

    fn scanner_with_core(input: &str, rs: &str, core: Arc<ScriptCore>) -> RecordScanner {
        RecordScanner::new(
            Box::new(std::io::Cursor::new(input.to_string())),
            rs,
            core,
            usize::MAX,
        )
    }

    fn collect(mut sc: RecordScanner) -> Vec<(String, String)> {
        let mut out = Vec::new();
        while let Some(pair) = sc.next_record().unwrap() {
            out.push(pair);
        }
        out
    }

    #[test]
    fn test_newline_records() {
        let recs = collect(scanner("X\nWord\nMore than one word\n\nMore text", "\n"));
        let texts: Vec<&str> = recs.iter().map(|(r, _)| r.as_str()).collect();
        assert_eq!(texts, ["X", "Word", "More than one word", "", "More text"]);
        assert_eq!(recs.last().unwrap().1, "");

        // A trailing terminator does not produce an extra empty record.
        let recs = collect(scanner("X\nWord\n", "\n"));
        let texts: Vec<&str> = recs.iter().map(|(r, _)| r.as_str()).collect();
        assert_eq!(texts, ["X", "Word"]);
        assert_eq!(recs[0].1, "\n");
    }

    #[test]
    fn test_space_separated_records_keep_empties() {
        let recs = collect(scanner("a  b c", " "));
        let texts: Vec<&str> = recs.iter().map(|(r, _)| r.as_str()).collect();
        assert_eq!(texts, ["a", "", "b", "c"]);
    }

    #[test]
    fn test_regex_terminator() {
        let recs = collect(scanner(
            "hello<foo>howdy</foo>hello<bar>yellow</bar>hello",
            "<[^>]+>[^<]*<[^>]+>",
        ));
        let texts: Vec<&str> = recs.iter().map(|(r, _)| r.as_str()).collect();
        assert_eq!(texts, ["hello", "hello", "hello"]);
        assert_eq!(recs[0].1, "<foo>howdy</foo>");
    }

    #[test]
    fn test_greedy_regex_terminator_rt() {
        let recs = collect(scanner("a++++++a++a++++a+++a+++++a+", r"\++"));
        let total: usize = recs.iter().map(|(_, rt)| rt.len()).sum();
        assert_eq!(total, 21);
        let texts: Vec<&str> = recs.iter().map(|(r, _)| r.as_str()).collect();
        assert_eq!(texts, ["a", "a", "a", "a", "a", "a"]);
    }

    #[test]
    fn test_paragraph_mode() {
        let recs = collect(scanner("uno\ndos\n\ntres\n\n\n\ncuatro\n\n", ""));
        let texts: Vec<&str> = recs.iter().map(|(r, _)| r.as_str()).collect();
        assert_eq!(texts, ["uno\ndos", "tres", "cuatro"]);
        assert_eq!(recs[0].1, "\n\n");
        assert_eq!(recs[1].1, "\n\n\n\n");
    }

    #[test]
    fn test_ignore_case_flip_applies_to_later_records() {
        let core = ScriptCore::new();
        let mut sc = scanner_with_core("1EOL2Eol3", "EOL", Arc::clone(&core));
        assert_eq!(sc.next_record().unwrap().unwrap().0, "1");
        // Case-sensitive: "Eol" does not terminate yet.
        core.set_ignore_case(true);
        assert_eq!(sc.next_record().unwrap().unwrap().0, "2");
        assert_eq!(sc.next_record().unwrap().unwrap().0, "3");
        assert!(sc.next_record().unwrap().is_none());
    }

    #[test]
    fn test_unterminated_final_record_has_empty_rt() {
        let recs = collect(scanner("one|two", "|"));
        assert_eq!(recs[0], ("one".to_string(), "|".to_string()));
        assert_eq!(recs[1], ("two".to_string(), String::new()));
    }

    #[test]
    fn test_empty_input() {
        assert!(scanner("", "\n").next_record().unwrap().is_none());
    }

    #[test]
    fn test_max_record_size() {
        let mut sc = RecordScanner::new(
            Box::new(std::io::Cursor::new("abcdefgh".to_string())),
            "\n",
            ScriptCore::new(),
            4,
        );
        assert!(matches!(sc.next_record(), Err(Error::Scan { .. })));
    }

    #[test]
    fn test_invalid_utf8_is_an_error() {
        let mut sc = RecordScanner::new(
            Box::new(std::io::Cursor::new(vec![b'a', 0xff, b'b'])),
            "\n",
            ScriptCore::new(),
            usize::MAX,
        );
        assert!(matches!(sc.next_record(), Err(Error::Scan { .. })));
    }

    #[test]
    fn test_invalid_rs_regex_is_an_error() {
        let mut sc = scanner("data", "((");
        assert!(matches!(sc.next_record(), Err(Error::Regex(_))));
    }

    #[test]
    fn test_empty_match_terminator_is_an_error() {
        let mut sc = scanner("data", "x*y*");
        assert!(matches!(sc.next_record(), Err(Error::Scan { .. })));
    }
}
