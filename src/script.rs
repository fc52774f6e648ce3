use std::any::Any;
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::sync::Arc;

use crate::core::{ScriptCore, DEFAULT_CONV_FMT};
use crate::error::{Error, Result};
use crate::pattern::{self, Action, Pattern};
use crate::record::RecordScanner;
use crate::value::{Scalar, Value};

/// Default cap on a single record or field, in bytes.
const DEFAULT_MAX_SIZE: usize = 64 * 1024 * 1024;

/// Where we are in a run.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Phase {
    /// Before or after `run`.
    NotRunning,
    /// Before any records are read.
    AtBegin,
    /// While records are being read.
    InMiddle,
    /// After all records are read.
    AtEnd,
}

/// Premature-stop conditions.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Stop {
    None,
    /// Abort the current record.
    SkipRecord,
    /// Abort the entire run.
    StopScript,
}

/// A single pattern-action pair.
#[derive(Clone)]
pub(crate) struct Rule {
    pattern: Pattern,
    action: Action,
}

/// An auxiliary input stream registered with
/// [`attach_input`](Script::attach_input). Its scanner is built lazily,
/// snapshotting the record separator and case configuration at first use.
struct AuxInput {
    reader: Option<Box<dyn Read + Send>>,
    scanner: Option<RecordScanner>,
}

/// All the state for one AWK-like script: configuration, observables, the
/// rule list, and the record pipeline.
///
/// A script is driven by [`run`](Script::run): the Begin handler fires,
/// each input record is split into fields and matched against the rules in
/// order, and the End handler fires. Actions receive `&mut Script` and
/// read or write everything through it.
pub struct Script {
    /// Arbitrary, caller-supplied data, reachable from actions.
    pub state: Option<Box<dyn Any + Send>>,

    pub(crate) core: Arc<ScriptCore>,
    pub(crate) output: Box<dyn Write + Send>,

    pub(crate) rs: String,
    pub(crate) fs: String,
    pub(crate) field_widths: Option<Vec<usize>>,
    pub(crate) fpat: Option<String>,
    pub(crate) ors: String,
    pub(crate) ofs: String,
    pub(crate) max_record_size: usize,
    pub(crate) max_field_size: usize,

    pub(crate) nr: u64,
    pub(crate) nf: usize,
    pub(crate) rt: String,

    /// Fields of the current record; index 0 is the whole record text.
    pub(crate) fields: Vec<Value>,
    /// True when a field write has invalidated `fields[0]`.
    pub(crate) f0_stale: bool,

    rules: Vec<Rule>,
    begin: Option<Action>,
    end: Option<Action>,

    phase: Phase,
    stop: Stop,

    scanner: Option<RecordScanner>,
    aux: HashMap<String, AuxInput>,
}

impl Script {
    /// A script with default configuration: newline records, whitespace
    /// fields, output to standard output.
    pub fn new() -> Self {
        Self {
            state: None,
            core: ScriptCore::new(),
            output: Box::new(io::stdout()),
            rs: "\n".to_string(),
            fs: " ".to_string(),
            field_widths: None,
            fpat: None,
            ors: "\n".to_string(),
            ofs: " ".to_string(),
            max_record_size: DEFAULT_MAX_SIZE,
            max_field_size: DEFAULT_MAX_SIZE,
            nr: 0,
            nf: 0,
            rt: String::new(),
            fields: Vec::new(),
            f0_stale: false,
            rules: Vec::new(),
            begin: None,
            end: None,
            phase: Phase::NotRunning,
            stop: Stop::None,
            scanner: None,
            aux: HashMap::new(),
        }
    }

    // ---- Configuration ----------------------------------------------------

    /// Set the input record separator (really, a record terminator). A
    /// single code point separates records literally; several code points
    /// are treated as a regular expression; the empty string separates
    /// records by blank lines and implicitly accepts newlines as an extra
    /// field separator.
    ///
    /// Fails while records are being read; calling it from a Begin handler
    /// is fine.
    pub fn set_rs(&mut self, rs: &str) -> Result<()> {
        if self.phase == Phase::InMiddle {
            return Err(Error::config(
                "the record separator cannot be changed while records are being read",
            ));
        }
        self.rs = rs.to_string();
        Ok(())
    }

    /// Set the input field separator. A single space (the default) splits
    /// on runs of whitespace; any other single code point splits literally;
    /// the empty string makes each code point its own field; several code
    /// points are treated as a regular expression.
    ///
    /// Clears any fixed field widths or field pattern.
    pub fn set_fs(&mut self, fs: &str) {
        self.fs = fs.to_string();
        self.field_widths = None;
        self.fpat = None;
    }

    /// Split records into fields of the given byte widths instead of using
    /// a separator. All widths must be positive.
    pub fn set_field_widths(&mut self, widths: &[usize]) -> Result<()> {
        if widths.iter().any(|w| *w == 0) {
            return Err(Error::config("field widths must be positive"));
        }
        self.field_widths = Some(widths.to_vec());
        self.fpat = None;
        self.fs = " ".to_string();
        Ok(())
    }

    /// Make fields the successive matches of a regular expression instead
    /// of the text between separators.
    pub fn set_fpat(&mut self, fpat: &str) {
        self.fpat = Some(fpat.to_string());
        self.field_widths = None;
        self.fs = " ".to_string();
    }

    /// Set the output record separator.
    pub fn set_ors(&mut self, ors: &str) {
        self.ors = ors.to_string();
    }

    /// Set the output field separator. The current record's field 0 will
    /// be rebuilt with the new separator on its next read.
    pub fn set_ofs(&mut self, ofs: &str) {
        self.ofs = ofs.to_string();
        self.f0_stale = true;
    }

    /// Make regular-expression matching and string comparison
    /// case-insensitive (or sensitive again).
    pub fn set_ignore_case(&mut self, ign: bool) {
        self.core.set_ignore_case(ign);
    }

    /// Set the printf-style conversion format used when a numeric value is
    /// read as a string. `run` resets it to the default `%.6g`.
    pub fn set_conv_fmt(&mut self, fmt: &str) {
        self.core.set_conv_fmt(fmt);
    }

    /// Set the separator joining the indices of simulated
    /// multidimensional arrays.
    pub fn set_sub_sep(&mut self, sep: &str) {
        self.core.set_sub_sep(sep);
    }

    /// Cap the size of a single record, in bytes.
    pub fn set_max_record_size(&mut self, max: usize) {
        self.max_record_size = max;
    }

    /// Cap the size of a single field, in bytes.
    pub fn set_max_field_size(&mut self, max: usize) {
        self.max_field_size = max;
    }

    /// Replace the output sink, returning the previous one. The default
    /// sink is standard output.
    pub fn set_output(&mut self, w: impl Write + Send + 'static) -> Box<dyn Write + Send> {
        std::mem::replace(&mut self.output, Box::new(w))
    }

    pub(crate) fn replace_output(&mut self, w: Box<dyn Write + Send>) -> Box<dyn Write + Send> {
        std::mem::replace(&mut self.output, w)
    }

    // ---- Observables ------------------------------------------------------

    /// Records read from the primary input so far (1-based within
    /// actions).
    pub fn nr(&self) -> u64 {
        self.nr
    }

    /// Fields in the current record.
    pub fn nf(&self) -> usize {
        self.nf
    }

    /// The text that terminated the current record (empty for a final,
    /// unterminated record).
    pub fn rt(&self) -> &str {
        &self.rt
    }

    /// 1-based start of the last [`Value::matches`] hit, or 0 if it
    /// missed.
    pub fn rstart(&self) -> i64 {
        self.core.rstart()
    }

    /// Byte length of the last [`Value::matches`] hit, or -1 if it missed.
    pub fn rlength(&self) -> i64 {
        self.core.rlength()
    }

    /// Whether matching is currently case-insensitive.
    pub fn ignore_case(&self) -> bool {
        self.core.ignore_case()
    }

    /// The current number-conversion format.
    pub fn conv_fmt(&self) -> String {
        self.core.conv_fmt()
    }

    pub(crate) fn in_middle(&self) -> bool {
        self.phase == Phase::InMiddle
    }

    // ---- Values -----------------------------------------------------------

    /// Create a [`Value`] from any supported scalar kind.
    pub fn new_value(&self, v: impl Into<Scalar>) -> Value {
        Value::from_scalar(v.into(), Arc::clone(&self.core))
    }

    /// Create an empty associative array bound to this script.
    pub fn new_value_array(&self) -> crate::ValueArray {
        crate::ValueArray::new(Arc::clone(&self.core))
    }

    // ---- Rules ------------------------------------------------------------

    /// Append a pattern-action pair. A `None` pattern matches every
    /// record; a `None` action prints the record followed by ORS. Fails on
    /// a running script.
    pub fn append_rule(&mut self, pattern: Option<Pattern>, action: Option<Action>) -> Result<()> {
        if self.phase != Phase::NotRunning {
            return Err(Error::config("append_rule was called from a running script"));
        }
        self.rules.push(Rule {
            pattern: pattern.unwrap_or_else(pattern::always),
            action: action.unwrap_or_else(|| Action::new(|s: &mut Script| s.print_record())),
        });
        Ok(())
    }

    /// Install the handler that runs before any records are read.
    pub fn set_begin(&mut self, f: impl FnMut(&mut Script) -> Result<()> + Send + 'static) {
        self.begin = Some(Action::new(f));
    }

    /// Install the handler that runs after all records are read.
    pub fn set_end(&mut self, f: impl FnMut(&mut Script) -> Result<()> + Send + 'static) {
        self.end = Some(Action::new(f));
    }

    // ---- Control flow -----------------------------------------------------

    /// Stop processing the current record; the remaining rules are skipped
    /// and the run proceeds with the next record. The calling action
    /// should return afterwards.
    pub fn next(&mut self) {
        if self.stop == Stop::None {
            self.stop = Stop::SkipRecord;
        }
    }

    /// Stop the entire run; remaining records are skipped and the End
    /// handler fires. The calling action should return afterwards.
    pub fn exit(&mut self) {
        if self.stop == Stop::None {
            self.stop = Stop::StopScript;
        }
    }

    // ---- GetLine ----------------------------------------------------------

    /// Read the next record from the primary input, bypassing rule
    /// processing. Increments NR and updates RT. Returns `None` at end of
    /// input.
    pub fn get_line(&mut self) -> Result<Option<Value>> {
        let Some(scanner) = self.scanner.as_mut() else {
            return Err(Error::config("get_line requires a running input stream"));
        };
        match scanner.next_record()? {
            Some((record, rt)) => {
                self.rt = rt;
                self.nr += 1;
                Ok(Some(self.new_value(record)))
            }
            None => Ok(None),
        }
    }

    /// Register an auxiliary input stream for
    /// [`get_line_from`](Script::get_line_from). Its record scanner is
    /// built on first read from the configuration in effect at that
    /// moment; later changes to the primary script do not retarget it.
    pub fn attach_input(&mut self, name: &str, reader: impl Read + Send + 'static) {
        self.aux.insert(
            name.to_string(),
            AuxInput {
                reader: Some(Box::new(reader)),
                scanner: None,
            },
        );
    }

    /// Read the next record from a registered auxiliary stream. Neither NR
    /// nor RT changes. Returns `None` at end of that stream.
    pub fn get_line_from(&mut self, name: &str) -> Result<Option<Value>> {
        let core = Arc::clone(&self.core);
        let rs = self.rs.clone();
        let max_record = self.max_record_size;
        let Some(aux) = self.aux.get_mut(name) else {
            return Err(Error::config(format!("no input stream named {name:?}")));
        };
        if aux.scanner.is_none() {
            let Some(reader) = aux.reader.take() else {
                return Err(Error::config(format!("input stream {name:?} is unusable")));
            };
            aux.scanner = Some(RecordScanner::new(reader, &rs, core.detach(), max_record));
        }
        let scanner = aux.scanner.as_mut().expect("scanner was just installed");
        Ok(scanner
            .next_record()?
            .map(|(record, _rt)| Value::from_scalar(record.into(), core)))
    }

    // ---- Copy -------------------------------------------------------------

    /// An independent script with the same configuration, rules, fields,
    /// and regex cache. Rule closures are shared, so stateful patterns
    /// (such as ranges) share their latches with the original. The copy
    /// writes to standard output and starts with no auxiliary streams and
    /// no caller state.
    pub fn copy(&self) -> Script {
        let core = self.core.detach();
        Script {
            state: None,
            output: Box::new(io::stdout()),
            rs: self.rs.clone(),
            fs: self.fs.clone(),
            field_widths: self.field_widths.clone(),
            fpat: self.fpat.clone(),
            ors: self.ors.clone(),
            ofs: self.ofs.clone(),
            max_record_size: self.max_record_size,
            max_field_size: self.max_field_size,
            nr: self.nr,
            nf: self.nf,
            rt: self.rt.clone(),
            fields: self
                .fields
                .iter()
                .map(|v| v.rebind(Arc::clone(&core)))
                .collect(),
            f0_stale: self.f0_stale,
            rules: self.rules.clone(),
            begin: self.begin.clone(),
            end: self.end.clone(),
            phase: Phase::NotRunning,
            stop: Stop::None,
            scanner: None,
            aux: HashMap::new(),
            core,
        }
    }

    // ---- Run loop ---------------------------------------------------------

    /// Execute the script against an input stream. It is valid to run the
    /// same script on several streams in turn; NR, NF, and the conversion
    /// format are reset each time. Range latches are not reset.
    pub fn run<R: Read + Send + 'static>(&mut self, input: R) -> Result<()> {
        let result = self.run_inner(Box::new(input));
        self.scanner = None;
        self.phase = Phase::NotRunning;
        result
    }

    fn run_inner(&mut self, input: Box<dyn Read + Send>) -> Result<()> {
        self.core.set_conv_fmt(DEFAULT_CONV_FMT);
        self.nr = 0;
        self.nf = 0;
        self.fields.clear();
        self.f0_stale = false;
        self.stop = Stop::None;

        self.phase = Phase::AtBegin;
        if let Some(begin) = self.begin.take() {
            let result = begin.call(self);
            self.begin = Some(begin);
            result?;
        }

        // The scanner is built after the Begin handler so that it sees a
        // record separator assigned there.
        if self.stop != Stop::StopScript {
            self.scanner = Some(RecordScanner::new(
                input,
                &self.rs,
                Arc::clone(&self.core),
                self.max_record_size,
            ));
            self.phase = Phase::InMiddle;
            let rules = std::mem::take(&mut self.rules);
            let result = self.record_loop(&rules);
            self.rules = rules;
            result?;
        }

        self.phase = Phase::AtEnd;
        if let Some(end) = self.end.take() {
            let result = end.call(self);
            self.end = Some(end);
            result?;
        }
        Ok(())
    }

    fn record_loop(&mut self, rules: &[Rule]) -> Result<()> {
        loop {
            self.stop = Stop::None;
            let next = match self.scanner.as_mut() {
                Some(scanner) => scanner.next_record()?,
                None => None,
            };
            let Some((record, rt)) = next else {
                return Ok(());
            };
            self.rt = rt;
            self.nr += 1;
            self.split_record(&record)?;

            for rule in rules {
                if rule.pattern.eval(self) {
                    rule.action.call(self)?;
                    match self.stop {
                        Stop::None => {}
                        Stop::SkipRecord => break,
                        Stop::StopScript => return Ok(()),
                    }
                }
            }
        }
    }
}

impl Default for Script {
    fn default() -> Self {
        Self::new()
    }
}
