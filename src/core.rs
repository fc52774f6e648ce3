use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use regex::Regex;

use crate::error::Result;

/// Default number-conversion format, as in AWK's CONVFMT.
pub(crate) const DEFAULT_CONV_FMT: &str = "%.6g";

/// Default subscript separator (U+001C, FILE SEPARATOR).
pub(crate) const DEFAULT_SUB_SEP: &str = "\u{1c}";

/// The part of a script's state that values and arrays need to reach:
/// conversion format, subscript separator, case sensitivity, the last
/// regex-match observables, and the compiled-regex cache.
///
/// Held behind an `Arc` so every `Value` produced by a script can format
/// itself and report match positions without borrowing the script.
pub(crate) struct ScriptCore {
    conv_fmt: Mutex<String>,
    sub_sep: Mutex<String>,
    ignore_case: AtomicBool,
    rstart: AtomicI64,
    rlength: AtomicI64,
    regexps: Mutex<HashMap<String, Arc<Regex>>>,
}

impl ScriptCore {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            conv_fmt: Mutex::new(DEFAULT_CONV_FMT.to_string()),
            sub_sep: Mutex::new(DEFAULT_SUB_SEP.to_string()),
            ignore_case: AtomicBool::new(false),
            rstart: AtomicI64::new(0),
            rlength: AtomicI64::new(-1),
            regexps: Mutex::new(HashMap::new()),
        })
    }

    /// An independent interior with the same configuration and a clone of
    /// the regex cache; match observables start out reset.
    pub(crate) fn detach(&self) -> Arc<Self> {
        Arc::new(Self {
            conv_fmt: Mutex::new(self.conv_fmt()),
            sub_sep: Mutex::new(self.sub_sep()),
            ignore_case: AtomicBool::new(self.ignore_case()),
            rstart: AtomicI64::new(0),
            rlength: AtomicI64::new(-1),
            regexps: Mutex::new(self.regexps.lock().unwrap().clone()),
        })
    }

    pub(crate) fn conv_fmt(&self) -> String {
        self.conv_fmt.lock().unwrap().clone()
    }

    pub(crate) fn set_conv_fmt(&self, fmt: &str) {
        *self.conv_fmt.lock().unwrap() = fmt.to_string();
    }

    pub(crate) fn sub_sep(&self) -> String {
        self.sub_sep.lock().unwrap().clone()
    }

    pub(crate) fn set_sub_sep(&self, sep: &str) {
        *self.sub_sep.lock().unwrap() = sep.to_string();
    }

    pub(crate) fn ignore_case(&self) -> bool {
        self.ignore_case.load(Ordering::Relaxed)
    }

    pub(crate) fn set_ignore_case(&self, ign: bool) {
        self.ignore_case.store(ign, Ordering::Relaxed);
    }

    pub(crate) fn rstart(&self) -> i64 {
        self.rstart.load(Ordering::Relaxed)
    }

    pub(crate) fn rlength(&self) -> i64 {
        self.rlength.load(Ordering::Relaxed)
    }

    /// Record the observables of the last regex match: a 1-based start and
    /// a byte length, or `(0, -1)` when nothing matched.
    pub(crate) fn set_match(&self, rstart: i64, rlength: i64) {
        self.rstart.store(rstart, Ordering::Relaxed);
        self.rlength.store(rlength, Ordering::Relaxed);
    }

    /// Compile a pattern through the per-script cache. When the script is
    /// case-insensitive the effective pattern (and cache key) is prefixed
    /// with `(?i)`.
    pub(crate) fn compile_regex(&self, expr: &str) -> Result<Arc<Regex>> {
        let key = if self.ignore_case() {
            format!("(?i){expr}")
        } else {
            expr.to_string()
        };
        let mut cache = self.regexps.lock().unwrap();
        if let Some(re) = cache.get(&key) {
            return Ok(re.clone());
        }
        let re = Arc::new(Regex::new(&key)?);
        cache.insert(key, re.clone());
        Ok(re)
    }
}
