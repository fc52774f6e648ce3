use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::script::Script;

type PatternFn = dyn FnMut(&mut Script) -> bool + Send;
type ActionFn = dyn FnMut(&mut Script) -> Result<()> + Send;

/// A pattern to match against: it examines the state of the script and
/// returns true when the paired action should run.
///
/// Patterns are cloneable handles; a clone shares any state the pattern
/// carries, so two clones of one [`range`] share its latch.
#[derive(Clone)]
pub struct Pattern {
    f: Arc<Mutex<PatternFn>>,
}

impl Pattern {
    pub fn new(f: impl FnMut(&mut Script) -> bool + Send + 'static) -> Self {
        let f: Arc<Mutex<PatternFn>> = Arc::new(Mutex::new(f));
        Self { f }
    }

    pub(crate) fn eval(&self, script: &mut Script) -> bool {
        let mut f = self.f.lock().unwrap();
        (&mut *f)(script)
    }
}

/// An action to perform when its pattern matches. Errors returned from an
/// action unwind the run and surface from [`Script::run`].
#[derive(Clone)]
pub struct Action {
    f: Arc<Mutex<ActionFn>>,
}

impl Action {
    pub fn new(f: impl FnMut(&mut Script) -> Result<()> + Send + 'static) -> Self {
        let f: Arc<Mutex<ActionFn>> = Arc::new(Mutex::new(f));
        Self { f }
    }

    pub(crate) fn call(&self, script: &mut Script) -> Result<()> {
        let mut f = self.f.lock().unwrap();
        (&mut *f)(script)
    }
}

/// True for every record (and only while records are being read).
pub fn always() -> Pattern {
    Pattern::new(|s| s.in_middle())
}

/// Combine two patterns into one that statefully matches every record from
/// the first time `p1` is true through the next time `p2` is true, both
/// inclusive. The latch then resets, so the range can match again later.
///
/// The latch is not reset between runs; build a fresh pattern per run if
/// independent latching is required.
pub fn range(p1: Pattern, p2: Pattern) -> Pattern {
    let mut in_range = false;
    Pattern::new(move |s| {
        if in_range {
            in_range = !p2.eval(s);
            true
        } else {
            in_range = p1.eval(s);
            in_range
        }
    })
}

/// An argument to [`auto`], obtained through `From` conversions from
/// record numbers, pattern strings, compiled regexes, and patterns.
pub enum AutoArg {
    /// Match the record whose NR equals this number.
    Number(i64),
    /// Match records whose full text matches this regular expression.
    Regex(String),
    /// Use the pattern as-is.
    Pattern(Pattern),
}

impl From<i64> for AutoArg {
    fn from(n: i64) -> Self {
        AutoArg::Number(n)
    }
}

impl From<i32> for AutoArg {
    fn from(n: i32) -> Self {
        AutoArg::Number(n as i64)
    }
}

impl From<u64> for AutoArg {
    fn from(n: u64) -> Self {
        AutoArg::Number(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<&str> for AutoArg {
    fn from(expr: &str) -> Self {
        AutoArg::Regex(expr.to_string())
    }
}

impl From<String> for AutoArg {
    fn from(expr: String) -> Self {
        AutoArg::Regex(expr)
    }
}

impl From<regex::Regex> for AutoArg {
    fn from(re: regex::Regex) -> Self {
        AutoArg::Regex(re.as_str().to_string())
    }
}

impl From<&regex::Regex> for AutoArg {
    fn from(re: &regex::Regex) -> Self {
        AutoArg::Regex(re.as_str().to_string())
    }
}

impl From<Pattern> for AutoArg {
    fn from(p: Pattern) -> Self {
        AutoArg::Pattern(p)
    }
}

/// Build a pattern from a convenient description:
///
/// - no arguments: [`always`];
/// - one argument: a pattern is used as-is, a regex (string or compiled)
///   matches against field 0, and a number `k` matches the record with
///   `NR == k`;
/// - an even number of arguments: consecutive pairs become [`range`]s and
///   the result matches when any of them does. Every range is evaluated on
///   every record so each keeps its own latch state.
///
/// Any other shape is a configuration error. Regex arguments are compiled
/// through the script's cache at match time, so a later IgnoreCase change
/// affects subsequent records.
///
/// The [`auto!`](crate::auto!) macro forwards its arguments here.
pub fn auto(args: impl IntoIterator<Item = AutoArg>) -> Result<Pattern> {
    let mut args: Vec<AutoArg> = args.into_iter().collect();
    match args.len() {
        0 => Ok(always()),
        1 => Ok(single(args.remove(0))),
        n if n % 2 == 0 => {
            let ranges: Vec<Pattern> = args
                .chunks_exact(2)
                .map(|pair| range(single_ref(&pair[0]), single_ref(&pair[1])))
                .collect();
            Ok(Pattern::new(move |s| {
                let mut hit = false;
                for r in &ranges {
                    if r.eval(s) {
                        hit = true;
                    }
                }
                hit
            }))
        }
        n => Err(Error::config(format!(
            "auto accepts zero, one, or an even number of arguments, not {n}"
        ))),
    }
}

fn single(arg: AutoArg) -> Pattern {
    match arg {
        AutoArg::Number(k) => Pattern::new(move |s| s.nr() as i64 == k),
        AutoArg::Regex(expr) => Pattern::new(move |s| s.field(0).matches(&expr)),
        AutoArg::Pattern(p) => p,
    }
}

fn single_ref(arg: &AutoArg) -> Pattern {
    match arg {
        AutoArg::Number(k) => {
            let k = *k;
            Pattern::new(move |s| s.nr() as i64 == k)
        }
        AutoArg::Regex(expr) => {
            let expr = expr.clone();
            Pattern::new(move |s| s.field(0).matches(&expr))
        }
        AutoArg::Pattern(p) => p.clone(),
    }
}

/// Variadic shorthand for [`auto`]:
/// `auto!(4, 6)` is `auto(vec![AutoArg::from(4), AutoArg::from(6)])`.
#[macro_export]
macro_rules! auto {
    ($($arg:expr),* $(,)?) => {
        $crate::auto(::std::vec![$($crate::AutoArg::from($arg)),*])
    };
}
