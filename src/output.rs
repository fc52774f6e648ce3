use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::script::Script;
use crate::value::Value;

impl Script {
    /// Write values to the output sink, separated by OFS and terminated by
    /// ORS. With no arguments, writes every field of the current record
    /// instead (and nothing at all when NF is 0).
    pub fn println(&mut self, args: &[Value]) -> Result<()> {
        if args.is_empty() {
            let n = self.nf;
            for i in 1..=n {
                write!(self.output, "{}", self.fields[i].string())?;
                if i == n {
                    write!(self.output, "{}", self.ors)?;
                } else {
                    write!(self.output, "{}", self.ofs)?;
                }
            }
            return Ok(());
        }
        for (i, arg) in args.iter().enumerate() {
            write!(self.output, "{}", arg.string())?;
            if i + 1 == args.len() {
                write!(self.output, "{}", self.ors)?;
            } else {
                write!(self.output, "{}", self.ofs)?;
            }
        }
        Ok(())
    }

    /// The default action: the current record followed by ORS.
    pub(crate) fn print_record(&mut self) -> Result<()> {
        let record = self.field(0);
        write!(self.output, "{}{}", record.string(), self.ors)?;
        Ok(())
    }
}

/// A cloneable in-memory output sink, handy for capturing script output in
/// tests and embedders:
///
/// ```
/// use awkit::{MemSink, Script};
///
/// let mut script = Script::new();
/// let sink = MemSink::new();
/// script.set_output(sink.clone());
/// script.append_rule(None, None).unwrap();
/// script.run("one\ntwo\n".as_bytes()).unwrap();
/// assert_eq!(sink.contents(), "one\ntwo\n");
/// ```
#[derive(Clone, Default)]
pub struct MemSink {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl MemSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, as (lossy) UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock().unwrap()).into_owned()
    }

    pub fn clear(&self) {
        self.buf.lock().unwrap().clear();
    }
}

impl Write for MemSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buf.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
