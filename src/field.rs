use crate::error::{Error, Result};
use crate::script::Script;
use crate::value::{Scalar, Value};

impl Script {
    /// Split a record into fields per the active splitting mode and store
    /// them; field 0 is the entire record and NF is updated.
    pub(crate) fn split_record(&mut self, record: &str) -> Result<()> {
        let raw = self.split_into_strings(record)?;
        for f in &raw {
            if f.len() > self.max_field_size {
                return Err(Error::scan(format!(
                    "field exceeds maximum field size of {} bytes",
                    self.max_field_size
                )));
            }
        }
        let mut fields = Vec::with_capacity(raw.len() + 1);
        fields.push(self.new_value(record));
        fields.extend(raw.into_iter().map(|f| self.new_value(f)));
        self.nf = fields.len() - 1;
        self.fields = fields;
        self.f0_stale = false;
        Ok(())
    }

    fn split_into_strings(&self, record: &str) -> Result<Vec<String>> {
        if record.is_empty() {
            return Ok(Vec::new());
        }

        // Fixed widths and a field pattern take precedence over any
        // separator.
        if let Some(widths) = &self.field_widths {
            return fixed_width_fields(record, widths);
        }
        if let Some(fpat) = &self.fpat {
            let re = self.core.compile_regex(fpat)?;
            return Ok(re
                .find_iter(record)
                .map(|m| m.as_str().to_string())
                .collect());
        }

        // An empty separator makes every code point a field.
        if self.fs.is_empty() {
            return Ok(record.chars().map(String::from).collect());
        }

        // A single space (the default) splits on runs of whitespace with
        // leading and trailing runs dropped.
        if self.fs == " " {
            return Ok(record.split_whitespace().map(String::from).collect());
        }

        // Any other single code point splits literally, preserving empty
        // fields, unless paragraph mode calls for the regex path below.
        let mut chars = self.fs.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if !self.rs.is_empty() {
                return Ok(record.split(c).map(String::from).collect());
            }
        }

        // Several code points are a regular expression. In paragraph mode
        // newlines are accepted as a separator in addition to FS.
        let pattern = if self.rs.is_empty() {
            format!(r"({})|(\r?\n)", self.fs)
        } else {
            self.fs.clone()
        };
        let re = self.core.compile_regex(&pattern)?;
        Ok(re.split(record).map(String::from).collect())
    }

    /// A field of the current record. Field numbers are 1-based; field 0
    /// is the entire record, rebuilt from the fields and OFS if a field
    /// was modified. Requesting a field beyond NF returns an empty value
    /// without extending the record.
    pub fn field(&mut self, i: usize) -> Value {
        if i == 0 {
            if self.f0_stale {
                self.rebuild_field0();
            }
            return match self.fields.first() {
                Some(v) => v.clone(),
                None => self.new_value(""),
            };
        }
        if i <= self.nf {
            self.fields[i].clone()
        } else {
            self.new_value("")
        }
    }

    /// Assign a field of the current record. Assigning field 0 reparses
    /// the whole record (recomputing NF); assigning past NF extends the
    /// record with empty fields. Any assignment marks field 0 for lazy
    /// reconstruction.
    pub fn set_field(&mut self, i: usize, v: impl Into<Scalar>) -> Result<()> {
        let v = self.new_value(v);
        if i == 0 {
            let text = v.string().to_string();
            return self.split_record(&text);
        }
        if self.fields.is_empty() {
            self.fields.push(self.new_value(""));
        }
        while i >= self.fields.len() {
            self.fields.push(self.new_value(""));
        }
        if self.nf < i {
            self.nf = i;
        }
        self.fields[i] = v;
        self.f0_stale = true;
        Ok(())
    }

    /// Change NF directly: a smaller value truncates the field list, a
    /// larger one extends it with empty fields. Field 0 is rebuilt on its
    /// next read.
    pub fn set_nf(&mut self, n: usize) {
        if self.fields.is_empty() {
            self.fields.push(self.new_value(""));
        }
        if self.fields.len() > n + 1 {
            self.fields.truncate(n + 1);
        }
        while self.fields.len() < n + 1 {
            self.fields.push(self.new_value(""));
        }
        self.nf = n;
        self.f0_stale = true;
    }

    /// Fields 1..=NF as integers.
    pub fn field_ints(&self) -> Vec<i64> {
        self.fields.iter().skip(1).take(self.nf).map(Value::int).collect()
    }

    /// Fields 1..=NF as floats.
    pub fn field_floats(&self) -> Vec<f64> {
        self.fields
            .iter()
            .skip(1)
            .take(self.nf)
            .map(Value::float)
            .collect()
    }

    /// Fields 1..=NF as strings.
    pub fn field_strings(&self) -> Vec<String> {
        self.fields
            .iter()
            .skip(1)
            .take(self.nf)
            .map(|v| v.string().to_string())
            .collect()
    }

    fn rebuild_field0(&mut self) {
        self.f0_stale = false;
        if self.fields.is_empty() {
            return;
        }
        let joined = self
            .fields
            .iter()
            .skip(1)
            .take(self.nf)
            .map(|v| v.string().to_string())
            .collect::<Vec<_>>()
            .join(&self.ofs);
        self.fields[0] = self.new_value(joined);
    }
}

fn fixed_width_fields(record: &str, widths: &[usize]) -> Result<Vec<String>> {
    let mut out = Vec::new();
    let mut pos = 0;
    for &w in widths {
        if pos >= record.len() {
            break;
        }
        let end = (pos + w).min(record.len());
        let chunk = record
            .get(pos..end)
            .ok_or_else(|| Error::scan("field width splits a multi-byte character"))?;
        out.push(chunk.to_string());
        pos = end;
    }
    Ok(out)
}
