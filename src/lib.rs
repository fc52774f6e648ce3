//! awkit - an embeddable, AWK-style record processor
//!
//! This crate splits a byte stream into records and fields the way AWK
//! does and evaluates an ordered list of pattern/action rules against each
//! record. There is no AWK language here: patterns and actions are plain
//! Rust closures, and the weakly typed [`Value`] carries AWK's
//! read-as-anything semantics.
//!
//! # Example
//!
//! ```
//! use awkit::{MemSink, Script};
//!
//! // Print every record whose text matches a pattern.
//! let mut script = Script::new();
//! let sink = MemSink::new();
//! script.set_output(sink.clone());
//! script
//!     .append_rule(Some(awkit::auto!("error").unwrap()), None)
//!     .unwrap();
//!
//! script
//!     .run("info: ok\nerror: failed\ninfo: done\n".as_bytes())
//!     .unwrap();
//! assert_eq!(sink.contents(), "error: failed\n");
//! ```
//!
//! # Summing a column
//!
//! ```
//! use std::sync::{Arc, Mutex};
//!
//! use awkit::{Action, Script};
//!
//! let total = Arc::new(Mutex::new(0));
//! let mut script = Script::new();
//! let sum = Arc::clone(&total);
//! script
//!     .append_rule(
//!         None,
//!         Some(Action::new(move |s| {
//!             *sum.lock().unwrap() += s.field(1).int();
//!             Ok(())
//!         })),
//!     )
//!     .unwrap();
//!
//! script.run("2 x\n4 y\n6 z\n".as_bytes()).unwrap();
//! assert_eq!(*total.lock().unwrap(), 12);
//! ```
//!
//! # Rewriting fields
//!
//! ```
//! use awkit::{Action, MemSink, Script};
//!
//! let mut script = Script::new();
//! let sink = MemSink::new();
//! script.set_output(sink.clone());
//! script.set_begin(|s| {
//!     s.set_fs(",");
//!     s.set_ofs(" | ");
//!     Ok(())
//! });
//! script
//!     .append_rule(
//!         None,
//!         Some(Action::new(|s| {
//!             s.set_field(2, "?")?;
//!             let record = s.field(0);
//!             s.println(&[record])
//!         })),
//!     )
//!     .unwrap();
//!
//! script.run("a,b,c\n".as_bytes()).unwrap();
//! assert_eq!(sink.contents(), "a | ? | c\n");
//! ```

pub mod error;
pub mod pattern;

mod array;
mod core;
mod field;
mod output;
mod pipeline;
mod record;
mod script;
mod value;

pub use array::ValueArray;
pub use error::{Error, Result};
pub use output::MemSink;
pub use pattern::{always, auto, range, Action, AutoArg, Pattern};
pub use pipeline::run_pipeline;
pub use script::Script;
pub use value::{Scalar, Value};
