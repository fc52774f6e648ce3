use std::io::{Read, Write};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::thread;

use crate::error::{Error, Result};
use crate::script::Script;

/// Buffered chunks in flight between two pipeline stages.
const CONDUIT_DEPTH: usize = 32;

/// The write end of an in-memory byte conduit between two pipeline stages.
/// Dropping it signals end-of-input downstream. Writes after the reader
/// has gone away are discarded, so a downstream stage that exits early
/// quietly ends the pipe.
struct ConduitWriter {
    tx: SyncSender<Vec<u8>>,
}

impl Write for ConduitWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let _ = self.tx.send(buf.to_vec());
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// The read end of a conduit; yields chunks in emission order and reports
/// EOF once the writer is dropped.
struct ConduitReader {
    rx: Receiver<Vec<u8>>,
    chunk: Vec<u8>,
    pos: usize,
}

impl Read for ConduitReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        while self.pos >= self.chunk.len() {
            match self.rx.recv() {
                Ok(chunk) => {
                    self.chunk = chunk;
                    self.pos = 0;
                }
                Err(_) => return Ok(0),
            }
        }
        let n = (self.chunk.len() - self.pos).min(buf.len());
        buf[..n].copy_from_slice(&self.chunk[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

fn conduit() -> (ConduitWriter, ConduitReader) {
    let (tx, rx) = sync_channel(CONDUIT_DEPTH);
    (
        ConduitWriter { tx },
        ConduitReader {
            rx,
            chunk: Vec::new(),
            pos: 0,
        },
    )
}

/// Run several scripts as a pipeline: the reader feeds the first script,
/// each script's output feeds the next, and the final script writes to its
/// own configured sink.
///
/// Every script runs on its own thread; records emitted by one stage reach
/// the next in emission order. The first error in pipeline order is
/// returned. Intermediate scripts have their sinks temporarily replaced by
/// conduits and restored when their stage completes.
pub fn run_pipeline<R: Read + Send + 'static>(input: R, scripts: &mut [&mut Script]) -> Result<()> {
    match scripts.len() {
        0 => Ok(()),
        1 => scripts[0].run(input),
        n => {
            let mut inputs: Vec<Box<dyn Read + Send>> = Vec::with_capacity(n);
            let mut restores: Vec<Option<Box<dyn Write + Send>>> = Vec::with_capacity(n);
            inputs.push(Box::new(input));
            for script in scripts.iter_mut().take(n - 1) {
                let (writer, reader) = conduit();
                restores.push(Some(script.replace_output(Box::new(writer))));
                inputs.push(Box::new(reader));
            }
            restores.push(None);

            let results: Vec<Result<()>> = thread::scope(|scope| {
                let handles: Vec<_> = scripts
                    .iter_mut()
                    .zip(inputs)
                    .zip(restores)
                    .map(|((script, stage_input), restore)| {
                        scope.spawn(move || {
                            let result = script.run(stage_input);
                            // Dropping the conduit writer here is what lets
                            // the next stage see EOF.
                            if let Some(original) = restore {
                                script.replace_output(original);
                            }
                            result
                        })
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|h| {
                        h.join()
                            .unwrap_or_else(|_| Err(Error::scan("pipeline stage panicked")))
                    })
                    .collect()
            });

            for result in results {
                result?;
            }
            Ok(())
        }
    }
}
