//! The I/O layer (§4.11): keyed registries for output files, output
//! pipes, input files, input pipes, and bidirectional coprocesses, plus
//! the RS-aware record reader used by both the main input loop and
//! `getline`.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use crate::error::RuntimeError;
use crate::regex_cache::RegexCache;

/// Reads records out of any byte source according to the current RS
/// (§4.7): a single character splits literally, a longer string is an
/// ERE whose matched text is reported back as RT, and an empty RS
/// switches to paragraph mode.
pub struct RecordReader<R: Read> {
    source: R,
    buf: String,
    eof: bool,
}

fn io_err(e: io::Error) -> RuntimeError {
    RuntimeError::Other(format!("i/o error: {e}"))
}

impl<R: Read> RecordReader<R> {
    pub fn new(source: R) -> Self {
        RecordReader {
            source,
            buf: String::new(),
            eof: false,
        }
    }

    fn fill_more(&mut self) -> Result<bool, RuntimeError> {
        if self.eof {
            return Ok(false);
        }
        let mut chunk = [0u8; 8192];
        let n = self.source.read(&mut chunk).map_err(io_err)?;
        if n == 0 {
            self.eof = true;
            return Ok(false);
        }
        self.buf.push_str(&String::from_utf8_lossy(&chunk[..n]));
        Ok(true)
    }

    /// Returns `(record, RT)`, or `None` at end of input.
    pub fn next_record(
        &mut self,
        rs: &str,
        cache: &mut RegexCache,
        ignorecase: bool,
    ) -> Result<Option<(String, String)>, RuntimeError> {
        if rs.is_empty() {
            return self.next_paragraph();
        }
        if rs.chars().count() == 1 {
            let sep = rs.chars().next().unwrap();
            loop {
                if let Some(pos) = self.buf.find(sep) {
                    let rec: String = self.buf.drain(..pos).collect();
                    self.buf.drain(..sep.len_utf8());
                    return Ok(Some((rec, sep.to_string())));
                }
                if !self.fill_more()? {
                    if self.buf.is_empty() {
                        return Ok(None);
                    }
                    let rec = std::mem::take(&mut self.buf);
                    return Ok(Some((rec, String::new())));
                }
            }
        }
        let re = cache.get_or_compile(rs, ignorecase)?;
        loop {
            if let Some(m) = re.find(&self.buf) {
                if self.eof || m.end() < self.buf.len() {
                    let start = m.start();
                    let end = m.end();
                    let rt = self.buf[start..end].to_string();
                    let rec: String = self.buf.drain(..start).collect();
                    self.buf.drain(..rt.len());
                    return Ok(Some((rec, rt)));
                }
            }
            if !self.fill_more()? {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                let rec = std::mem::take(&mut self.buf);
                return Ok(Some((rec, String::new())));
            }
        }
    }

    fn next_paragraph(&mut self) -> Result<Option<(String, String)>, RuntimeError> {
        loop {
            let lead = self.buf.chars().take_while(|&c| c == '\n').count();
            if lead < self.buf.chars().count() || self.eof {
                self.buf.drain(..lead);
                break;
            }
            if !self.fill_more()? {
                self.buf.clear();
                return Ok(None);
            }
        }
        if self.buf.is_empty() && self.eof {
            return Ok(None);
        }
        loop {
            if let Some(pos) = self.buf.find("\n\n") {
                let rec: String = self.buf.drain(..pos).collect();
                let rest = self.buf.clone();
                let sep_len = rest.chars().take_while(|&c| c == '\n').count();
                let rt: String = rest.chars().take(sep_len).collect();
                self.buf.drain(..rt.len());
                return Ok(Some((rec, rt)));
            }
            if !self.fill_more()? {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                let rec = std::mem::take(&mut self.buf);
                let rec = rec.trim_end_matches('\n').to_string();
                return Ok(Some((rec, String::new())));
            }
        }
    }
}

/// An open output target: a plain file or the write end of a pipe.
enum OutputHandle {
    File(BufWriter<File>),
    Pipe { child: Child, stdin: BufWriter<ChildStdin> },
}

impl OutputHandle {
    fn writer(&mut self) -> &mut dyn Write {
        match self {
            OutputHandle::File(w) => w,
            OutputHandle::Pipe { stdin, .. } => stdin,
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer().flush()
    }
}

/// An open input target: a plain file or the read end of a pipe.
enum InputHandle {
    File(RecordReader<File>),
    Pipe { child: Child, reader: RecordReader<ChildStdout> },
}

/// A bidirectional coprocess (`cmd |& getline` / `print |& cmd`): one
/// write end and one read end to the same child (§4.11, §5).
struct Coprocess {
    child: Child,
    stdin: BufWriter<ChildStdin>,
    reader: RecordReader<ChildStdout>,
}

/// The four-plus-one keyed registries, all keyed by the path/command
/// string exactly as written in the program.
#[derive(Default)]
pub struct IoRegistries {
    outputs: HashMap<String, OutputHandle>,
    inputs: HashMap<String, InputHandle>,
    coprocesses: HashMap<String, Coprocess>,
}

impl IoRegistries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or reuse) an output file for `print .. > name` / `>>
    /// name`. Truncation only happens on the *first* open of a given
    /// name within the program's lifetime (§4.11).
    pub fn ensure_output_file(&mut self, name: &str, append: bool) -> Result<(), RuntimeError> {
        if self.outputs.contains_key(name) {
            return Ok(());
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(name)
            .map_err(|_| RuntimeError::CannotOpenFile(name.to_string()))?;
        self.outputs
            .insert(name.to_string(), OutputHandle::File(BufWriter::new(file)));
        Ok(())
    }

    pub fn ensure_output_pipe(&mut self, cmd: &str) -> Result<(), RuntimeError> {
        if self.outputs.contains_key(cmd) {
            return Ok(());
        }
        let mut child = spawn_shell(cmd, Stdio::piped(), Stdio::inherit())?;
        let stdin = child.stdin.take().expect("piped stdin");
        self.outputs.insert(
            cmd.to_string(),
            OutputHandle::Pipe { child, stdin: BufWriter::new(stdin) },
        );
        Ok(())
    }

    pub fn write_to(&mut self, name: &str, data: &str) -> Result<(), RuntimeError> {
        let handle = self
            .outputs
            .get_mut(name)
            .ok_or_else(|| RuntimeError::Other(format!("`{name}` is not open for writing")))?;
        handle
            .writer()
            .write_all(data.as_bytes())
            .map_err(|_| RuntimeError::BrokenPipe(name.to_string()))
    }

    pub fn ensure_input_file(&mut self, name: &str) -> Result<(), RuntimeError> {
        if self.inputs.contains_key(name) {
            return Ok(());
        }
        let file = File::open(name).map_err(|_| RuntimeError::CannotOpenFile(name.to_string()))?;
        self.inputs
            .insert(name.to_string(), InputHandle::File(RecordReader::new(file)));
        Ok(())
    }

    pub fn ensure_input_pipe(&mut self, cmd: &str) -> Result<(), RuntimeError> {
        if self.inputs.contains_key(cmd) {
            return Ok(());
        }
        let mut child = spawn_shell(cmd, Stdio::inherit(), Stdio::piped())?;
        let stdout = child.stdout.take().expect("piped stdout");
        self.inputs.insert(
            cmd.to_string(),
            InputHandle::Pipe { child, reader: RecordReader::new(stdout) },
        );
        Ok(())
    }

    pub fn ensure_coprocess(&mut self, cmd: &str) -> Result<(), RuntimeError> {
        if self.coprocesses.contains_key(cmd) {
            return Ok(());
        }
        let mut child = spawn_shell(cmd, Stdio::piped(), Stdio::piped())?;
        let stdin = child.stdin.take().expect("piped stdin");
        let stdout = child.stdout.take().expect("piped stdout");
        self.coprocesses.insert(
            cmd.to_string(),
            Coprocess {
                child,
                stdin: BufWriter::new(stdin),
                reader: RecordReader::new(stdout),
            },
        );
        Ok(())
    }

    pub fn write_to_coprocess(&mut self, cmd: &str, data: &str) -> Result<(), RuntimeError> {
        let co = self
            .coprocesses
            .get_mut(cmd)
            .ok_or_else(|| RuntimeError::Other(format!("`{cmd}` is not an open coprocess")))?;
        co.stdin
            .write_all(data.as_bytes())
            .map_err(|_| RuntimeError::BrokenPipe(cmd.to_string()))
    }

    pub fn read_record_from(
        &mut self,
        name: &str,
        rs: &str,
        cache: &mut RegexCache,
        ignorecase: bool,
    ) -> Result<Option<(String, String)>, RuntimeError> {
        match self.inputs.get_mut(name) {
            Some(InputHandle::File(r)) => r.next_record(rs, cache, ignorecase),
            Some(InputHandle::Pipe { reader, .. }) => reader.next_record(rs, cache, ignorecase),
            None => Err(RuntimeError::Other(format!("`{name}` is not open for reading"))),
        }
    }

    pub fn read_record_from_coprocess(
        &mut self,
        cmd: &str,
        rs: &str,
        cache: &mut RegexCache,
        ignorecase: bool,
    ) -> Result<Option<(String, String)>, RuntimeError> {
        let co = self
            .coprocesses
            .get_mut(cmd)
            .ok_or_else(|| RuntimeError::Other(format!("`{cmd}` is not an open coprocess")))?;
        co.reader.next_record(rs, cache, ignorecase)
    }

    /// `close(name)`: searches every registry, closes and removes a
    /// match. Returns the POSIX-style status: `0` for a plain file,
    /// the child's exit status for a pipe/coprocess, `-1` if nothing
    /// by that name was open.
    pub fn close(&mut self, name: &str) -> i32 {
        if let Some(handle) = self.outputs.remove(name) {
            return match handle {
                OutputHandle::File(mut w) => {
                    let _ = w.flush();
                    0
                }
                OutputHandle::Pipe { mut child, stdin } => {
                    drop(stdin);
                    wait_status(&mut child)
                }
            };
        }
        if let Some(handle) = self.inputs.remove(name) {
            return match handle {
                InputHandle::File(_) => 0,
                InputHandle::Pipe { mut child, .. } => wait_status(&mut child),
            };
        }
        if let Some(mut co) = self.coprocesses.remove(name) {
            let _ = co.stdin.flush();
            drop(co.stdin);
            return wait_status(&mut co.child);
        }
        -1
    }

    /// `fflush([name])`: with no name, flushes every output file, pipe
    /// and coprocess write end; with a name, only that one. Returns 0
    /// on success, -1 if the named target is not open.
    pub fn fflush(&mut self, name: Option<&str>) -> i32 {
        match name {
            None => {
                let mut ok = true;
                for handle in self.outputs.values_mut() {
                    if handle.flush().is_err() {
                        ok = false;
                    }
                }
                for co in self.coprocesses.values_mut() {
                    if co.stdin.flush().is_err() {
                        ok = false;
                    }
                }
                if ok {
                    0
                } else {
                    -1
                }
            }
            Some(n) => {
                if let Some(handle) = self.outputs.get_mut(n) {
                    return if handle.flush().is_ok() { 0 } else { -1 };
                }
                if let Some(co) = self.coprocesses.get_mut(n) {
                    return if co.stdin.flush().is_ok() { 0 } else { -1 };
                }
                -1
            }
        }
    }

    /// Close every open handle and reap every spawned child, as done
    /// on normal interpreter termination (§4.11, §5).
    pub fn close_all(&mut self) {
        let names: Vec<String> = self
            .outputs
            .keys()
            .chain(self.inputs.keys())
            .chain(self.coprocesses.keys())
            .cloned()
            .collect();
        for name in names {
            self.close(&name);
        }
    }
}

fn wait_status(child: &mut Child) -> i32 {
    match child.wait() {
        Ok(status) => {
            let code = status.code().unwrap_or(-1);
            tracing::trace!(pid = child.id(), code, "reaped child process");
            code
        }
        Err(e) => {
            tracing::debug!(pid = child.id(), error = %e, "failed to reap child process");
            -1
        }
    }
}

fn spawn_shell(cmd: &str, stdin: Stdio, stdout: Stdio) -> Result<Child, RuntimeError> {
    let child = Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .stdin(stdin)
        .stdout(stdout)
        .spawn()
        .map_err(|e| {
            tracing::debug!(cmd, error = %e, "failed to spawn child process");
            RuntimeError::CannotSpawn(cmd.to_string())
        })?;
    tracing::trace!(cmd, pid = child.id(), "spawned child process");
    Ok(child)
}

/// `system(cmd)`: run synchronously to completion, inheriting the
/// program's stdio, and return its exit status.
pub fn system(cmd: &str) -> Result<i32, RuntimeError> {
    let status = Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .status()
        .map_err(|_| RuntimeError::CannotSpawn(cmd.to_string()))?;
    Ok(status.code().unwrap_or(-1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_reader_splits_on_single_char_rs() {
        let data = b"a;b;c".to_vec();
        let mut reader = RecordReader::new(&data[..]);
        let mut cache = RegexCache::new();
        let (r1, rt1) = reader.next_record(";", &mut cache, false).unwrap().unwrap();
        assert_eq!(r1, "a");
        assert_eq!(rt1, ";");
        let (r2, _) = reader.next_record(";", &mut cache, false).unwrap().unwrap();
        assert_eq!(r2, "b");
        let (r3, rt3) = reader.next_record(";", &mut cache, false).unwrap().unwrap();
        assert_eq!(r3, "c");
        assert_eq!(rt3, "");
        assert!(reader.next_record(";", &mut cache, false).unwrap().is_none());
    }

    #[test]
    fn record_reader_regex_rs_reports_rt() {
        let data = b"oneXXtwoXXXthree".to_vec();
        let mut reader = RecordReader::new(&data[..]);
        let mut cache = RegexCache::new();
        let (r1, rt1) = reader.next_record("X+", &mut cache, false).unwrap().unwrap();
        assert_eq!(r1, "one");
        assert_eq!(rt1, "XX");
        let (r2, rt2) = reader.next_record("X+", &mut cache, false).unwrap().unwrap();
        assert_eq!(r2, "two");
        assert_eq!(rt2, "XXX");
        let (r3, _) = reader.next_record("X+", &mut cache, false).unwrap().unwrap();
        assert_eq!(r3, "three");
    }

    #[test]
    fn paragraph_mode_splits_on_blank_lines() {
        let data = b"one\ntwo\n\n\nthree\n".to_vec();
        let mut reader = RecordReader::new(&data[..]);
        let mut cache = RegexCache::new();
        let (r1, _) = reader.next_record("", &mut cache, false).unwrap().unwrap();
        assert_eq!(r1, "one\ntwo");
        let (r2, _) = reader.next_record("", &mut cache, false).unwrap().unwrap();
        assert_eq!(r2, "three");
        assert!(reader.next_record("", &mut cache, false).unwrap().is_none());
    }

    #[test]
    fn close_unknown_target_returns_minus_one() {
        let mut io = IoRegistries::new();
        assert_eq!(io.close("nope"), -1);
    }
}
