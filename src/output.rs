use std::collections::BTreeMap;
use std::io::{self, Write};

use camino::Utf8Path;
use serde::Serialize;

use crate::assemble::Graph;
use crate::domain::{CanonicalId, DisplayMetadata};
use crate::error::KiraError;
use crate::fs_util::write_atomic;
use crate::progress::{ProgressEstimate, ProgressSink};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_graph(graph: &Graph) -> io::Result<()> {
        Self::print_json(graph)
    }

    pub fn print_metadata(metadata: &BTreeMap<CanonicalId, DisplayMetadata>) -> io::Result<()> {
        Self::print_json(metadata)
    }

    pub fn write_file<T: Serialize>(value: &T, path: &Utf8Path) -> Result<(), KiraError> {
        let json = serde_json::to_vec_pretty(value)
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        write_atomic(path, &json)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _estimate: ProgressEstimate) {}
}

#[derive(Default)]
pub struct StderrProgress {
    last: std::cell::RefCell<Option<(String, u32)>>,
}

impl ProgressSink for StderrProgress {
    fn event(&self, estimate: ProgressEstimate) {
        let whole = estimate.percent.floor() as u32;
        let key = (estimate.message.clone(), whole);
        let mut last = self.last.borrow_mut();
        if last.as_ref() == Some(&key) {
            return;
        }
        eprintln!(
            "[{whole:>3}%] {} ({}/{})",
            estimate.message, estimate.completed, estimate.total
        );
        *last = Some(key);
    }
}
