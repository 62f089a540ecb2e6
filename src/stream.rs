//! Single-pass entity iterator over a REGINFO XML document.
//!
//! Only the entity currently being read is materialized as an [`Element`]
//! tree; everything outside entity boundaries is skipped as it streams by,
//! so peak memory follows the largest entity rather than the document.

use crate::error::{Error, Result};
use crate::normalize::decode_entities;
use crate::tree::{local_name, Element};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::warn;

/// Give up on a document after this many recovered syntax errors
const MAX_RECOVERED_ERRORS: usize = 1_000;

/// How syntax errors in a document are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// An end tag closes the nearest open element of the same name, folding
    /// any unclosed children into it; syntax errors are logged and skipped
    Recover,
    /// Any syntax error is a `MalformedDocument` error
    Strict,
}

impl From<&str> for ParseMode {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "strict" => ParseMode::Strict,
            _ => ParseMode::Recover,
        }
    }
}

/// Lazy, non-restartable sequence of entity root elements
pub struct EntityStream<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    source_name: String,
    entity_tag: String,
    mode: ParseMode,
    open: Vec<Element>,
    done: bool,
    recovered_errors: usize,
    last_error_position: Option<u64>,
}

impl EntityStream<BufReader<File>> {
    /// Open a document on disk
    pub fn from_path(path: &Path, entity_tag: &str, mode: ParseMode) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::SourceNotFound(path.to_path_buf()));
        }
        let file = File::open(path)?;
        let source_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(BufReader::new(file), source_name, entity_tag, mode))
    }
}

impl<R: BufRead> EntityStream<R> {
    pub fn new(reader: R, source_name: impl Into<String>, entity_tag: &str, mode: ParseMode) -> Self {
        let mut reader = Reader::from_reader(reader);
        let config = reader.config_mut();
        config.check_end_names = mode == ParseMode::Strict;
        config.allow_unmatched_ends = mode == ParseMode::Recover;
        config.expand_empty_elements = false;

        Self {
            reader,
            buf: Vec::new(),
            source_name: source_name.into(),
            entity_tag: entity_tag.to_string(),
            mode,
            open: Vec::new(),
            done: false,
            recovered_errors: 0,
            last_error_position: None,
        }
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Nodes currently held for a partially read entity. Zero between yields.
    pub fn retained_nodes(&self) -> usize {
        self.open.iter().map(Element::node_count).sum()
    }

    /// Syntax errors skipped in recover mode so far
    pub fn recovered_errors(&self) -> usize {
        self.recovered_errors
    }

    fn next_entity(&mut self) -> Result<Option<Element>> {
        loop {
            self.buf.clear();
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(event) => event,
                Err(err) => {
                    let position = self.reader.buffer_position() as u64;
                    let reason = err.to_string();
                    match self.mode {
                        ParseMode::Strict => {
                            self.done = true;
                            self.open.clear();
                            return Err(Error::MalformedDocument {
                                source_name: self.source_name.clone(),
                                position,
                                reason,
                            });
                        }
                        ParseMode::Recover => {
                            self.recovered_errors += 1;
                            warn!(
                                source = %self.source_name,
                                position,
                                "Skipping XML syntax error: {}",
                                reason
                            );
                            // No progress since the last error means the reader is stuck
                            if self.last_error_position == Some(position)
                                || self.recovered_errors >= MAX_RECOVERED_ERRORS
                            {
                                self.done = true;
                                return Ok(self.close_open_entity());
                            }
                            self.last_error_position = Some(position);
                            continue;
                        }
                    }
                }
            };

            match event {
                Event::Start(start) => {
                    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                    if self.open.is_empty() && local_name(&name) != self.entity_tag {
                        continue;
                    }
                    self.open.push(Element::new(name));
                }
                Event::Empty(empty) => {
                    let name = String::from_utf8_lossy(empty.name().as_ref()).into_owned();
                    match self.open.last_mut() {
                        Some(parent) => parent.children.push(Element::new(name)),
                        None if local_name(&name) == self.entity_tag => {
                            return Ok(Some(Element::new(name)));
                        }
                        None => {}
                    }
                }
                Event::Text(text) => {
                    if let Some(current) = self.open.last_mut() {
                        current
                            .text
                            .push_str(&decode_entities(&String::from_utf8_lossy(&text)));
                    }
                }
                Event::CData(cdata) => {
                    if let Some(current) = self.open.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&cdata));
                    }
                }
                Event::End(end) => {
                    if self.open.is_empty() {
                        continue;
                    }
                    let name = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                    let tag = local_name(&name);
                    let Some(depth) = self.open.iter().rposition(|e| e.local_name() == tag) else {
                        self.recovered_errors += 1;
                        warn!(source = %self.source_name, "Ignoring unmatched </{}>", name);
                        continue;
                    };
                    if depth + 1 < self.open.len() {
                        self.recovered_errors += 1;
                        warn!(
                            source = %self.source_name,
                            unclosed = self.open.len() - depth - 1,
                            "Closing unclosed elements at </{}>",
                            name
                        );
                        self.fold_open_into(depth);
                    }
                    if let Some(finished) = self.open.pop() {
                        match self.open.last_mut() {
                            Some(parent) => parent.children.push(finished),
                            None => return Ok(Some(finished)),
                        }
                    }
                }
                Event::Eof => {
                    self.done = true;
                    if self.open.is_empty() {
                        return Ok(None);
                    }
                    return match self.mode {
                        ParseMode::Strict => {
                            self.open.clear();
                            Err(Error::MalformedDocument {
                                source_name: self.source_name.clone(),
                                position: self.reader.buffer_position() as u64,
                                reason: format!("document ended inside <{}>", self.entity_tag),
                            })
                        }
                        ParseMode::Recover => {
                            self.recovered_errors += 1;
                            warn!(
                                source = %self.source_name,
                                "Document ended inside <{}>; keeping the partial entity",
                                self.entity_tag
                            );
                            Ok(self.close_open_entity())
                        }
                    };
                }
                _ => {}
            }
        }
    }

    /// Fold every open element above `depth` into its parent
    fn fold_open_into(&mut self, depth: usize) {
        while self.open.len() > depth + 1 {
            if let Some(child) = self.open.pop() {
                if let Some(parent) = self.open.last_mut() {
                    parent.children.push(child);
                }
            }
        }
    }

    /// Fold any still-open elements into their parents and hand back the entity root
    fn close_open_entity(&mut self) -> Option<Element> {
        self.fold_open_into(0);
        self.open.pop()
    }
}

impl<R: BufRead> Iterator for EntityStream<R> {
    type Item = Result<Element>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        self.next_entity().transpose()
    }
}
