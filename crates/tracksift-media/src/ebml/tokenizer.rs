//! Streaming EBML tokenizer.
//!
//! Bytes arrive in chunks of any size through [`Tokenizer::feed`]; events are
//! pulled with [`Tokenizer::next_event`]. Master elements produce `Start` and
//! `End` events around their children and are never buffered. Leaf elements
//! are buffered until complete and delivered with their payload. An element
//! split across chunk boundaries stays in the internal buffer until the rest
//! of it arrives, so the event sequence does not depend on chunk sizes.

use super::{read_element_id, read_vint, vint_length, ElementId, ElementKind, MAX_ID_LENGTH};
use crate::{Error, Result};
use bytes::{Bytes, BytesMut};

/// Largest leaf payload buffered by default (64 MB).
pub const DEFAULT_MAX_ELEMENT_SIZE: u64 = 64 * 1024 * 1024;

/// An element as seen by the tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Element ID.
    pub id: ElementId,
    /// Declared payload size, `None` for unknown-size masters.
    pub size: Option<u64>,
    /// Absolute stream offset of the element header.
    pub offset: u64,
    /// Nesting depth, 0 for top-level elements.
    pub depth: usize,
}

impl Element {
    /// Semantic element name.
    pub fn name(&self) -> &'static str {
        self.id.name()
    }

    /// Payload kind.
    pub fn kind(&self) -> ElementKind {
        self.id.kind()
    }
}

/// A structural event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A master element was opened.
    Start(Element),
    /// A leaf element was read in full.
    Leaf(Element, Bytes),
    /// A master element was closed.
    End(Element),
}

impl Event {
    /// The element this event refers to.
    pub fn element(&self) -> &Element {
        match self {
            Self::Start(element) | Self::Leaf(element, _) | Self::End(element) => element,
        }
    }
}

#[derive(Debug)]
struct OpenMaster {
    element: Element,
    /// Absolute end offset, `None` for unknown size.
    end: Option<u64>,
}

#[derive(Debug)]
struct Header {
    id: ElementId,
    size: Option<u64>,
    length: usize,
}

/// Incremental EBML tokenizer.
///
/// Single forward pass: once an error is returned the tokenizer must be
/// discarded.
#[derive(Debug)]
pub struct Tokenizer {
    buffer: BytesMut,
    /// Absolute stream offset of `buffer[0]`.
    position: u64,
    stack: Vec<OpenMaster>,
    max_element_size: u64,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer {
    /// Create a tokenizer with the default leaf size limit.
    pub fn new() -> Self {
        Self::with_max_element_size(DEFAULT_MAX_ELEMENT_SIZE)
    }

    /// Create a tokenizer that rejects leaves larger than `max_element_size`.
    pub fn with_max_element_size(max_element_size: u64) -> Self {
        Self {
            buffer: BytesMut::new(),
            position: 0,
            stack: Vec::new(),
            max_element_size,
        }
    }

    /// Append a chunk of input.
    pub fn feed(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Absolute offset of the next unconsumed byte.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Bytes held back waiting for the rest of an element.
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Pull the next event.
    ///
    /// Returns `Ok(None)` when more input is needed.
    pub fn next_event(&mut self) -> Result<Option<Event>> {
        if let Some(event) = self.close_finished_master() {
            return Ok(Some(event));
        }

        let Some(header) = self.peek_header()? else {
            return Ok(None);
        };

        // An unknown-size master ends where a non-child element begins.
        if let Some(open) = self.stack.last() {
            if open.end.is_none() && !header.id.may_appear_in(open.element.id) {
                if let Some(open) = self.stack.pop() {
                    return Ok(Some(Event::End(open.element)));
                }
            }
        }

        let data_start = self.position + header.length as u64;
        let end = match header.size {
            Some(size) => Some(data_start.checked_add(size).ok_or_else(|| {
                Error::decode(self.position, format!("{} size overflows", header.id))
            })?),
            None => None,
        };

        if let (Some(end), Some(boundary)) = (end, self.boundary()) {
            if end > boundary {
                return Err(Error::decode(
                    self.position,
                    format!(
                        "{} ends at byte {} past its parent's end at {}",
                        header.id, end, boundary
                    ),
                ));
            }
        }

        let element = Element {
            id: header.id,
            size: header.size,
            offset: self.position,
            depth: self.stack.len(),
        };

        if header.id.is_master() {
            self.consume(header.length);
            self.stack.push(OpenMaster {
                element: element.clone(),
                end,
            });
            return Ok(Some(Event::Start(element)));
        }

        let Some(size) = header.size else {
            return Err(Error::decode(
                self.position,
                format!("{} has unknown size but is not a master", header.id),
            ));
        };

        if size > self.max_element_size {
            return Err(Error::decode(
                self.position,
                format!(
                    "{} payload of {} bytes exceeds maximum {}",
                    header.id, size, self.max_element_size
                ),
            ));
        }

        let total = header.length + size as usize;
        if self.buffer.len() < total {
            self.buffer.reserve(total - self.buffer.len());
            return Ok(None);
        }

        self.consume(header.length);
        let data = self.buffer.split_to(size as usize).freeze();
        self.position += size;

        Ok(Some(Event::Leaf(element, data)))
    }

    /// Signal end of input.
    ///
    /// Drains any remaining events and closes unknown-size masters. Fails if
    /// the input stopped inside an element.
    pub fn finish(&mut self) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event()? {
            events.push(event);
        }

        if !self.buffer.is_empty() {
            return Err(Error::decode(
                self.position,
                format!(
                    "stream ended inside an element ({} bytes pending)",
                    self.buffer.len()
                ),
            ));
        }

        while let Some(open) = self.stack.pop() {
            match open.end {
                Some(end) if end > self.position => {
                    return Err(Error::decode(
                        self.position,
                        format!(
                            "stream ended inside {} ({} bytes missing)",
                            open.element.id,
                            end - self.position
                        ),
                    ));
                }
                _ => events.push(Event::End(open.element)),
            }
        }

        Ok(events)
    }

    /// Nearest known end offset among the open masters.
    fn boundary(&self) -> Option<u64> {
        self.stack.iter().rev().find_map(|open| open.end)
    }

    /// Close the innermost master if the nearest known boundary was reached.
    fn close_finished_master(&mut self) -> Option<Event> {
        let boundary = self.boundary()?;
        if self.position < boundary {
            return None;
        }
        self.stack.pop().map(|open| Event::End(open.element))
    }

    fn peek_header(&self) -> Result<Option<Header>> {
        let Some(&first) = self.buffer.first() else {
            return Ok(None);
        };

        let id_length = match vint_length(first) {
            Some(length) if length <= MAX_ID_LENGTH => length,
            _ => {
                return Err(Error::decode(
                    self.position,
                    format!("invalid element ID lead byte 0x{:02X}", first),
                ));
            }
        };

        if self.buffer.len() <= id_length {
            return Ok(None);
        }

        let size_first = self.buffer[id_length];
        let size_length = vint_length(size_first).ok_or_else(|| {
            Error::decode(
                self.position + id_length as u64,
                "invalid element size lead byte 0x00",
            )
        })?;

        if self.buffer.len() < id_length + size_length {
            return Ok(None);
        }

        let (Some((id, _)), Some(size)) = (
            read_element_id(&self.buffer),
            read_vint(&self.buffer[id_length..]),
        ) else {
            return Ok(None);
        };

        Ok(Some(Header {
            id: ElementId(id),
            size: (!size.is_unknown()).then_some(size.value),
            length: id_length + size_length,
        }))
    }

    fn consume(&mut self, count: usize) {
        let _ = self.buffer.split_to(count);
        self.position += count as u64;
    }
}
