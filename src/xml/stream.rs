//! Push tokenizer that turns chunked XML into leaf-text events.
//!
//! Response bodies arrive in arbitrary slices: a tag name, an entity or a
//! multi-byte character may be split between two deliveries. [`XmlStream`]
//! buffers only the unfinished tail of the document, hands every complete
//! markup region to `quick-xml`, and reports character data as
//! `(element_path, text)` pairs as soon as it is safe to decode. The text of
//! one element may therefore be reported in several fragments; consumers are
//! expected to concatenate them.
//!
//! Element paths are the local names of the open elements joined with `/`,
//! e.g. `InitiateMultipartUploadResult/UploadId`.

use crate::error::{ResponseError, S3Error};
use quick_xml::escape::unescape;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::trace;

/// Receiver of leaf-text events.
pub trait LeafTextHandler {
    /// Character data found directly inside the element at `path`.
    ///
    /// Returning an error stops the stream; the error is handed back from
    /// [`XmlStream::feed`].
    fn on_leaf_text(&mut self, path: &str, text: &str) -> Result<(), S3Error>;
}

#[derive(Debug)]
struct OpenElement {
    qualified_name: String,
    parent_path_len: usize,
}

#[derive(Debug)]
struct Tree<H> {
    handler: H,
    path: String,
    open: Vec<OpenElement>,
    saw_root: bool,
}

/// Incremental XML tokenizer owning a [`LeafTextHandler`].
#[derive(Debug)]
pub struct XmlStream<H> {
    pending: Vec<u8>,
    tree: Tree<H>,
}

/// What is left once a stream is finished.
#[derive(Debug)]
pub struct StreamEnd<H> {
    /// The handler, with everything it accumulated.
    pub handler: H,
    /// Whether a root element was seen and closed with nothing dangling.
    pub complete: bool,
}

fn parse_error(message: impl Into<String>) -> S3Error {
    ResponseError::XmlParseError {
        message: message.into(),
    }
    .into()
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// End offset (exclusive) of the markup construct opening at `start`, or
/// `None` if more bytes are needed.
fn markup_end(buf: &[u8], start: usize) -> Option<usize> {
    let rest = &buf[start..];
    if rest.len() < 2 {
        return None;
    }

    match rest[1] {
        b'!' => {
            if rest.starts_with(b"<!--") {
                find(buf, b"-->", start + 4).map(|p| p + 3)
            } else if rest.starts_with(b"<![CDATA[") {
                find(buf, b"]]>", start + 9).map(|p| p + 3)
            } else if b"<!--".starts_with(rest) || b"<![CDATA[".starts_with(rest) {
                None
            } else {
                // DOCTYPE, possibly with an internal subset.
                let mut depth = 0usize;
                for (i, &b) in rest.iter().enumerate() {
                    match b {
                        b'[' => depth += 1,
                        b']' => depth = depth.saturating_sub(1),
                        b'>' if depth == 0 => return Some(start + i + 1),
                        _ => {}
                    }
                }
                None
            }
        }
        b'?' => find(buf, b"?>", start + 2).map(|p| p + 2),
        _ => {
            let mut quote = None;
            for (i, &b) in rest.iter().enumerate().skip(1) {
                match (quote, b) {
                    (None, b'"') | (None, b'\'') => quote = Some(b),
                    (Some(q), _) if b == q => quote = None,
                    (None, b'>') => return Some(start + i + 1),
                    _ => {}
                }
            }
            None
        }
    }
}

/// Length of the prefix of an unterminated text run that can be decoded now.
///
/// Stops before a dangling `&` and before a partial UTF-8 sequence.
fn decodable_text_len(text: &[u8]) -> Result<usize, S3Error> {
    let mut end = text.len();
    if let Some(amp) = text.iter().rposition(|&b| b == b'&') {
        if !text[amp..].contains(&b';') {
            end = amp;
        }
    }

    match std::str::from_utf8(&text[..end]) {
        Ok(_) => Ok(end),
        Err(e) if e.error_len().is_none() => Ok(e.valid_up_to()),
        Err(e) => Err(parse_error(format!(
            "invalid UTF-8 in text at byte {}",
            e.valid_up_to()
        ))),
    }
}

impl<H: LeafTextHandler> XmlStream<H> {
    /// Start a stream reporting to `handler`.
    pub fn new(handler: H) -> Self {
        Self {
            pending: Vec::new(),
            tree: Tree {
                handler,
                path: String::new(),
                open: Vec::new(),
                saw_root: false,
            },
        }
    }

    /// Push the next slice of the document.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<(), S3Error> {
        self.pending.extend_from_slice(chunk);
        let consumed = self.tree.consume(&self.pending)?;
        self.pending.drain(..consumed);
        Ok(())
    }

    /// Shared access to the handler.
    pub fn handler(&self) -> &H {
        &self.tree.handler
    }

    /// Bytes buffered while waiting for the rest of a construct.
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }

    /// Current element path.
    pub fn path(&self) -> &str {
        &self.tree.path
    }

    /// End the stream and hand back the handler.
    ///
    /// Anything still buffered belongs to an unfinished construct and is
    /// discarded.
    pub fn finish(self) -> StreamEnd<H> {
        let trailing_whitespace = self.pending.iter().all(u8::is_ascii_whitespace);
        let complete = self.tree.saw_root && self.tree.open.is_empty() && trailing_whitespace;
        if !complete {
            trace!(
                buffered = self.pending.len(),
                depth = self.tree.open.len(),
                "xml stream finished before the document was complete"
            );
        }
        StreamEnd {
            handler: self.tree.handler,
            complete,
        }
    }
}

impl<H: LeafTextHandler> Tree<H> {
    /// Process as much of `buf` as possible, returning the bytes consumed.
    fn consume(&mut self, buf: &[u8]) -> Result<usize, S3Error> {
        let mut pos = 0;
        let mut region_end = 0;
        while pos < buf.len() {
            if buf[pos] == b'<' {
                match markup_end(buf, pos) {
                    Some(end) => {
                        pos = end;
                        region_end = end;
                    }
                    None => break,
                }
            } else {
                match buf[pos..].iter().position(|&b| b == b'<') {
                    Some(offset) => pos += offset,
                    None => break,
                }
            }
        }

        if region_end > 0 {
            self.parse_region(&buf[..region_end])?;
        }

        let tail = &buf[region_end..];
        let (text_len, terminated) = match tail.iter().position(|&b| b == b'<') {
            Some(lt) => (lt, true),
            None => (tail.len(), false),
        };
        let usable = if terminated {
            text_len
        } else {
            decodable_text_len(&tail[..text_len])?
        };
        if usable > 0 {
            let raw = std::str::from_utf8(&tail[..usable])
                .map_err(|e| parse_error(format!("invalid UTF-8 in text: {}", e)))?;
            let text = unescape(raw).map_err(|e| parse_error(e.to_string()))?;
            self.text(&text)?;
        }

        Ok(region_end + usable)
    }

    /// Run `quick-xml` over a region made only of complete constructs.
    ///
    /// The region may close elements opened by earlier regions, so the open
    /// elements are replayed in front of it and their start events skipped.
    fn parse_region(&mut self, region: &[u8]) -> Result<(), S3Error> {
        let region = std::str::from_utf8(region)
            .map_err(|e| parse_error(format!("invalid UTF-8 in markup: {}", e)))?;

        let mut document = String::with_capacity(region.len() + self.open.len() * 16);
        for element in &self.open {
            document.push('<');
            document.push_str(&element.qualified_name);
            document.push('>');
        }
        document.push_str(region);
        let mut replayed = self.open.len();

        let mut reader = Reader::from_str(&document);
        reader.config_mut().trim_text(false);

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    if replayed > 0 {
                        replayed -= 1;
                        continue;
                    }
                    let qualified = std::str::from_utf8(e.name().as_ref())
                        .map_err(|e| parse_error(e.to_string()))?
                        .to_string();
                    let local = std::str::from_utf8(e.local_name().as_ref())
                        .map_err(|e| parse_error(e.to_string()))?
                        .to_string();
                    self.open_element(qualified, &local);
                }
                Ok(Event::Empty(_)) => {
                    self.saw_root = true;
                }
                Ok(Event::End(_)) => {
                    let element = self
                        .open
                        .pop()
                        .ok_or_else(|| parse_error("closing tag without an open element"))?;
                    self.path.truncate(element.parent_path_len);
                }
                Ok(Event::Text(e)) => {
                    let text = e.unescape().map_err(|e| parse_error(e.to_string()))?;
                    self.text(&text)?;
                }
                Ok(Event::CData(e)) => {
                    let inner = e.into_inner();
                    let text = std::str::from_utf8(&inner)
                        .map_err(|e| parse_error(format!("invalid UTF-8 in CDATA: {}", e)))?;
                    self.text(text)?;
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(parse_error(format!(
                        "at position {}: {}",
                        reader.buffer_position(),
                        e
                    )))
                }
            }
        }

        Ok(())
    }

    fn open_element(&mut self, qualified_name: String, local_name: &str) {
        self.saw_root = true;
        let parent_path_len = self.path.len();
        if !self.path.is_empty() {
            self.path.push('/');
        }
        self.path.push_str(local_name);
        self.open.push(OpenElement {
            qualified_name,
            parent_path_len,
        });
    }

    fn text(&mut self, text: &str) -> Result<(), S3Error> {
        if self.open.is_empty() || text.is_empty() {
            return Ok(());
        }
        self.handler.on_leaf_text(&self.path, text)
    }
}
