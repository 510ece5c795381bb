//! Streaming JSON decoder: transport bytes in, bounded compacted text out.

use heapless::Vec;

use crate::network::Read;

use super::document::Document;
use super::error::Error;
use super::filter::{Filter, Node};

/// Nesting limit for containers, matching common embedded JSON stacks.
const MAX_DEPTH: u8 = 10;
/// Longest object key the decoder will buffer for filter matching.
const MAX_KEY_LEN: usize = 64;

/// Decode one JSON value from `reader` into a document bounded by `N` bytes.
///
/// The parse is single-pass: bytes are pulled from the transport as they are
/// needed and kept bytes are appended, compacted, to the document buffer.
/// When `filter` is given, excluded subtrees are validated and discarded
/// without ever being stored, so `N` only needs to cover the kept fields.
///
/// The reader is left positioned just past the decoded value; the caller
/// owns closing the transport.
pub fn decode_from<R: Read, const N: usize>(
    reader: &mut R,
    filter: Option<&Filter<'_>>,
) -> Result<Document<N>, Error> {
    let mut src = Source::new(reader);
    let mut buf: Vec<u8, N> = Vec::new();
    let root = match filter {
        Some(f) => f.root(),
        None => Node::KeepAll,
    };

    if src.peek_non_ws()?.is_none() {
        return Err(Error::EmptyInput);
    }
    if root.is_skip() {
        // A filter that keeps nothing still has to consume a valid body.
        skim_value(&mut src, 0)?;
        emit_all(&mut buf, b"null")?;
    } else {
        parse_value(&mut src, &mut buf, root, 0)?;
    }
    Ok(Document::from_vec(buf))
}

/// One-byte-lookahead reader over a transport.
struct Source<'a, R: Read> {
    reader: &'a mut R,
    peeked: Option<u8>,
}

impl<'a, R: Read> Source<'a, R> {
    fn new(reader: &'a mut R) -> Self {
        Self {
            reader,
            peeked: None,
        }
    }

    fn next(&mut self) -> Result<Option<u8>, Error> {
        if let Some(b) = self.peeked.take() {
            return Ok(Some(b));
        }
        let mut byte = [0u8; 1];
        match self.reader.read(&mut byte) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(byte[0])),
            Err(_) => Err(Error::Read),
        }
    }

    fn peek(&mut self) -> Result<Option<u8>, Error> {
        if self.peeked.is_none() {
            self.peeked = self.next()?;
        }
        Ok(self.peeked)
    }

    /// Discard the peeked byte. Only meaningful right after a `peek`.
    fn bump(&mut self) {
        self.peeked = None;
    }

    /// Peek at the next non-whitespace byte without consuming it.
    fn peek_non_ws(&mut self) -> Result<Option<u8>, Error> {
        loop {
            match self.peek()? {
                Some(b' ' | b'\t' | b'\r' | b'\n') => self.bump(),
                other => return Ok(other),
            }
        }
    }
}

/// Where copied bytes go: the document buffer, a key buffer, or nowhere.
trait Sink {
    fn put(&mut self, b: u8) -> Result<(), Error>;
}

struct Store<'a, const N: usize>(&'a mut Vec<u8, N>);

impl<const N: usize> Sink for Store<'_, N> {
    fn put(&mut self, b: u8) -> Result<(), Error> {
        self.0.push(b).map_err(|_| Error::NoMemory)
    }
}

struct Discard;

impl Sink for Discard {
    fn put(&mut self, _b: u8) -> Result<(), Error> {
        Ok(())
    }
}

fn emit<const N: usize>(out: &mut Vec<u8, N>, b: u8) -> Result<(), Error> {
    out.push(b).map_err(|_| Error::NoMemory)
}

fn emit_all<const N: usize>(out: &mut Vec<u8, N>, bytes: &[u8]) -> Result<(), Error> {
    out.extend_from_slice(bytes).map_err(|_| Error::NoMemory)
}

fn parse_value<R: Read, const N: usize>(
    src: &mut Source<'_, R>,
    out: &mut Vec<u8, N>,
    node: Node<'_>,
    depth: u8,
) -> Result<(), Error> {
    match src.peek_non_ws()?.ok_or(Error::IncompleteInput)? {
        b'{' => parse_object(src, out, node, depth),
        b'[' => parse_array(src, out, node, depth),
        b'"' => {
            emit(out, b'"')?;
            copy_string(src, &mut Store(&mut *out))?;
            emit(out, b'"')
        }
        b't' => {
            literal(src, b"true")?;
            emit_all(out, b"true")
        }
        b'f' => {
            literal(src, b"false")?;
            emit_all(out, b"false")
        }
        b'n' => {
            literal(src, b"null")?;
            emit_all(out, b"null")
        }
        b'-' | b'0'..=b'9' => copy_number(src, &mut Store(out)),
        _ => Err(Error::InvalidInput),
    }
}

fn parse_object<R: Read, const N: usize>(
    src: &mut Source<'_, R>,
    out: &mut Vec<u8, N>,
    node: Node<'_>,
    depth: u8,
) -> Result<(), Error> {
    if depth >= MAX_DEPTH {
        return Err(Error::TooDeep);
    }
    match src.next()? {
        Some(b'{') => {}
        _ => return Err(Error::InvalidInput),
    }
    emit(out, b'{')?;
    if src.peek_non_ws()? == Some(b'}') {
        src.bump();
        return emit(out, b'}');
    }
    let mut kept = 0usize;
    loop {
        match src.peek_non_ws()? {
            Some(b'"') => {}
            Some(_) => return Err(Error::InvalidInput),
            None => return Err(Error::IncompleteInput),
        }
        let mut key: Vec<u8, MAX_KEY_LEN> = Vec::new();
        copy_string(src, &mut Store(&mut key))?;
        let key_str = core::str::from_utf8(&key).map_err(|_| Error::InvalidInput)?;
        match src.peek_non_ws()? {
            Some(b':') => src.bump(),
            Some(_) => return Err(Error::InvalidInput),
            None => return Err(Error::IncompleteInput),
        }
        let child = node.member(key_str);
        if child.is_skip() {
            skim_value(src, depth + 1)?;
        } else {
            if kept > 0 {
                emit(out, b',')?;
            }
            emit(out, b'"')?;
            emit_all(out, &key)?;
            emit(out, b'"')?;
            emit(out, b':')?;
            parse_value(src, out, child, depth + 1)?;
            kept += 1;
        }
        match src.peek_non_ws()? {
            Some(b',') => src.bump(),
            Some(b'}') => {
                src.bump();
                return emit(out, b'}');
            }
            Some(_) => return Err(Error::InvalidInput),
            None => return Err(Error::IncompleteInput),
        }
    }
}

fn parse_array<R: Read, const N: usize>(
    src: &mut Source<'_, R>,
    out: &mut Vec<u8, N>,
    node: Node<'_>,
    depth: u8,
) -> Result<(), Error> {
    if depth >= MAX_DEPTH {
        return Err(Error::TooDeep);
    }
    match src.next()? {
        Some(b'[') => {}
        _ => return Err(Error::InvalidInput),
    }
    emit(out, b'[')?;
    if src.peek_non_ws()? == Some(b']') {
        src.bump();
        return emit(out, b']');
    }
    let elem = node.element();
    let mut kept = 0usize;
    loop {
        if elem.is_skip() {
            skim_value(src, depth + 1)?;
        } else {
            if kept > 0 {
                emit(out, b',')?;
            }
            parse_value(src, out, elem, depth + 1)?;
            kept += 1;
        }
        match src.peek_non_ws()? {
            Some(b',') => src.bump(),
            Some(b']') => {
                src.bump();
                return emit(out, b']');
            }
            Some(_) => return Err(Error::InvalidInput),
            None => return Err(Error::IncompleteInput),
        }
    }
}

/// Validate and consume a value without storing any of it.
fn skim_value<R: Read>(src: &mut Source<'_, R>, depth: u8) -> Result<(), Error> {
    match src.peek_non_ws()?.ok_or(Error::IncompleteInput)? {
        b'{' => {
            if depth >= MAX_DEPTH {
                return Err(Error::TooDeep);
            }
            src.bump();
            if src.peek_non_ws()? == Some(b'}') {
                src.bump();
                return Ok(());
            }
            loop {
                if src.peek_non_ws()? != Some(b'"') {
                    return Err(Error::InvalidInput);
                }
                copy_string(src, &mut Discard)?;
                match src.peek_non_ws()? {
                    Some(b':') => src.bump(),
                    _ => return Err(Error::InvalidInput),
                }
                skim_value(src, depth + 1)?;
                match src.peek_non_ws()? {
                    Some(b',') => src.bump(),
                    Some(b'}') => {
                        src.bump();
                        return Ok(());
                    }
                    Some(_) => return Err(Error::InvalidInput),
                    None => return Err(Error::IncompleteInput),
                }
            }
        }
        b'[' => {
            if depth >= MAX_DEPTH {
                return Err(Error::TooDeep);
            }
            src.bump();
            if src.peek_non_ws()? == Some(b']') {
                src.bump();
                return Ok(());
            }
            loop {
                skim_value(src, depth + 1)?;
                match src.peek_non_ws()? {
                    Some(b',') => src.bump(),
                    Some(b']') => {
                        src.bump();
                        return Ok(());
                    }
                    Some(_) => return Err(Error::InvalidInput),
                    None => return Err(Error::IncompleteInput),
                }
            }
        }
        b'"' => copy_string(src, &mut Discard),
        b't' => literal(src, b"true"),
        b'f' => literal(src, b"false"),
        b'n' => literal(src, b"null"),
        b'-' | b'0'..=b'9' => copy_number(src, &mut Discard),
        _ => Err(Error::InvalidInput),
    }
}

/// Consume a string (the next byte must be its opening quote) and send its
/// content, still escaped, to `sink`. Escape sequences and multi-byte UTF-8
/// sequences are validated so the stored text stays valid UTF-8.
fn copy_string<R: Read>(src: &mut Source<'_, R>, sink: &mut impl Sink) -> Result<(), Error> {
    match src.next()? {
        Some(b'"') => {}
        _ => return Err(Error::InvalidInput),
    }
    loop {
        let b = src.next()?.ok_or(Error::IncompleteInput)?;
        match b {
            b'"' => return Ok(()),
            b'\\' => {
                sink.put(b'\\')?;
                let esc = src.next()?.ok_or(Error::IncompleteInput)?;
                match esc {
                    b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't' => sink.put(esc)?,
                    b'u' => {
                        sink.put(b'u')?;
                        for _ in 0..4 {
                            let h = src.next()?.ok_or(Error::IncompleteInput)?;
                            if !h.is_ascii_hexdigit() {
                                return Err(Error::InvalidInput);
                            }
                            sink.put(h)?;
                        }
                    }
                    _ => return Err(Error::InvalidInput),
                }
            }
            0x00..=0x1f => return Err(Error::InvalidInput),
            0x20..=0x7f => sink.put(b)?,
            _ => {
                let continuation = match b {
                    0xc2..=0xdf => 1,
                    0xe0..=0xef => 2,
                    0xf0..=0xf4 => 3,
                    _ => return Err(Error::InvalidInput),
                };
                sink.put(b)?;
                for _ in 0..continuation {
                    let c = src.next()?.ok_or(Error::IncompleteInput)?;
                    if !matches!(c, 0x80..=0xbf) {
                        return Err(Error::InvalidInput);
                    }
                    sink.put(c)?;
                }
            }
        }
    }
}

/// Copy number characters until a delimiter. Requires at least one digit;
/// finer grammar checks are left to the consumer of the value.
fn copy_number<R: Read>(src: &mut Source<'_, R>, sink: &mut impl Sink) -> Result<(), Error> {
    let mut digits = 0usize;
    loop {
        match src.peek()? {
            Some(b) if b.is_ascii_digit() => {
                digits += 1;
                sink.put(b)?;
                src.bump();
            }
            Some(b @ (b'-' | b'+' | b'.' | b'e' | b'E')) => {
                sink.put(b)?;
                src.bump();
            }
            _ => break,
        }
    }
    if digits == 0 {
        return Err(Error::InvalidInput);
    }
    Ok(())
}

fn literal<R: Read>(src: &mut Source<'_, R>, text: &'static [u8]) -> Result<(), Error> {
    for &expect in text {
        match src.next()? {
            Some(b) if b == expect => {}
            Some(_) => return Err(Error::InvalidInput),
            None => return Err(Error::IncompleteInput),
        }
    }
    Ok(())
}
