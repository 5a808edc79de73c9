//! Distinguished name handling (RFC 4514)
//!
//! Group memberships come back from the directory as full DNs such as
//! `CN=Smith\, John,OU=groups,DC=example,DC=org`. Values may contain escaped
//! separators, hex pairs (`\2C`) or be quoted, so splitting on `,` is not
//! enough. A value starting with `#` is the hex dump of a BER-encoded string
//! (`cn=#04024869` is `Hi`); only the string types are accepted.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DnError {
    #[error("empty distinguished name")]
    Empty,

    #[error("missing '=' in RDN component at byte {0}")]
    MissingEquals(usize),

    #[error("invalid escape sequence at byte {0}")]
    InvalidEscape(usize),

    #[error("unexpected character at byte {0}")]
    UnexpectedCharacter(usize),

    #[error("unterminated quoted value")]
    UnterminatedQuote,

    #[error("attribute value is not valid UTF-8")]
    InvalidUtf8,

    #[error("invalid hex-encoded value at byte {0}")]
    InvalidHexString(usize),
}

/// BER tags of the string types a `#` value may carry
const BER_STRING_TAGS: [u8; 6] = [
    0x04, // OCTET STRING
    0x0C, // UTF8String
    0x13, // PrintableString
    0x14, // TeletexString
    0x16, // IA5String
    0x1A, // VisibleString
];

/// One relative distinguished name: one or more `type=value` pairs joined by `+`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rdn {
    pub components: Vec<(String, String)>,
}

impl Rdn {
    /// Attribute type of the first component
    pub fn attribute(&self) -> &str {
        self.components.first().map(|(t, _)| t.as_str()).unwrap_or("")
    }

    /// Unescaped value of the first component
    pub fn value(&self) -> &str {
        self.components.first().map(|(_, v)| v.as_str()).unwrap_or("")
    }
}

/// Parse a DN into its RDNs, leftmost first
pub fn parse_dn(dn: &str) -> Result<Vec<Rdn>, DnError> {
    if dn.trim().is_empty() {
        return Err(DnError::Empty);
    }

    let mut parser = Parser {
        input: dn.as_bytes(),
        pos: 0,
    };
    let mut rdns = Vec::new();
    let mut current = Vec::new();

    loop {
        let attribute = parser.attribute_type()?;
        let value = parser.attribute_value()?;
        current.push((attribute, value));

        match parser.next_byte() {
            Some(b'+') => continue,
            Some(b',') | Some(b';') => {
                rdns.push(Rdn {
                    components: std::mem::take(&mut current),
                });
            }
            None => {
                rdns.push(Rdn { components: current });
                return Ok(rdns);
            }
            Some(_) => return Err(DnError::UnexpectedCharacter(parser.pos - 1)),
        }
    }
}

/// Value of the leftmost RDN, e.g. `group1` for `CN=group1,OU=groups,DC=example,DC=org`
pub fn leading_rdn_value(dn: &str) -> Result<String, DnError> {
    let rdns = parse_dn(dn)?;
    Ok(rdns
        .into_iter()
        .next()
        .map(|rdn| rdn.value().to_string())
        .unwrap_or_default())
}

/// Escape an attribute value for use inside a DN.
///
/// Escapes `, + " \ < > ; =` with a backslash, NUL as `\00`, a leading `#`
/// and leading or trailing spaces.
pub fn escape_dn_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len() * 2);
    let last = value.chars().count().saturating_sub(1);

    for (i, ch) in value.chars().enumerate() {
        match ch {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=' => {
                result.push('\\');
                result.push(ch);
            }
            '\0' => result.push_str("\\00"),
            ' ' if i == 0 || i == last => result.push_str("\\20"),
            '#' if i == 0 => result.push_str("\\23"),
            _ => result.push(ch),
        }
    }

    result
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn next_byte(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn skip_spaces(&mut self) {
        while self.peek() == Some(b' ') {
            self.pos += 1;
        }
    }

    fn attribute_type(&mut self) -> Result<String, DnError> {
        self.skip_spaces();
        let start = self.pos;

        while let Some(b) = self.peek() {
            match b {
                b'=' => {
                    let name = String::from_utf8_lossy(&self.input[start..self.pos])
                        .trim()
                        .to_string();
                    self.pos += 1;
                    if name.is_empty() {
                        return Err(DnError::MissingEquals(start));
                    }
                    return Ok(name);
                }
                b',' | b';' | b'+' => return Err(DnError::MissingEquals(start)),
                _ => self.pos += 1,
            }
        }

        Err(DnError::MissingEquals(start))
    }

    fn attribute_value(&mut self) -> Result<String, DnError> {
        self.skip_spaces();

        match self.peek() {
            Some(b'"') => self.quoted_value(),
            Some(b'#') => self.hex_value(),
            _ => self.plain_value(),
        }
    }

    /// `#` followed by hex pairs holding a BER-encoded string
    fn hex_value(&mut self) -> Result<String, DnError> {
        let start = self.pos;
        self.pos += 1;
        let mut bytes = Vec::new();

        while let Some(high) = self.peek().and_then(hex_digit) {
            let low = self
                .input
                .get(self.pos + 1)
                .copied()
                .and_then(hex_digit)
                .ok_or(DnError::InvalidHexString(start))?;
            bytes.push((high << 4) | low);
            self.pos += 2;
        }

        self.skip_spaces();
        match self.peek() {
            None | Some(b',') | Some(b';') | Some(b'+') => {}
            Some(_) => return Err(DnError::InvalidHexString(start)),
        }

        let content = ber_string(&bytes).ok_or(DnError::InvalidHexString(start))?;
        String::from_utf8(content.to_vec()).map_err(|_| DnError::InvalidUtf8)
    }

    fn quoted_value(&mut self) -> Result<String, DnError> {
        self.pos += 1;
        let mut out = Vec::new();

        loop {
            match self.next_byte() {
                None => return Err(DnError::UnterminatedQuote),
                Some(b'"') => break,
                Some(b'\\') => out.push(self.escaped_byte()?),
                Some(b) => out.push(b),
            }
        }

        self.skip_spaces();
        String::from_utf8(out).map_err(|_| DnError::InvalidUtf8)
    }

    fn plain_value(&mut self) -> Result<String, DnError> {
        let mut out = Vec::new();
        // length of `out` up to the last byte that must be kept
        let mut keep = 0;

        while let Some(b) = self.peek() {
            match b {
                b',' | b';' | b'+' => break,
                b'\\' => {
                    self.pos += 1;
                    out.push(self.escaped_byte()?);
                    keep = out.len();
                }
                b' ' => {
                    self.pos += 1;
                    out.push(b);
                }
                _ => {
                    self.pos += 1;
                    out.push(b);
                    keep = out.len();
                }
            }
        }

        out.truncate(keep);
        String::from_utf8(out).map_err(|_| DnError::InvalidUtf8)
    }

    /// Decode the byte following a backslash: a special character or a hex pair
    fn escaped_byte(&mut self) -> Result<u8, DnError> {
        let at = self.pos;
        let first = self.next_byte().ok_or(DnError::InvalidEscape(at))?;

        if let Some(high) = hex_digit(first) {
            let low = self
                .peek()
                .and_then(hex_digit)
                .ok_or(DnError::InvalidEscape(at))?;
            self.pos += 1;
            return Ok((high << 4) | low);
        }

        match first {
            b',' | b'=' | b'+' | b'<' | b'>' | b'#' | b';' | b'\\' | b'"' | b' ' => Ok(first),
            _ => Err(DnError::InvalidEscape(at)),
        }
    }
}

/// Content octets of a BER string element that spans all of `bytes`
fn ber_string(bytes: &[u8]) -> Option<&[u8]> {
    let (&tag, rest) = bytes.split_first()?;
    if !BER_STRING_TAGS.contains(&tag) {
        return None;
    }

    let (&first, rest) = rest.split_first()?;
    let (len, content) = match first {
        0x00..=0x7F => (first as usize, rest),
        0x81 => (*rest.first()? as usize, rest.get(1..)?),
        0x82 => {
            let len = u16::from_be_bytes([*rest.first()?, *rest.get(1)?]);
            (len as usize, rest.get(2..)?)
        }
        _ => return None,
    };

    (content.len() == len).then_some(content)
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
