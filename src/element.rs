//! Declarative element descriptions.
//!
//! An [`Element`] is an immutable rule for reading one field (or, for compounds, a named
//! sequence of fields) from a [`ByteSource`]. Elements hold no per-file state: the cursor lives
//! in the byte source and everything read is recorded in the [`ParseContext`], so a single
//! element tree is built once per adapter and reused for every file.
//!
//! All integers are little-endian.

use std::borrow::Cow;

use byteorder::{ByteOrder, LittleEndian};
use log::{trace, warn};

use crate::byte_source::ByteSource;
use crate::context::ParseContext;
use crate::err::{ParseError, Result};
use crate::utils::decode_single_byte;
use crate::value::{NumberBase, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    Byte = 1,
    Short = 2,
    Int = 4,
    Long = 8,
}

impl IntWidth {
    pub fn bytes(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegerElement {
    pub width: IntWidth,
    pub signed: bool,
    pub base: NumberBase,
}

impl IntegerElement {
    fn decode(&self, raw: &[u8]) -> i128 {
        match (self.width, self.signed) {
            (IntWidth::Byte, false) => i128::from(raw[0]),
            (IntWidth::Byte, true) => i128::from(raw[0] as i8),
            (IntWidth::Short, false) => i128::from(LittleEndian::read_u16(raw)),
            (IntWidth::Short, true) => i128::from(LittleEndian::read_i16(raw)),
            (IntWidth::Int, false) => i128::from(LittleEndian::read_u32(raw)),
            (IntWidth::Int, true) => i128::from(LittleEndian::read_i32(raw)),
            (IntWidth::Long, false) => i128::from(LittleEndian::read_u64(raw)),
            (IntWidth::Long, true) => i128::from(LittleEndian::read_i64(raw)),
        }
    }
}

/// Width of the length field in front of a length-prefixed string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixWidth {
    U8,
    U16,
    U32,
}

impl PrefixWidth {
    fn bytes(self) -> usize {
        match self {
            PrefixWidth::U8 => 1,
            PrefixWidth::U16 => 2,
            PrefixWidth::U32 => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Integer(IntegerElement),
    /// Exactly `n` single-byte characters; trailing NULs are not part of the value.
    FixedString(usize),
    /// A length field followed by that many characters.
    PascalString { prefix: PrefixWidth, max_len: u64 },
    /// A value fixed by the format definition. Reads nothing.
    Constant(Value),
    /// Bytes that are consumed but never reported.
    Positional(u64),
    /// Text filling the rest of a region. The region's byte length was recorded by the sibling
    /// `length_field`, and is measured from the end of that field.
    Remainder {
        length_field: Cow<'static, str>,
        max_len: u64,
    },
    Compound(Vec<(Cow<'static, str>, Element)>),
}

/// What a single [`Element::read`] produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadOutput {
    pub consumed: u64,
    /// `None` for positional and compound elements.
    pub value: Option<Value>,
}

/// Offsets of already-read siblings, used to size a trailing [`Element::Remainder`].
struct Frame<'a> {
    ends: &'a [(&'a str, u64)],
}

impl Element {
    pub fn integer(width: IntWidth, signed: bool, base: NumberBase) -> Self {
        Element::Integer(IntegerElement {
            width,
            signed,
            base,
        })
    }

    pub fn u8() -> Self {
        Self::integer(IntWidth::Byte, false, NumberBase::Decimal)
    }

    pub fn u16() -> Self {
        Self::integer(IntWidth::Short, false, NumberBase::Decimal)
    }

    pub fn i16() -> Self {
        Self::integer(IntWidth::Short, true, NumberBase::Decimal)
    }

    pub fn u32() -> Self {
        Self::integer(IntWidth::Int, false, NumberBase::Decimal)
    }

    pub fn i32() -> Self {
        Self::integer(IntWidth::Int, true, NumberBase::Decimal)
    }

    pub fn u64() -> Self {
        Self::integer(IntWidth::Long, false, NumberBase::Decimal)
    }

    pub fn u16_hex() -> Self {
        Self::integer(IntWidth::Short, false, NumberBase::Hex)
    }

    pub fn u32_hex() -> Self {
        Self::integer(IntWidth::Int, false, NumberBase::Hex)
    }

    pub fn fixed_string(len: usize) -> Self {
        Element::FixedString(len)
    }

    pub fn pascal_string(prefix: PrefixWidth, max_len: u64) -> Self {
        Element::PascalString { prefix, max_len }
    }

    pub fn constant(value: impl Into<Value>) -> Self {
        Element::Constant(value.into())
    }

    pub fn positional(width: u64) -> Self {
        Element::Positional(width)
    }

    pub fn remainder(length_field: impl Into<Cow<'static, str>>, max_len: u64) -> Self {
        Element::Remainder {
            length_field: length_field.into(),
            max_len,
        }
    }

    pub fn compound<I, N>(fields: I) -> Self
    where
        I: IntoIterator<Item = (N, Element)>,
        N: Into<Cow<'static, str>>,
    {
        Element::Compound(
            fields
                .into_iter()
                .map(|(name, element)| (name.into(), element))
                .collect(),
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Element::Integer(_) => "integer",
            Element::FixedString(_) => "fixed string",
            Element::PascalString { .. } => "pascal string",
            Element::Constant(_) => "constant",
            Element::Positional(_) => "positional",
            Element::Remainder { .. } => "remainder",
            Element::Compound(_) => "compound",
        }
    }

    /// Number of bytes this element always consumes, if that is known without reading.
    pub fn fixed_width(&self) -> Option<u64> {
        match self {
            Element::Integer(int) => Some(int.width.bytes() as u64),
            Element::FixedString(len) => Some(*len as u64),
            Element::Constant(_) => Some(0),
            Element::Positional(width) => Some(*width),
            Element::PascalString { .. } | Element::Remainder { .. } => None,
            Element::Compound(fields) => fields
                .iter()
                .map(|(_, element)| element.fixed_width())
                .sum(),
        }
    }

    /// Read this element at the source's current position, recording it under `name` in the
    /// innermost open scope of `ctx`.
    pub fn read(
        &self,
        source: &mut dyn ByteSource,
        ctx: &mut ParseContext,
        name: &str,
    ) -> Result<ReadOutput> {
        self.read_in(source, ctx, name, None)
    }

    fn read_in(
        &self,
        source: &mut dyn ByteSource,
        ctx: &mut ParseContext,
        name: &str,
        frame: Option<&Frame<'_>>,
    ) -> Result<ReadOutput> {
        let offset = source.position();
        trace!("offset `0x{:08x}`: reading `{}` ({})", offset, name, self.kind());

        match self {
            Element::Integer(int) => {
                let mut buf = [0_u8; 8];
                let raw = &mut buf[..int.width.bytes()];
                source.read_into(raw, "integer")?;
                let value = Value::Integer {
                    value: int.decode(raw),
                    base: int.base,
                };
                Ok(leaf(ctx, name, value, int.width.bytes() as u64))
            }
            Element::FixedString(len) => {
                let raw = source.read_bytes(*len, "fixed length string")?;
                let value = Value::from(decode_single_byte(&raw));
                Ok(leaf(ctx, name, value, *len as u64))
            }
            Element::PascalString { prefix, max_len } => {
                let mut buf = [0_u8; 4];
                let raw = &mut buf[..prefix.bytes()];
                source.read_into(raw, "string length prefix")?;
                let len = match prefix {
                    PrefixWidth::U8 => u64::from(raw[0]),
                    PrefixWidth::U16 => u64::from(LittleEndian::read_u16(raw)),
                    PrefixWidth::U32 => u64::from(LittleEndian::read_u32(raw)),
                };
                if len > *max_len || len > source.remaining() {
                    return Err(ParseError::malformed(
                        "length prefixed string",
                        offset,
                        format!(
                            "prefix claims {} bytes, {} remain (limit {})",
                            len,
                            source.remaining(),
                            max_len
                        ),
                    ));
                }
                let text = source.read_bytes(len as usize, "length prefixed string")?;
                let value = Value::from(decode_single_byte(&text));
                Ok(leaf(ctx, name, value, prefix.bytes() as u64 + len))
            }
            Element::Constant(value) => Ok(leaf(ctx, name, value.clone(), 0)),
            Element::Positional(width) => {
                source.skip(*width, "positional")?;
                Ok(ReadOutput {
                    consumed: *width,
                    value: None,
                })
            }
            Element::Remainder {
                length_field,
                max_len,
            } => {
                let region_start = frame
                    .and_then(|f| {
                        f.ends
                            .iter()
                            .rev()
                            .find(|(n, _)| *n == length_field.as_ref())
                    })
                    .map(|(_, end)| *end)
                    .ok_or_else(|| {
                        ParseError::malformed(
                            "remainder string",
                            offset,
                            format!("no preceding sibling `{}` to measure from", length_field),
                        )
                    })?;
                let declared = ctx.get_u64_in_scope(length_field)?;
                let used = offset - region_start;
                let len = match declared.checked_sub(used) {
                    Some(len) => len,
                    None => {
                        warn!(
                            "offset `0x{:08x}`: `{}` declares {} bytes but {} were already read",
                            offset, length_field, declared, used
                        );
                        0
                    }
                };
                if len > *max_len {
                    return Err(ParseError::malformed(
                        "remainder string",
                        offset,
                        format!("{} bytes exceeds limit {}", len, max_len),
                    ));
                }
                let text = source.read_bytes(len as usize, "remainder string")?;
                let value = Value::from(decode_single_byte(&text));
                Ok(leaf(ctx, name, value, len))
            }
            Element::Compound(fields) => {
                ctx.start(name);
                let mut consumed = 0;
                let mut ends: Vec<(&str, u64)> = Vec::with_capacity(fields.len());
                for (field_name, element) in fields {
                    let frame = Frame { ends: &ends };
                    let out = element.read_in(source, ctx, field_name, Some(&frame))?;
                    consumed += out.consumed;
                    ends.push((field_name.as_ref(), source.position()));
                }
                ctx.end(name)?;
                Ok(ReadOutput {
                    consumed,
                    value: None,
                })
            }
        }
    }
}

fn leaf(ctx: &mut ParseContext, name: &str, value: Value, consumed: u64) -> ReadOutput {
    ctx.value(name, value.clone());
    ReadOutput {
        consumed,
        value: Some(value),
    }
}
