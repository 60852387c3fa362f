//! Word for Windows 1.x and 2.x documents.
//!
//! These predate OLE compound files: the document starts directly with the File Information
//! Block (FIB), whose first 0x24 bytes are enough to identify the writer and locate the text.

use std::path::Path;

use log::debug;

use crate::adapter::{Adapter, write_file_info};
use crate::byte_source::{ByteSource, FileByteSource};
use crate::context::ParseContext;
use crate::element::Element;
use crate::err::{ParseError, Result};
use crate::sniff::HeaderPattern;
use crate::value::Value;

// FIB identifiers. The nFib that follows varies between writers.
const WORD1_HEADER: &str = "9B A5";
const WORD2_HEADER: &str = "DB A5";

const WORD1_MAGIC: u64 = 0xA59B;

// FIB flag bits.
const F_DOT: u64 = 0x0001;
const F_GLSY: u64 = 0x0002;
const F_COMPLEX: u64 = 0x0004;
const F_HAS_PIC: u64 = 0x0008;
const QUICK_SAVES_MASK: u64 = 0x00F0;
const F_ENCRYPTED: u64 = 0x0100;

pub struct Word2Adapter {
    word1: HeaderPattern,
    word2: HeaderPattern,
    header: Element,
    text: Element,
}

impl Default for Word2Adapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Word2Adapter {
    pub fn new() -> Self {
        let header = Element::compound([
            ("magic_number", Element::u16_hex()),
            ("fib_number", Element::u16_hex()),
            ("product_version", Element::u16_hex()),
            ("language", Element::u16_hex()),
            ("next_page", Element::i16()),
            ("flags", Element::u16_hex()),
            ("fib_back", Element::u16_hex()),
            // lKey, envr and reserved fields.
            ("reserved", Element::positional(10)),
        ]);

        let text = Element::compound([
            ("fc_min", Element::u32()),
            ("fc_mac", Element::u32()),
            ("cb_mac", Element::u32()),
        ]);

        Word2Adapter {
            word1: HeaderPattern::parse(WORD1_HEADER).expect("WORD1_HEADER is a valid pattern"),
            word2: HeaderPattern::parse(WORD2_HEADER).expect("WORD2_HEADER is a valid pattern"),
            header,
            text,
        }
    }

    /// Read the FIB from the start of `source` into the innermost scope of `ctx`.
    pub fn read_fib(&self, source: &mut dyn ByteSource, ctx: &mut ParseContext) -> Result<()> {
        source.set_position(0)?;
        self.header.read(source, ctx, "header")?;

        let magic = ctx.get_u64_in_scope("header.magic_number")?;
        let version = if magic == WORD1_MAGIC { "1.x" } else { "2.0" };
        debug!("FIB magic 0x{:X}, Word {}", magic, version);
        ctx.value("version", version);

        let flags = ctx.get_u64_in_scope("header.flags")?;
        ctx.start("properties");
        ctx.value("template", flags & F_DOT != 0);
        ctx.value("glossary", flags & F_GLSY != 0);
        ctx.value("complex", flags & F_COMPLEX != 0);
        ctx.value("has_pictures", flags & F_HAS_PIC != 0);
        ctx.value("quick_saves", Value::int((flags & QUICK_SAVES_MASK) >> 4));
        ctx.value("encrypted", flags & F_ENCRYPTED != 0);
        ctx.end("properties")?;

        let text_offset = source.position();
        self.text.read(source, ctx, "text")?;
        let fc_min = ctx.get_u64_in_scope("text.fc_min")?;
        let fc_mac = ctx.get_u64_in_scope("text.fc_mac")?;
        let text_length = fc_mac.checked_sub(fc_min).ok_or_else(|| {
            ParseError::malformed(
                "FIB text range",
                text_offset,
                format!("text ends at {} before it starts at {}", fc_mac, fc_min),
            )
        })?;
        ctx.value("text_length", Value::int(text_length));

        Ok(())
    }
}

impl Adapter for Word2Adapter {
    fn name(&self) -> &'static str {
        "Microsoft Word 1.x/2.x Adapter"
    }

    fn description(&self) -> &'static str {
        "Adapts Microsoft Word for Windows 1.x and 2.0 documents"
    }

    fn version(&self) -> &'static str {
        "1.0"
    }

    fn input_media_type(&self) -> &'static str {
        "application/msword"
    }

    fn output_schema_id(&self) -> &'static str {
        "word.dtd"
    }

    fn accepts(&self, file: &Path) -> bool {
        self.word2.check_file(file) || self.word1.check_file(file)
    }

    fn parse(&self, file: &Path, ctx: &mut ParseContext) -> Result<()> {
        let mut source = FileByteSource::open(file)?;

        ctx.start("Word");
        write_file_info(file, ctx)?;
        self.read_fib(&mut source, ctx)?;
        ctx.end("Word")
    }
}
