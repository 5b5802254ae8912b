//! the section/label driver described in spec.md §4.4's "two-pass
//! resolution" paragraph: walk the source once, emitting bytes as each
//! instruction or data item is seen and recording a back-patch whenever an
//! operand names a label that hasn't appeared yet; once the whole file has
//! been read, sweep the back-patch list and write real addresses over the
//! placeholder `0, 0` bytes the encoder left behind.

use crate::asm::encoder::{self, Encoded};
use crate::asm::error::AssembleError;
use crate::asm::label::{Label, LabelKind, LabelTable, RESERVED_LABELS};
use crate::asm::lexer::{split_args, strip_comment};
use crate::config::{Config, MemoryLayout};
use crate::memory::{Address, Memory};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Data,
    Text,
}

/// the fixed-size bootstrap instruction written at `layout.instruction_ptr_start`:
/// `jmp main` so execution always begins wherever `main:` landed in `.text`.
const BOOTSTRAP_LEN: u16 = 4;

/// gates a trace of every back-patch resolution: the label name, the
/// operand address it was recorded at, and the final address written over
/// the placeholder bytes. off by default, same idiom as `vm::DEBUG_TRACE`.
pub const DEBUG_BACKPATCH: bool = false;

struct Assembler {
    mem: Memory,
    labels: LabelTable,
    fixups: Vec<(String, Address)>,
    data_cursor: u16,
    text_cursor: u16,
    main_seen: bool,
    layout: MemoryLayout,
    trace_backpatch: bool,
}

/// assembles source text into a loaded memory image, ready for `Cpu::start`,
/// using the conventional memory layout.
pub fn assemble(source: &str) -> Result<Memory, AssembleError> {
    assemble_with_layout(source, &MemoryLayout::default())
}

/// assembles source text against an overridden `MemoryLayout` - lets tests
/// construct tighter memories without touching the conventional defaults.
pub fn assemble_with_layout(source: &str, layout: &MemoryLayout) -> Result<Memory, AssembleError> {
    assemble_inner(source, layout, DEBUG_BACKPATCH)
}

/// assembles source text using a full `Config`: its `memory` section as the
/// layout and `assembler.trace_backpatch` to enable the back-patch trace at
/// runtime, on top of the `DEBUG_BACKPATCH` compile-time default.
pub fn assemble_with_config(source: &str, cfg: &Config) -> Result<Memory, AssembleError> {
    assemble_inner(source, &cfg.memory, DEBUG_BACKPATCH || cfg.assembler.trace_backpatch)
}

fn assemble_inner(source: &str, layout: &MemoryLayout, trace_backpatch: bool) -> Result<Memory, AssembleError> {
    let mut asm = Assembler {
        mem: Memory::new(),
        labels: LabelTable::new(),
        fixups: Vec::new(),
        data_cursor: layout.data_lower_addr,
        text_cursor: layout.text_lower_addr + BOOTSTRAP_LEN,
        main_seen: false,
        layout: *layout,
        trace_backpatch,
    };

    let mut section = Section::None;
    for (idx, raw_line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let stripped = strip_comment(raw_line).trim();
        if stripped.is_empty() {
            continue;
        }

        if let Some(rest) = stripped.strip_prefix("section").map(str::trim) {
            section = match rest {
                ".data" => Section::Data,
                ".text" => Section::Text,
                other => return Err(AssembleError::InvalidSection(line_no, other.to_string())),
            };
            continue;
        }

        match section {
            Section::None => return Err(AssembleError::InvalidSection(line_no, stripped.to_string())),
            Section::Data => asm.process_data_line(line_no, stripped)?,
            Section::Text => asm.process_text_line(line_no, stripped)?,
        }
    }

    if !asm.main_seen {
        return Err(AssembleError::MissingMain);
    }

    asm.resolve_fixups()?;
    asm.write_bootstrap();
    Ok(asm.mem)
}

impl Assembler {
    fn declare_label(&mut self, line_no: usize, name: &str, label: Label) -> Result<(), AssembleError> {
        if RESERVED_LABELS.contains(&name) {
            return Err(AssembleError::ReservedLabel(line_no, name.to_string()));
        }
        if self.labels.contains(name) {
            return Err(AssembleError::DuplicateLabel(line_no, name.to_string()));
        }
        if name == "main" {
            self.main_seen = true;
        }
        self.labels.insert(name.to_string(), label);
        Ok(())
    }

    /// `<name> <str|strz> <value>` - `str` emits the bytes verbatim, `strz`
    /// appends a trailing NUL.
    fn process_data_line(&mut self, line_no: usize, line: &str) -> Result<(), AssembleError> {
        let mut parts = line.splitn(3, char::is_whitespace);
        let name = parts
            .next()
            .ok_or_else(|| AssembleError::InvalidOperand(line_no, line.to_string()))?;
        let kind = parts
            .next()
            .ok_or_else(|| AssembleError::WrongOperandCount(line_no, 3, 1))?;
        let rest = parts
            .next()
            .ok_or_else(|| AssembleError::WrongOperandCount(line_no, 3, 2))?
            .trim();

        let bytes = decode_string_literal(line_no, rest)?;
        let addr = Address::new(self.data_cursor);

        let label_kind = match kind {
            "str" => LabelKind::Str,
            "strz" => LabelKind::Strz,
            other => return Err(AssembleError::InvalidOperand(line_no, other.to_string())),
        };

        self.mem.write_bytes(addr, &bytes);
        let mut len = bytes.len() as u16;
        if label_kind == LabelKind::Strz {
            self.mem.write_u8(Address::new(self.data_cursor + len), 0);
            len += 1;
        }

        self.declare_label(
            line_no,
            name,
            Label {
                kind: label_kind,
                address: addr,
            },
        )?;
        self.data_cursor += len;
        Ok(())
    }

    fn process_text_line(&mut self, line_no: usize, line: &str) -> Result<(), AssembleError> {
        if let Some(name) = line.strip_suffix(':') {
            return self.declare_label(
                line_no,
                name.trim(),
                Label {
                    kind: LabelKind::Code,
                    address: Address::new(self.text_cursor),
                },
            );
        }

        let mut parts = line.splitn(2, char::is_whitespace);
        let mnemonic = parts.next().unwrap_or("").to_lowercase();
        let arg_text = parts.next().unwrap_or("").trim();
        let args = if arg_text.is_empty() {
            Vec::new()
        } else {
            split_args(arg_text)
        };

        let encoded = self.encode(line_no, &mnemonic, &args)?;
        self.emit(encoded);
        Ok(())
    }

    fn encode(&self, line_no: usize, mnemonic: &str, args: &[String]) -> Result<Encoded, AssembleError> {
        if let Some(enc) = encoder::encode_control(line_no, mnemonic, args)? {
            return Ok(enc);
        }
        match mnemonic {
            "call" => encoder::encode_call(line_no, args),
            "jmp" | "jz" | "jnz" | "jc" | "jnc" => encoder::encode_jmp(line_no, mnemonic, args),
            "mov" => encoder::encode_mov(line_no, args),
            "movw" => encoder::encode_movw(line_no, args),
            "push" => encoder::encode_push(line_no, args),
            "pushw" => encoder::encode_pushw(line_no, args),
            "pop" => encoder::encode_pop(line_no, args),
            "popw" => encoder::encode_popw(line_no, args),
            "add" => encoder::encode_alu(line_no, crate::isa::Op::Add, false, args),
            "sadd" => encoder::encode_alu(line_no, crate::isa::Op::Add, true, args),
            "sub" => encoder::encode_alu(line_no, crate::isa::Op::Sub, false, args),
            "ssub" => encoder::encode_alu(line_no, crate::isa::Op::Sub, true, args),
            "and" => encoder::encode_alu(line_no, crate::isa::Op::And, false, args),
            "or" => encoder::encode_alu(line_no, crate::isa::Op::Or, false, args),
            "xor" => encoder::encode_alu(line_no, crate::isa::Op::Xor, false, args),
            "cmp" => encoder::encode_alu(line_no, crate::isa::Op::Cmp, false, args),
            "scmp" => encoder::encode_alu(line_no, crate::isa::Op::Cmp, true, args),
            "mul" => encoder::encode_muldiv(line_no, true, false, args),
            "smul" => encoder::encode_muldiv(line_no, true, true, args),
            "div" => encoder::encode_muldiv(line_no, false, false, args),
            "sdiv" => encoder::encode_muldiv(line_no, false, true, args),
            "not" => encoder::encode_not_buf(line_no, true, args),
            "buf" => encoder::encode_not_buf(line_no, false, args),
            "shl" => encoder::encode_shift(line_no, true, false, args),
            "sshl" => encoder::encode_shift(line_no, true, true, args),
            "shr" => encoder::encode_shift(line_no, false, false, args),
            "sshr" => encoder::encode_shift(line_no, false, true, args),
            other => Err(AssembleError::UnknownMnemonic(line_no, other.to_string())),
        }
    }

    fn emit(&mut self, encoded: Encoded) {
        let base = self.text_cursor;
        self.mem.write_bytes(Address::new(base), &encoded.bytes);
        for (name, offset) in encoded.fixups {
            self.fixups.push((name, Address::new(base + offset as u16)));
        }
        self.text_cursor += encoded.bytes.len() as u16;
    }

    fn resolve_fixups(&mut self) -> Result<(), AssembleError> {
        for (name, fixup_addr) in &self.fixups {
            let label = self
                .labels
                .get(name)
                .ok_or_else(|| AssembleError::UnresolvedLabel(name.clone()))?;
            if self.trace_backpatch {
                eprintln!(
                    "[backpatch] {} @ {} -> {}",
                    name, fixup_addr, label.address
                );
            }
            self.mem.write_u16(*fixup_addr, label.address.value());
        }
        Ok(())
    }

    fn write_bootstrap(&mut self) {
        let main_addr = self.labels.get("main").expect("MissingMain checked earlier").address;
        let addr = Address::new(self.layout.instruction_ptr_start);
        self.mem.write_u8(addr, crate::isa::Op::Jmp.code());
        self.mem.write_u8(addr.wrapping_add(1), 0);
        self.mem.write_u16(addr.wrapping_add(2), main_addr.value());
    }
}

/// a `.data` value is either a quoted string (optionally containing escapes)
/// or a single numeric/char literal padded to its natural width.
fn decode_string_literal(line_no: usize, text: &str) -> Result<Vec<u8>, AssembleError> {
    if text.starts_with('"') && text.ends_with('"') && text.len() >= 2 {
        let inner = &text[1..text.len() - 1];
        let mut bytes = Vec::new();
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                let escaped = chars
                    .next()
                    .ok_or(AssembleError::UnclosedCharLiteral(line_no))?;
                bytes.push(crate::asm::lexer::escape_char(escaped));
            } else {
                bytes.push(c as u8);
            }
        }
        Ok(bytes)
    } else if text.starts_with('\'') {
        let inner = &text[1..text.len() - 1];
        Ok(vec![crate::asm::lexer::parse_char_literal(line_no, inner)?])
    } else {
        let v = crate::asm::lexer::parse_number(line_no, text)?;
        if v > 0xFF {
            Ok(v.to_le_bytes().to_vec())
        } else {
            Ok(vec![v as u8])
        }
    }
}

#[cfg(test)]
#[path = "./resolver_test.rs"]
mod resolver_test;
