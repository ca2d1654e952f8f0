//! ELF-64 relocatable object writer.
//!
//! Consumes finished machine-code bytes (and the label / pending-branch
//! metadata, via the caller) and serialises a relocatable ELF64
//! little-endian x86-64 object: `e_type = ET_REL`, `e_machine = EM_X86_64`,
//! with the standard section set `.text`, `.data`, `.bss`, `.rela.text`,
//! `.symtab`, `.strtab`, `.shstrtab`, plus `.tdata`/`.tbss` when any TLS
//! symbol is present.
//!
//! Sections, symbols, and relocations are registered by name; layout and
//! index assignment happen in [`ObjectWriter::write`].

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::buffer::CodeBuffer;
use crate::error::EmitError;

// ─── ELF constants ─────────────────────────────────────────

const ELF_MAGIC: [u8; 4] = [0x7F, b'E', b'L', b'F'];
const ELFCLASS64: u8 = 2;
const ELFDATA2LSB: u8 = 1;
const EV_CURRENT: u8 = 1;
const ET_REL: u16 = 1;
const EM_X86_64: u16 = 62;

const SHT_PROGBITS: u32 = 1;
const SHT_SYMTAB: u32 = 2;
const SHT_STRTAB: u32 = 3;
const SHT_RELA: u32 = 4;
const SHT_NOBITS: u32 = 8;

const SHF_WRITE: u64 = 0x1;
const SHF_ALLOC: u64 = 0x2;
const SHF_EXECINSTR: u64 = 0x4;
const SHF_INFO_LINK: u64 = 0x40;
const SHF_TLS: u64 = 0x400;

const SHN_UNDEF: u16 = 0;
const SHN_ABS: u16 = 0xFFF1;

/// ELF header size.
const EHDR_SIZE: u64 = 64;
/// Section header entry size.
const SHDR_SIZE: u64 = 64;
/// Symbol table entry size.
const SYM_SIZE: u64 = 24;
/// RELA entry size.
const RELA_SIZE: u64 = 24;

// ─── Public value types ────────────────────────────────────

/// Symbol binding, the high nibble of `st_info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SymbolBinding {
    Local,
    Global,
    Weak,
}

impl SymbolBinding {
    const fn bits(self) -> u8 {
        match self {
            SymbolBinding::Local => 0,
            SymbolBinding::Global => 1,
            SymbolBinding::Weak => 2,
        }
    }
}

/// Symbol type, the low nibble of `st_info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SymbolType {
    NoType,
    Object,
    Func,
    Section,
    File,
    /// Thread-local symbol. Its presence switches on the `.tdata`/`.tbss`
    /// section pair.
    Tls,
}

impl SymbolType {
    const fn bits(self) -> u8 {
        match self {
            SymbolType::NoType => 0,
            SymbolType::Object => 1,
            SymbolType::Func => 2,
            SymbolType::Section => 3,
            SymbolType::File => 4,
            SymbolType::Tls => 6,
        }
    }
}

/// x86-64 relocation kinds this writer emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RelocKind {
    /// `R_X86_64_64` — absolute 64-bit.
    Abs64,
    /// `R_X86_64_PC32` — 32-bit PC-relative; the kind an inter-module CALL
    /// site gets, at `site + 1` with addend −4.
    Pc32,
    /// `R_X86_64_PLT32` — 32-bit PC-relative through the PLT.
    Plt32,
    /// `R_X86_64_32` — absolute 32-bit zero-extended.
    Abs32,
    /// `R_X86_64_TPOFF32` — 32-bit offset from the thread pointer.
    Tpoff32,
}

impl RelocKind {
    const fn r_type(self) -> u32 {
        match self {
            RelocKind::Abs64 => 1,
            RelocKind::Pc32 => 2,
            RelocKind::Plt32 => 4,
            RelocKind::Abs32 => 10,
            RelocKind::Tpoff32 => 23,
        }
    }
}

/// `st_info` packing: `(binding << 4) | type`.
const fn st_info(binding: SymbolBinding, ty: SymbolType) -> u8 {
    (binding.bits() << 4) | ty.bits()
}

/// `r_info` packing: `(symbol_index << 32) | relocation_type`.
const fn r_info(sym_index: u32, kind: RelocKind) -> u64 {
    ((sym_index as u64) << 32) | kind.r_type() as u64
}

// ─── Builder records ───────────────────────────────────────

#[derive(Debug, Clone)]
struct SectionDef {
    name: String,
    data: Vec<u8>,
    /// For NOBITS sections, which carry a size but no file data.
    nobits_size: u64,
    align: u64,
    nobits: bool,
}

#[derive(Debug, Clone)]
struct SymbolDef {
    name: String,
    section: Option<String>,
    offset: u64,
    size: u64,
    binding: SymbolBinding,
    ty: SymbolType,
}

#[derive(Debug, Clone)]
struct RelocDef {
    section: String,
    offset: u64,
    symbol: String,
    kind: RelocKind,
    addend: i64,
}

/// Builder for a relocatable ELF64 x86-64 object file.
///
/// # Examples
///
/// ```rust
/// use x64emit::{CodeBuffer, ObjectWriter, SymbolBinding, SymbolType};
///
/// let mut code = CodeBuffer::new();
/// code.emit_ret();
///
/// let mut obj = ObjectWriter::new();
/// obj.add_section(".text", code.into_bytes(), 16);
/// obj.add_symbol("noop", Some(".text"), 0, 1, SymbolBinding::Global, SymbolType::Func);
/// let elf = obj.write().unwrap();
/// assert_eq!(&elf[..4], &[0x7F, b'E', b'L', b'F']);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ObjectWriter {
    file: Option<String>,
    sections: Vec<SectionDef>,
    symbols: Vec<SymbolDef>,
    relocs: Vec<RelocDef>,
}

impl ObjectWriter {
    /// Create an empty object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the source-file name (emitted as an `STT_FILE` symbol).
    pub fn set_file(&mut self, name: &str) {
        self.file = Some(name.to_string());
    }

    /// Register a PROGBITS section with its contents and alignment.
    pub fn add_section(&mut self, name: &str, data: Vec<u8>, align: u64) {
        self.sections.push(SectionDef {
            name: name.to_string(),
            data,
            nobits_size: 0,
            align,
            nobits: false,
        });
    }

    /// Register a NOBITS section (`.bss`/`.tbss`) with its size.
    pub fn add_bss(&mut self, name: &str, size: u64, align: u64) {
        self.sections.push(SectionDef {
            name: name.to_string(),
            data: Vec::new(),
            nobits_size: size,
            align,
            nobits: true,
        });
    }

    /// Register a symbol. `section: None` declares an undefined (external)
    /// symbol; `offset` is the section-relative value.
    pub fn add_symbol(
        &mut self,
        name: &str,
        section: Option<&str>,
        offset: u64,
        size: u64,
        binding: SymbolBinding,
        ty: SymbolType,
    ) {
        self.symbols.push(SymbolDef {
            name: name.to_string(),
            section: section.map(ToString::to_string),
            offset,
            size,
            binding,
            ty,
        });
    }

    /// Register a relocation at `offset` within `section` against `symbol`.
    pub fn add_relocation(
        &mut self,
        section: &str,
        offset: u64,
        symbol: &str,
        kind: RelocKind,
        addend: i64,
    ) {
        self.relocs.push(RelocDef {
            section: section.to_string(),
            offset,
            symbol: symbol.to_string(),
            kind,
            addend,
        });
    }

    fn has_tls(&self) -> bool {
        self.symbols.iter().any(|s| s.ty == SymbolType::Tls)
            || self
                .sections
                .iter()
                .any(|s| s.name == ".tdata" || s.name == ".tbss")
    }

    /// Serialise the object.
    ///
    /// # Errors
    ///
    /// Returns [`EmitError::UnknownSection`] when a symbol or relocation
    /// names a section that was never registered (and is not one of the
    /// standard synthesized ones), or [`EmitError::UnknownSymbol`] when a
    /// relocation names a symbol that was never added.
    pub fn write(&self) -> Result<Vec<u8>, EmitError> {
        // ── content section list, standard order ───────────
        let mut content: Vec<SectionDef> = Vec::new();
        let take = |name: &str, nobits: bool| -> SectionDef {
            self.sections
                .iter()
                .find(|s| s.name == name)
                .cloned()
                .unwrap_or(SectionDef {
                    name: name.to_string(),
                    data: Vec::new(),
                    nobits_size: 0,
                    align: 1,
                    nobits,
                })
        };
        content.push(take(".text", false));
        content.push(take(".data", false));
        content.push(take(".bss", true));
        if self.has_tls() {
            content.push(take(".tdata", false));
            content.push(take(".tbss", true));
        }
        for sec in &self.sections {
            if !content.iter().any(|c| c.name == sec.name) {
                content.push(sec.clone());
            }
        }

        // ── relocation grouping ────────────────────────────
        // `.rela.text` is always part of the section set; other sections
        // get a RELA companion only when they have entries.
        let mut rela_targets: Vec<String> = Vec::new();
        rela_targets.push(".text".to_string());
        for reloc in &self.relocs {
            if !content.iter().any(|c| c.name == reloc.section) {
                return Err(EmitError::UnknownSection {
                    name: reloc.section.clone(),
                });
            }
            if !rela_targets.contains(&reloc.section) {
                rela_targets.push(reloc.section.clone());
            }
        }

        // ── section header indices ─────────────────────────
        // 0 NULL, then content, then RELA companions, then
        // .symtab / .strtab / .shstrtab.
        let content_base = 1u16;
        let rela_base = content_base + content.len() as u16;
        let symtab_index = rela_base + rela_targets.len() as u16;
        let strtab_index = symtab_index + 1;
        let shstrtab_index = strtab_index + 1;
        let shnum = shstrtab_index + 1;

        let section_index = |name: &str| -> Result<u16, EmitError> {
            content
                .iter()
                .position(|c| c.name == name)
                .map(|pos| content_base + pos as u16)
                .ok_or_else(|| EmitError::UnknownSection {
                    name: name.to_string(),
                })
        };

        // ── symbol table ───────────────────────────────────
        let mut strtab = StringTable::new();
        let mut symtab = CodeBuffer::new();
        let mut sym_count: u32 = 0;
        let push_symbol =
            |symtab: &mut CodeBuffer, name_off: u32, info: u8, shndx: u16, value: u64, size: u64| {
                symtab.push_u32(name_off);
                symtab.push_u8(info);
                symtab.push_u8(0);
                symtab.push_u16(shndx);
                symtab.push_u64(value);
                symtab.push_u64(size);
            };

        // Null symbol.
        push_symbol(&mut symtab, 0, 0, SHN_UNDEF, 0, 0);
        sym_count += 1;

        if let Some(ref file) = self.file {
            let off = strtab.add(file);
            push_symbol(
                &mut symtab,
                off,
                st_info(SymbolBinding::Local, SymbolType::File),
                SHN_ABS,
                0,
                0,
            );
            sym_count += 1;
        }

        // One SECTION symbol per content section, for section-relative
        // relocations.
        let mut section_sym_index: Vec<(String, u32)> = Vec::new();
        for (pos, sec) in content.iter().enumerate() {
            section_sym_index.push((sec.name.clone(), sym_count));
            push_symbol(
                &mut symtab,
                0,
                st_info(SymbolBinding::Local, SymbolType::Section),
                content_base + pos as u16,
                0,
                0,
            );
            sym_count += 1;
        }

        // User symbols, locals before globals; `sh_info` must be the index
        // of the first non-local entry.
        let mut user_sym_index: Vec<(String, u32)> = Vec::new();
        let mut ordered: Vec<&SymbolDef> = self
            .symbols
            .iter()
            .filter(|s| s.binding == SymbolBinding::Local)
            .collect();
        let first_global = sym_count + ordered.len() as u32;
        ordered.extend(
            self.symbols
                .iter()
                .filter(|s| s.binding != SymbolBinding::Local),
        );
        for sym in ordered {
            let shndx = match sym.section {
                Some(ref name) => section_index(name)?,
                None => SHN_UNDEF,
            };
            let off = strtab.add(&sym.name);
            user_sym_index.push((sym.name.clone(), sym_count));
            push_symbol(
                &mut symtab,
                off,
                st_info(sym.binding, sym.ty),
                shndx,
                sym.offset,
                sym.size,
            );
            sym_count += 1;
        }

        let lookup_symbol = |name: &str| -> Result<u32, EmitError> {
            user_sym_index
                .iter()
                .chain(section_sym_index.iter())
                .find(|(n, _)| n == name)
                .map(|&(_, idx)| idx)
                .ok_or_else(|| EmitError::UnknownSymbol {
                    name: name.to_string(),
                })
        };

        // ── RELA section payloads ──────────────────────────
        let mut rela_payloads: Vec<CodeBuffer> = Vec::new();
        for target in &rela_targets {
            let mut payload = CodeBuffer::new();
            for reloc in self.relocs.iter().filter(|r| &r.section == target) {
                payload.push_u64(reloc.offset);
                payload.push_u64(r_info(lookup_symbol(&reloc.symbol)?, reloc.kind));
                payload.push_i64(reloc.addend);
            }
            rela_payloads.push(payload);
        }

        // ── string tables ──────────────────────────────────
        let mut shstrtab = StringTable::new();
        let mut name_offsets: Vec<u32> = Vec::new();
        for sec in &content {
            name_offsets.push(shstrtab.add(&sec.name));
        }
        let mut rela_name_offsets: Vec<u32> = Vec::new();
        for target in &rela_targets {
            let mut name = String::from(".rela");
            name.push_str(target);
            rela_name_offsets.push(shstrtab.add(&name));
        }
        let symtab_name = shstrtab.add(".symtab");
        let strtab_name = shstrtab.add(".strtab");
        let shstrtab_name = shstrtab.add(".shstrtab");

        // ── file layout ────────────────────────────────────
        struct Shdr {
            name: u32,
            sh_type: u32,
            flags: u64,
            offset: u64,
            size: u64,
            link: u32,
            info: u32,
            align: u64,
            entsize: u64,
        }

        let mut headers: Vec<Shdr> = Vec::new();
        headers.push(Shdr {
            name: 0,
            sh_type: 0,
            flags: 0,
            offset: 0,
            size: 0,
            link: 0,
            info: 0,
            align: 0,
            entsize: 0,
        });

        let mut offset = EHDR_SIZE;
        // (file offset, bytes) for every chunk of section data to splat.
        let mut chunks: Vec<(u64, Vec<u8>)> = Vec::new();
        let mut place = |data: Vec<u8>, align: u64, offset: &mut u64| -> (u64, u64) {
            let align = align.max(1);
            *offset = offset.div_ceil(align) * align;
            let at = *offset;
            let len = data.len() as u64;
            *offset += len;
            chunks.push((at, data));
            (at, len)
        };

        for (pos, sec) in content.iter().enumerate() {
            let flags = section_flags(&sec.name);
            if sec.nobits {
                let align = sec.align.max(1);
                let at = offset.div_ceil(align) * align;
                headers.push(Shdr {
                    name: name_offsets[pos],
                    sh_type: SHT_NOBITS,
                    flags,
                    offset: at,
                    size: sec.nobits_size,
                    link: 0,
                    info: 0,
                    align,
                    entsize: 0,
                });
            } else {
                let (at, len) = place(sec.data.clone(), sec.align, &mut offset);
                headers.push(Shdr {
                    name: name_offsets[pos],
                    sh_type: SHT_PROGBITS,
                    flags,
                    offset: at,
                    size: len,
                    link: 0,
                    info: 0,
                    align: sec.align.max(1),
                    entsize: 0,
                });
            }
        }

        for (pos, target) in rela_targets.iter().enumerate() {
            let payload = rela_payloads[pos].bytes().to_vec();
            let (at, len) = place(payload, 8, &mut offset);
            headers.push(Shdr {
                name: rela_name_offsets[pos],
                sh_type: SHT_RELA,
                flags: SHF_INFO_LINK,
                offset: at,
                size: len,
                link: symtab_index as u32,
                info: section_index(target)? as u32,
                align: 8,
                entsize: RELA_SIZE,
            });
        }

        let (symtab_at, symtab_len) = place(symtab.into_bytes(), 8, &mut offset);
        headers.push(Shdr {
            name: symtab_name,
            sh_type: SHT_SYMTAB,
            flags: 0,
            offset: symtab_at,
            size: symtab_len,
            link: strtab_index as u32,
            info: first_global,
            align: 8,
            entsize: SYM_SIZE,
        });

        let (strtab_at, strtab_len) = place(strtab.into_bytes(), 1, &mut offset);
        headers.push(Shdr {
            name: strtab_name,
            sh_type: SHT_STRTAB,
            flags: 0,
            offset: strtab_at,
            size: strtab_len,
            link: 0,
            info: 0,
            align: 1,
            entsize: 0,
        });

        let (shstrtab_at, shstrtab_len) = place(shstrtab.into_bytes(), 1, &mut offset);
        headers.push(Shdr {
            name: shstrtab_name,
            sh_type: SHT_STRTAB,
            flags: 0,
            offset: shstrtab_at,
            size: shstrtab_len,
            link: 0,
            info: 0,
            align: 1,
            entsize: 0,
        });

        let e_shoff = offset.div_ceil(8) * 8;

        // ── serialisation ──────────────────────────────────
        let mut out = CodeBuffer::with_capacity((e_shoff + SHDR_SIZE * shnum as u64) as usize);
        out.extend_from_slice(&ELF_MAGIC);
        out.push_u8(ELFCLASS64);
        out.push_u8(ELFDATA2LSB);
        out.push_u8(EV_CURRENT);
        out.push_u8(0); // ELFOSABI_NONE
        out.extend_from_slice(&[0; 8]);
        out.push_u16(ET_REL);
        out.push_u16(EM_X86_64);
        out.push_u32(EV_CURRENT as u32);
        out.push_u64(0); // e_entry
        out.push_u64(0); // e_phoff
        out.push_u64(e_shoff);
        out.push_u32(0); // e_flags
        out.push_u16(EHDR_SIZE as u16);
        out.push_u16(0); // e_phentsize
        out.push_u16(0); // e_phnum
        out.push_u16(SHDR_SIZE as u16);
        out.push_u16(shnum);
        out.push_u16(shstrtab_index);
        debug_assert_eq!(out.len() as u64, EHDR_SIZE);

        for (at, data) in chunks {
            while (out.len() as u64) < at {
                out.push_u8(0);
            }
            out.extend_from_slice(&data);
        }

        while (out.len() as u64) < e_shoff {
            out.push_u8(0);
        }
        for hdr in headers {
            out.push_u32(hdr.name);
            out.push_u32(hdr.sh_type);
            out.push_u64(hdr.flags);
            out.push_u64(0); // sh_addr
            out.push_u64(hdr.offset);
            out.push_u64(hdr.size);
            out.push_u32(hdr.link);
            out.push_u32(hdr.info);
            out.push_u64(hdr.align);
            out.push_u64(hdr.entsize);
        }

        Ok(out.into_bytes())
    }
}

/// Section flags for the standard section names; anything unrecognised is
/// treated as allocated read-only data.
fn section_flags(name: &str) -> u64 {
    match name {
        ".text" => SHF_ALLOC | SHF_EXECINSTR,
        ".data" | ".bss" => SHF_WRITE | SHF_ALLOC,
        ".tdata" | ".tbss" => SHF_WRITE | SHF_ALLOC | SHF_TLS,
        _ => SHF_ALLOC,
    }
}

/// A null-terminated string concatenation with a leading null byte, so
/// offset 0 means "no name".
struct StringTable {
    bytes: Vec<u8>,
}

impl StringTable {
    fn new() -> Self {
        let mut bytes = Vec::new();
        bytes.push(0);
        Self { bytes }
    }

    fn add(&mut self, s: &str) -> u32 {
        let offset = self.bytes.len() as u32;
        self.bytes.extend_from_slice(s.as_bytes());
        self.bytes.push(0);
        offset
    }

    fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
