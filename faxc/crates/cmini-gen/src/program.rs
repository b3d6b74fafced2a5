//! Top-level program framing (§4.4): `.data`/`.bss`/`.rodata`/`.text`
//! sections around the per-function code the [`crate::generator`] emits.

use crate::emit::{instr, label, line};
use crate::error::Result;
use crate::generator::{width_index, string_label, Generator, ARG_REGS};
use cmini_par::{Function, Program, Storage};
use cmini_sem::store_width;
use cmini_util::Width;
use std::io::{self, Write};

/// Generates the full assembly text for `program` and writes it to `out`.
///
/// Globals are split between `.bss` (uninitialized storage, per §4.4; this
/// language has no global initializers) and `.rodata` (string literals,
/// only emitted when the program actually has any). Every function lands in
/// `.text` after a single shared `.intel_syntax noprefix` header.
pub fn generate<W: Write>(program: &Program, out: &mut W) -> Result<()> {
    log::debug!(
        "generating code for {} function(s), {} global(s), {} string literal(s)",
        program.functions.len(),
        program.globals.iter().count(),
        program.strings.len()
    );
    let mut gen = Generator::new();
    line!(&mut gen.out, ".intel_syntax noprefix");

    if program.globals.iter().next().is_some() {
        line!(&mut gen.out, ".bss");
        for global in program.globals.iter() {
            if let Storage::Global { label } = &global.storage {
                line!(&mut gen.out, ".global {label}");
                line!(&mut gen.out, "{label}:");
                line!(&mut gen.out, "  .zero {}", global.ty.size());
            }
        }
    }

    if !program.strings.is_empty() {
        line!(&mut gen.out, ".section .rodata");
        for (id, text) in program.strings.iter().enumerate() {
            line!(&mut gen.out, "{}:", string_label(id as u32));
            line!(&mut gen.out, "  .string \"{}\"", escape_rodata(text));
        }
    }

    line!(&mut gen.out, ".text");
    line!(&mut gen.out, ".global main");
    for function in &program.functions {
        gen_function(&mut gen, function)?;
    }

    let asm = gen.finish();
    out.write_all(asm.as_bytes())
        .map_err(|e: io::Error| e.into())
}

fn gen_function(gen: &mut Generator, func: &Function) -> Result<()> {
    line!(&mut gen.out, "{}:", func.name);
    instr(&mut gen.out, format_args!("push rbp"));
    instr(&mut gen.out, format_args!("mov rbp, rsp"));
    instr(&mut gen.out, format_args!("sub rsp, {}", func.env.max_offset()));

    // `parse_function` rejects a seventh parameter, so `i` never exceeds
    // `ARG_REGS`'s six entries here.
    for (i, param) in func.params.iter().enumerate() {
        let Storage::Local { offset } = &param.storage else {
            continue;
        };
        // Parameters are parsed with `parse_base_type`, which never yields
        // an array, so every parameter type has a concrete load/store width.
        let width = store_width(&param.ty, cmini_util::Span::at(0))
            .expect("parameter types are never array-typed");
        let reg = ARG_REGS[i][width_index(width)];
        match width {
            Width::Byte => {
                instr(&mut gen.out, format_args!("mov byte ptr [rbp-{offset}], {reg}"));
            }
            Width::Dword => {
                instr(&mut gen.out, format_args!("mov dword ptr [rbp-{offset}], {reg}"));
            }
            Width::Qword => {
                instr(&mut gen.out, format_args!("mov [rbp-{offset}], {reg}"));
            }
        }
    }

    gen.gen_stmt(&func.body)?;
    instr(&mut gen.out, format_args!("pop rax"));
    gen.emit_epilogue();
    Ok(())
}

/// Escapes the two characters GNU assembler `.string` directives treat
/// specially; the lexer already rejects unterminated/invalid escapes, so
/// every text here has already round-tripped through valid source syntax.
fn escape_rodata(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
