//! Multi-pass layout example: expressions that depend on label distances are
//! re-simplified as bytecode sizes settle.
//!
//! Run with: `RUST_LOG=trace cargo run --example multipass`

use asm_expr::{Expr, IntNum, Op, SectionLayout, Sections, SymbolTable};

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .init();

    println!("=== asm_expr multipass example ===\n");

    let mut sections = Sections::new(".text");
    let mut symbols = SymbolTable::new();
    let text = sections.default_section();

    // start:  mov eax, 1         ; 5 bytes
    //         jmp done           ; 2 or 5 bytes, unknown yet
    // body:   times 100 nop      ; 100 bytes
    // done:   ret                ; 1 byte
    // size    equ done - start
    let start = symbols
        .define_label("start", sections.here(text, 1).unwrap(), 1)
        .unwrap();
    sections.append_bytecode(text, Some(5), 1).unwrap();
    let jmp = sections.append_bytecode(text, None, 2).unwrap();
    let body = symbols
        .define_label("body", sections.here(text, 3).unwrap(), 3)
        .unwrap();
    sections.append_bytecode(text, Some(100), 3).unwrap();
    let done = symbols
        .define_label("done", sections.here(text, 4).unwrap(), 4)
        .unwrap();
    sections.append_bytecode(text, Some(1), 4).unwrap();
    let size = symbols
        .define_equ("size", Expr::binary(Op::Sub, done, start, 5).unwrap(), 5)
        .unwrap();

    let exprs = [
        ("jmp displacement", Expr::binary(Op::Sub, done, body, 2).unwrap()),
        (
            "size / 4",
            Expr::binary(Op::Div, size, IntNum::from(4), 6).unwrap(),
        ),
        (
            "done + 16",
            Expr::binary(Op::Add, done, IntNum::from(16), 7).unwrap(),
        ),
    ];

    // Pass 1: the jump size is unknown.
    println!("1. First pass (jmp size unknown):");
    let pass1: Vec<Expr> = {
        let layout = SectionLayout::new(&sections, &symbols);
        exprs
            .iter()
            .map(|(name, e)| {
                let out = e.clone().simplify(Some(&layout));
                println!("   {:<18} {}", name, out.display(&symbols));
                out
            })
            .collect()
    };

    // The displacement fits in a byte, so the short form is chosen.
    let mut disp = pass1[0].clone();
    let short = disp.get_integer(None).is_some_and(|d| *d < IntNum::from(128));
    sections
        .set_bytecode_len(text, jmp, if short { 2 } else { 5 })
        .unwrap();

    // Pass 2: everything but relocations resolves.
    println!("\n2. Second pass (jmp is {} bytes):", if short { 2 } else { 5 });
    let layout = SectionLayout::new(&sections, &symbols);
    for ((name, _), e) in exprs.iter().zip(pass1) {
        let mut out = e.simplify(Some(&layout));
        match out.get_integer(None) {
            Some(value) => println!("   {:<18} = {}", name, value),
            None => {
                let sym = out.extract_symbol(Some(&layout));
                let sym = sym.and_then(|s| symbols.name(s)).unwrap_or("?");
                println!("   {:<18} reloc {} + {}", name, sym, out.display(&symbols));
            }
        }
    }

    println!("\n3. Sections:");
    let mut dump = String::new();
    sections.print(&mut dump, 3, &symbols).unwrap();
    print!("{}", dump);
}
