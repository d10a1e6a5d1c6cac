mod support;

use fp_codegen_core::ir::{FnSig, Module, Ty};
use fp_codegen_core::mir::{HwReg, MachineOpcode, MachineType, OperandKind};
use fp_codegen_core::pretty::{pretty, PrettyOptions};
use pretty_assertions::assert_eq;
use support::ir::{add_module, diamond_module};
use support::mir::{block_listing, function, listing, lower, opcodes};

#[test]
fn add_binds_arguments_and_returns_through_rax() {
    let module = lower(&add_module());
    let add = function(&module, "add");

    let args: Vec<_> = add.args().iter().map(|arg| add.operand(*arg).clone()).collect();
    assert_eq!(args[0].kind, OperandKind::HwReg(HwReg::Rcx));
    assert_eq!(args[1].kind, OperandKind::HwReg(HwReg::Rdx));
    assert_eq!(args[0].ty, MachineType::I32);

    assert_eq!(
        listing(add),
        vec!["mov %v0, ecx", "add %v0, edx", "mov eax, %v0", "ret"]
    );
    assert_eq!(add.max_call_stack(), 0);
    assert!(add.is_sealed());
}

#[test]
fn add_prints_as_a_module_listing() {
    let module = lower(&add_module());
    let text = pretty(&module, PrettyOptions::default()).to_string();
    assert_eq!(
        text,
        "mir::Module scenario {\n\
         \x20   fn add(ecx: i32, edx: i32) -> i32 {\n\
         \x20   entry:\n\
         \x20       mov %v0:i32, ecx\n\
         \x20       add %v0:i32, edx\n\
         \x20       mov eax, %v0:i32\n\
         \x20       ret\n\
         \x20   }\n\
         }\n"
    );
}

#[test]
fn diamond_phi_becomes_predecessor_copies() {
    let module = lower(&diamond_module());
    let pick = function(&module, "pick");

    assert_eq!(
        block_listing(pick, "entry"),
        vec!["test cl, cl", "je else", "jmp then"]
    );
    assert_eq!(
        block_listing(pick, "then"),
        vec!["mov %v0, edx", "add %v0, 1", "mov %v2, %v0", "jmp join"]
    );
    assert_eq!(
        block_listing(pick, "else"),
        vec!["mov %v1, r8d", "sub %v1, 1", "mov %v2, %v1", "jmp join"]
    );
    assert_eq!(block_listing(pick, "join"), vec!["mov eax, %v2", "ret"]);
}

#[test]
fn no_phi_survives_lowering() {
    let module = lower(&diamond_module());
    let pick = function(&module, "pick");
    let copies = opcodes(pick)
        .into_iter()
        .filter(|opcode| *opcode == MachineOpcode::Mov)
        .count();
    // two argument copies, two phi copies, one return copy
    assert_eq!(copies, 5);
    for (_, block) in pick.blocks() {
        let last = block.insts.last().expect("non-empty block");
        assert!(last.opcode.is_terminator(), "{} ends without a terminator", block.name);
    }
}

#[test]
fn variadic_declaration_lowers_to_a_typed_shell() {
    let mut source = Module::new("externs");
    source.declare_function(
        "printf",
        FnSig::new(vec![Ty::ptr(Ty::i8())], Ty::i32()).variadic(),
    );

    let module = lower(&source);
    let printf = function(&module, "printf");
    assert!(printf.flags.is_vararg);
    assert!(printf.flags.is_external);
    assert_eq!(printf.arg_types, vec![MachineType::Ptr]);
    assert!(printf.args().is_empty());
    assert_eq!(printf.blocks().count(), 0);
    assert_eq!(
        pretty(printf, PrettyOptions::default()).to_string(),
        "declare fn printf(ptr) -> i32 vararg\n"
    );
}
