mod support;

use fp_codegen_core::ir::{CmpPredicate, FnSig, Module, Opcode, StructTy, Ty};
use fp_codegen_core::mir::MachineOpcode;
use pretty_assertions::assert_eq;
use support::ir::{define, s_struct};
use support::mir::{function, listing, lower, lower_err, opcodes};

fn single(
    params: Vec<Ty>,
    ret: Ty,
    body: impl FnOnce(&mut fp_codegen_core::ir::Builder<'_>, &[fp_codegen_core::ir::ValueId]),
) -> Vec<String> {
    let mut module = Module::new("selection");
    define(&mut module, "f", params, ret, body);
    let lowered = lower(&module);
    listing(function(&lowered, "f"))
}

#[test]
fn signed_division_sign_extends_into_rdx() {
    let lines = single(vec![Ty::i32(), Ty::i32()], Ty::i32(), |b, args| {
        let q = b.binary(Opcode::Div, args[0], args[1]);
        b.ret(Some(q));
    });
    assert_eq!(
        lines,
        vec![
            "mov %v0, edx",
            "mov i32 [rbp + 24], edx",
            "mov eax, ecx",
            "cdq",
            "idiv %v0",
            "mov %v1, eax",
            "mov edx, i32 [rbp + 24]",
            "mov eax, %v1",
            "ret",
        ]
    );
}

#[test]
fn unsigned_remainder_zeroes_rdx_and_reads_it_back() {
    let lines = single(vec![Ty::u64(), Ty::u64()], Ty::u64(), |b, args| {
        let r = b.binary(Opcode::Rem, args[0], args[1]);
        b.ret(Some(r));
    });
    assert_eq!(
        lines,
        vec![
            "mov %v0, rdx",
            "mov i64 [rbp + 24], rdx",
            "mov rax, rcx",
            "xor rdx, rdx",
            "div %v0",
            "mov %v1, rdx",
            "mov rdx, i64 [rbp + 24]",
            "mov rax, %v1",
            "ret",
        ]
    );
}

#[test]
fn byte_division_is_widened_to_32_bits() {
    let lines = single(vec![Ty::i8(), Ty::i8()], Ty::i8(), |b, args| {
        let q = b.binary(Opcode::Div, args[0], args[1]);
        b.ret(Some(q));
    });
    assert_eq!(
        lines,
        vec![
            "movsx %v0, cl",
            "movsx %v1, dl",
            "mov i8 [rbp + 24], dl",
            "mov eax, %v0",
            "cdq",
            "idiv %v1",
            "mov %v2, eax",
            "mov dl, i8 [rbp + 24]",
            "mov %v3, %v2",
            "mov al, %v3",
            "ret",
        ]
    );
}

#[test]
fn immediate_left_operand_is_swapped_into_compare() {
    let lines = single(vec![Ty::i32()], Ty::Bool, |b, args| {
        let five = b.module().const_int(Ty::i32(), 5);
        let lt = b.cmp(CmpPredicate::Lt, five, args[0]);
        b.ret(Some(lt));
    });
    assert_eq!(lines, vec!["cmp ecx, 5", "setg %v0", "mov al, %v0", "ret"]);
}

#[test]
fn unsigned_compare_uses_below_above() {
    let lines = single(vec![Ty::u32(), Ty::u32()], Ty::Bool, |b, args| {
        let lt = b.cmp(CmpPredicate::Lt, args[0], args[1]);
        b.ret(Some(lt));
    });
    assert_eq!(lines, vec!["cmp ecx, edx", "setb %v0", "mov al, %v0", "ret"]);
}

#[test]
fn variable_shift_goes_through_cl() {
    let lines = single(vec![Ty::i32(), Ty::i32()], Ty::i32(), |b, args| {
        let shifted = b.binary(Opcode::Shl, args[0], args[1]);
        b.ret(Some(shifted));
    });
    assert_eq!(
        lines,
        vec![
            "mov %v0, ecx",
            "mov i32 [rbp + 16], ecx",
            "mov ecx, edx",
            "shl %v0, cl",
            "mov ecx, i32 [rbp + 16]",
            "mov eax, %v0",
            "ret",
        ]
    );
}

#[test]
fn right_shift_follows_signedness() {
    let signed = single(vec![Ty::i32()], Ty::i32(), |b, args| {
        let three = b.module().const_int(Ty::i32(), 3);
        let shifted = b.binary(Opcode::Shr, args[0], three);
        b.ret(Some(shifted));
    });
    assert_eq!(signed[1], "sar %v0, 3");

    let unsigned = single(vec![Ty::u32()], Ty::u32(), |b, args| {
        let three = b.module().const_int(Ty::u32(), 3);
        let shifted = b.binary(Opcode::Shr, args[0], three);
        b.ret(Some(shifted));
    });
    assert_eq!(unsigned[1], "shr %v0, 3");
}

#[test]
fn multiply_by_constant_uses_a_register() {
    let lines = single(vec![Ty::i64()], Ty::i64(), |b, args| {
        let ten = b.module().const_int(Ty::i64(), 10);
        let product = b.binary(Opcode::Mul, args[0], ten);
        b.ret(Some(product));
    });
    assert_eq!(
        lines,
        vec![
            "mov %v0, rcx",
            "mov %v1, 10",
            "imul %v0, %v1",
            "mov rax, %v0",
            "ret",
        ]
    );
}

#[test]
fn casts_pick_extension_opcodes() {
    let sext = single(vec![Ty::i32()], Ty::i64(), |b, args| {
        let wide = b.cast(Opcode::SExt, args[0], Ty::i64());
        b.ret(Some(wide));
    });
    assert_eq!(sext, vec!["movsx %v0, ecx", "mov rax, %v0", "ret"]);

    let zext = single(vec![Ty::Bool], Ty::u32(), |b, args| {
        let wide = b.cast(Opcode::ZExt, args[0], Ty::u32());
        b.ret(Some(wide));
    });
    assert_eq!(zext, vec!["movzx %v0, cl", "mov eax, %v0", "ret"]);

    let trunc = single(vec![Ty::i64()], Ty::i16(), |b, args| {
        let narrow = b.cast(Opcode::Trunc, args[0], Ty::i16());
        b.ret(Some(narrow));
    });
    assert_eq!(trunc, vec!["mov %v0, rcx", "mov ax, %v0", "ret"]);
}

#[test]
fn pointer_casts_reuse_registers() {
    let lines = single(vec![Ty::ptr(Ty::i8())], Ty::u64(), |b, args| {
        let bits = b.cast(Opcode::PtrToInt, args[0], Ty::u64());
        b.ret(Some(bits));
    });
    assert_eq!(lines, vec!["mov rax, rcx", "ret"]);
}

#[test]
#[should_panic(expected = "invariant violation")]
fn extension_must_widen() {
    single(vec![Ty::i32()], Ty::i32(), |b, args| {
        let same = b.cast(Opcode::SExt, args[0], Ty::i32());
        b.ret(Some(same));
    });
}

#[test]
fn stack_slot_is_addressed_per_use() {
    let lines = single(vec![Ty::i32()], Ty::i32(), |b, args| {
        let slot = b.alloca(Ty::i32());
        b.store(args[0], slot);
        let value = b.load(Ty::i32(), slot);
        b.ret(Some(value));
    });
    assert_eq!(
        lines,
        vec![
            "lea %v0, stack0[4, align 4]",
            "mov i32 [%v0], ecx",
            "lea %v1, stack0[4, align 4]",
            "mov %v2, i32 [%v1]",
            "mov eax, %v2",
            "ret",
        ]
    );
}

#[test]
fn alloca_sizes_arrays_and_counts() {
    let counted = single(vec![], Ty::ptr(Ty::i64()), |b, _| {
        let three = b.module().const_int(Ty::i32(), 3);
        let slot = b.alloca_array(Ty::i64(), three);
        b.ret(Some(slot));
    });
    assert_eq!(counted, vec!["lea rax, stack0[24, align 8]", "ret"]);

    let array = single(vec![], Ty::ptr(Ty::array(Ty::i32(), 10)), |b, _| {
        let slot = b.alloca(Ty::array(Ty::i32(), 10));
        b.ret(Some(slot));
    });
    assert_eq!(array, vec!["lea rax, stack0[40, align 4]", "ret"]);
}

#[test]
#[should_panic(expected = "invariant violation")]
fn alloca_count_must_be_constant() {
    single(vec![Ty::i32()], Ty::ptr(Ty::i8()), |b, args| {
        let slot = b.alloca_array(Ty::i8(), args[0]);
        b.ret(Some(slot));
    });
}

#[test]
fn constant_gep_folds_to_one_displacement() {
    let field = single(vec![Ty::ptr(s_struct())], Ty::ptr(Ty::i8()), |b, args| {
        let zero = b.module().const_int(Ty::i32(), 0);
        let two = b.module().const_int(Ty::i32(), 2);
        let addr = b.gep(Ty::ptr(Ty::i8()), args[0], &[zero, two]);
        b.ret(Some(addr));
    });
    assert_eq!(field, vec!["lea %v0, ptr [rcx + 16]", "mov rax, %v0", "ret"]);

    let element = single(vec![Ty::ptr(s_struct())], Ty::ptr(Ty::i64()), |b, args| {
        let three = b.module().const_int(Ty::i64(), 3);
        let one = b.module().const_int(Ty::i32(), 1);
        let addr = b.gep(Ty::ptr(Ty::i64()), args[0], &[three, one]);
        b.ret(Some(addr));
    });
    assert_eq!(element, vec!["lea %v0, ptr [rcx + 80]", "mov rax, %v0", "ret"]);
}

#[test]
fn gep_offset_beyond_i32_goes_through_an_index_register() {
    let lines = single(vec![Ty::ptr(Ty::i64())], Ty::ptr(Ty::i64()), |b, args| {
        let far = b.module().const_int(Ty::i64(), 1 << 29);
        let addr = b.gep(Ty::ptr(Ty::i64()), args[0], &[far]);
        b.ret(Some(addr));
    });
    assert_eq!(
        lines,
        vec![
            "mov %v0, 4294967296",
            "lea %v1, ptr [rcx + %v0*1]",
            "lea %v2, ptr [%v1]",
            "mov rax, %v2",
            "ret",
        ]
    );
}

#[test]
fn gep_flushes_when_the_folded_sum_overflows() {
    let block = Ty::array(Ty::i8(), 1 << 30);
    let lines = single(vec![Ty::ptr(block.clone())], Ty::ptr(Ty::i8()), |b, args| {
        let one = b.module().const_int(Ty::i64(), 1);
        let half = b.module().const_int(Ty::i64(), 1 << 30);
        let addr = b.gep(Ty::ptr(Ty::i8()), args[0], &[one, half]);
        b.ret(Some(addr));
    });
    assert_eq!(
        lines,
        vec![
            "lea %v0, ptr [rcx + 1073741824]",
            "lea %v1, ptr [%v0 + 1073741824]",
            "mov rax, %v1",
            "ret",
        ]
    );
}

#[test]
fn variable_gep_index_is_scaled_in_the_address() {
    let lines = single(
        vec![Ty::ptr(Ty::i32()), Ty::i32()],
        Ty::ptr(Ty::i32()),
        |b, args| {
            let addr = b.gep(Ty::ptr(Ty::i32()), args[0], &[args[1]]);
            b.ret(Some(addr));
        },
    );
    assert_eq!(
        lines,
        vec![
            "movsx %v0, edx",
            "lea %v1, ptr [rcx + %v0*4]",
            "lea %v2, ptr [%v1]",
            "mov rax, %v2",
            "ret",
        ]
    );

    let unsigned = single(
        vec![Ty::ptr(Ty::i32()), Ty::u32()],
        Ty::ptr(Ty::i32()),
        |b, args| {
            let addr = b.gep(Ty::ptr(Ty::i32()), args[0], &[args[1]]);
            b.ret(Some(addr));
        },
    );
    assert_eq!(unsigned[0], "movzx %v0, edx");
}

#[test]
fn odd_element_size_is_multiplied_out() {
    let triple = Ty::Struct(StructTy::new(vec![Ty::i32(), Ty::i32(), Ty::i32()]));
    let lines = single(
        vec![Ty::ptr(triple.clone()), Ty::i64()],
        Ty::ptr(triple.clone()),
        |b, args| {
            let addr = b.gep(Ty::ptr(triple), args[0], &[args[1]]);
            b.ret(Some(addr));
        },
    );
    assert_eq!(
        lines,
        vec![
            "mov %v0, rdx",
            "mov %v1, 12",
            "imul %v0, %v1",
            "mov %v2, rcx",
            "add %v2, %v0",
            "lea %v3, ptr [%v2]",
            "mov rax, %v3",
            "ret",
        ]
    );
}

#[test]
fn call_preserves_caller_arguments_through_shadow_space() {
    let mut module = Module::new("calls");
    let callee = module.declare_function("callee", FnSig::new(vec![Ty::i32(), Ty::i32()], Ty::i32()));
    let callee = module.func_value(callee);
    define(&mut module, "caller", vec![Ty::i32(), Ty::i32()], Ty::i32(), |b, args| {
        let result = b.call(callee, &[args[1], args[0]]);
        let sum = b.binary(Opcode::Add, result, args[0]);
        b.ret(Some(sum));
    });

    let lowered = lower(&module);
    let caller = function(&lowered, "caller");
    assert_eq!(
        listing(caller),
        vec![
            "mov i32 [rbp + 16], ecx",
            "mov i32 [rbp + 24], edx",
            "mov ecx, i32 [rbp + 24]",
            "mov edx, i32 [rbp + 16]",
            "call @callee",
            "mov %v0, eax",
            "mov ecx, i32 [rbp + 16]",
            "mov edx, i32 [rbp + 24]",
            "mov %v1, %v0",
            "add %v1, ecx",
            "mov eax, %v1",
            "ret",
        ]
    );
    assert_eq!(caller.max_call_stack(), 32);

    let declared = function(&lowered, "callee");
    assert!(declared.flags.is_external);
    assert!(declared.args().is_empty());
}

#[test]
fn intrinsic_calls_target_runtime_routines() {
    let mut module = Module::new("intrinsics");
    let ptr = Ty::ptr(Ty::i8());
    let memcpy = module.declare_function(
        "__builtin_memcpy",
        FnSig::new(vec![ptr.clone(), ptr.clone(), Ty::u64()], ptr.clone()),
    );
    let memcpy = module.func_value(memcpy);
    define(&mut module, "copy", vec![ptr.clone(), ptr.clone(), Ty::u64()], Ty::Void, |b, args| {
        b.call(memcpy, args);
        b.ret(None);
    });

    let lowered = lower(&module);
    assert_eq!(lowered.functions().len(), 1);
    let copy = function(&lowered, "copy");
    assert!(listing(copy).contains(&"call @memcpy".to_string()));
    assert_eq!(opcodes(copy).last(), Some(&MachineOpcode::Ret));
}

#[test]
fn unknown_intrinsic_is_unsupported() {
    let mut module = Module::new("intrinsics");
    let trap = module.declare_function("__builtin_trap", FnSig::new(vec![], Ty::Void));
    let trap = module.func_value(trap);
    define(&mut module, "f", vec![], Ty::Void, |b, _| {
        b.call(trap, &[]);
        b.ret(None);
    });
    assert!(lower_err(&module).is_unsupported());
}

#[test]
fn unsupported_features_are_reported() {
    let mut five_args = Module::new("calls");
    let wide = five_args.declare_function("wide", FnSig::new(vec![Ty::i64(); 5], Ty::Void));
    let wide = five_args.func_value(wide);
    define(&mut five_args, "f", vec![Ty::i64()], Ty::Void, |b, args| {
        b.call(wide, &[args[0]; 5]);
        b.ret(None);
    });
    assert!(lower_err(&five_args).is_unsupported());

    let mut float_add = Module::new("floats");
    define(&mut float_add, "f", vec![], Ty::Void, |b, _| {
        let one = b.module().const_float(Ty::F64, 1.0);
        b.binary(Opcode::FAdd, one, one);
        b.ret(None);
    });
    assert!(lower_err(&float_add).is_unsupported());

    let mut float_param = Module::new("floats");
    define(&mut float_param, "f", vec![Ty::F32], Ty::Void, |b, _| {
        b.ret(None);
    });
    assert!(lower_err(&float_param).is_unsupported());

    let mut big_struct = Module::new("aggregates");
    define(&mut big_struct, "f", vec![Ty::ptr(s_struct())], Ty::Void, |b, args| {
        b.load(s_struct(), args[0]);
        b.ret(None);
    });
    assert!(lower_err(&big_struct).is_unsupported());
}
