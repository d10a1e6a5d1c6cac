use fp_codegen_core::ir::{Builder, FnSig, FuncId, Module, Opcode, StructTy, Ty, ValueId};

/// Define `name` with a single `entry` block filled in by `body`.
pub fn define(
    module: &mut Module,
    name: &str,
    params: Vec<Ty>,
    ret: Ty,
    body: impl FnOnce(&mut Builder<'_>, &[ValueId]),
) -> FuncId {
    let func = module.define_function(name, FnSig::new(params, ret));
    let entry = module.append_block(func, Some("entry"));
    let args: Vec<ValueId> = (0..module.function(func).params.len())
        .map(|index| module.arg(func, index))
        .collect();
    let mut builder = Builder::new(module);
    builder.position_at_end(entry);
    body(&mut builder, &args);
    func
}

/// `int add(int a, int b) { return a + b; }`
pub fn add_module() -> Module {
    let mut module = Module::new("scenario");
    define(&mut module, "add", vec![Ty::i32(), Ty::i32()], Ty::i32(), |b, args| {
        let sum = b.binary(Opcode::Add, args[0], args[1]);
        b.ret(Some(sum));
    });
    module
}

/// `int pick(bool c, int a, int b) { return c ? a + 1 : b - 1; }` as a
/// diamond joined by a phi.
pub fn diamond_module() -> Module {
    let mut module = Module::new("diamond");
    let func = module.define_function(
        "pick",
        FnSig::new(vec![Ty::Bool, Ty::i32(), Ty::i32()], Ty::i32()),
    );
    let entry = module.append_block(func, Some("entry"));
    let then_bb = module.append_block(func, Some("then"));
    let else_bb = module.append_block(func, Some("else"));
    let join = module.append_block(func, Some("join"));
    let (cond, a, b) = (module.arg(func, 0), module.arg(func, 1), module.arg(func, 2));
    let one = module.const_int(Ty::i32(), 1);

    let mut builder = Builder::new(&mut module);
    builder.position_at_end(entry);
    builder.cond_br(cond, then_bb, else_bb);

    builder.position_at_end(then_bb);
    let v1 = builder.binary(Opcode::Add, a, one);
    builder.br(join);

    builder.position_at_end(else_bb);
    let v2 = builder.binary(Opcode::Sub, b, one);
    builder.br(join);

    builder.position_at_end(join);
    let x = builder.phi(Ty::i32(), &[(v1, then_bb), (v2, else_bb)]);
    builder.ret(Some(x));
    module
}

/// `struct S { i32 a; i64 b; i8 c; }`: offsets 0, 8, 16, size 24.
pub fn s_struct() -> Ty {
    Ty::Struct(StructTy::named("S", vec![Ty::i32(), Ty::i64(), Ty::i8()]))
}
