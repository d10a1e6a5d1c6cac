use std::fmt::{self, Formatter};

use itertools::Itertools;

use super::{
    MachineFunction, MachineGlobal, MachineInst, MachineModule, MachineType, MemRef, OperandId,
    OperandKind, Reg,
};
use crate::pretty::{PrettyCtx, PrettyPrintable};

impl PrettyPrintable for MachineModule {
    fn fmt_pretty(&self, f: &mut Formatter<'_>, ctx: &mut PrettyCtx<'_>) -> fmt::Result {
        ctx.writeln(f, format!("mir::Module {} {{", self.name))?;
        ctx.with_indent(|ctx| {
            for global in self.globals() {
                write_global(global, f, ctx)?;
            }
            for func in self.functions() {
                func.fmt_pretty(f, ctx)?;
            }
            Ok(())
        })?;
        ctx.writeln(f, "}")
    }
}

fn write_global(global: &MachineGlobal, f: &mut Formatter<'_>, ctx: &mut PrettyCtx<'_>) -> fmt::Result {
    let bytes = global.data.iter().map(|b| format!("{b:02x}")).join(" ");
    ctx.writeln(
        f,
        format!("@{} align {} = [{}]", global.name, global.align, bytes),
    )?;
    ctx.with_indent(|ctx| {
        for reloc in &global.relocations {
            ctx.writeln(f, format!("reloc +{} -> @{}", reloc.offset, reloc.symbol))?;
        }
        Ok(())
    })
}

impl PrettyPrintable for MachineFunction {
    fn fmt_pretty(&self, f: &mut Formatter<'_>, ctx: &mut PrettyCtx<'_>) -> fmt::Result {
        let show_types = ctx.options.show_types;
        let args = self
            .arg_types
            .iter()
            .enumerate()
            .map(|(idx, ty)| match self.arg(idx) {
                Some(op) => format!("{}: {}", format_operand(self, op, show_types), ty),
                None => ty.to_string(),
            })
            .join(", ");
        let mut header = format!("fn {}({}) -> {}", self.name, args, self.ret_ty);
        if self.flags.is_vararg {
            header.push_str(" vararg");
        }
        if self.flags.is_external {
            return ctx.writeln(f, format!("declare {header}"));
        }
        if self.max_call_stack() > 0 {
            header.push_str(&format!(" [call stack {}]", self.max_call_stack()));
        }
        ctx.writeln(f, format!("{header} {{"))?;
        for (_, block) in self.blocks() {
            ctx.writeln(f, format!("{}:", block.name))?;
            ctx.with_indent(|ctx| {
                for inst in &block.insts {
                    ctx.writeln(f, format_inst(self, inst, show_types))?;
                }
                Ok(())
            })?;
        }
        ctx.writeln(f, "}")
    }
}

pub fn format_inst(func: &MachineFunction, inst: &MachineInst, show_types: bool) -> String {
    let operands = inst
        .operands
        .iter()
        .map(|op| format_operand(func, *op, show_types))
        .join(", ");
    if operands.is_empty() {
        inst.opcode.mnemonic()
    } else {
        format!("{} {}", inst.opcode.mnemonic(), operands)
    }
}

pub fn format_operand(func: &MachineFunction, id: OperandId, show_types: bool) -> String {
    let operand = func.operand(id);
    let typed = |text: String| {
        if show_types && operand.ty != MachineType::Void {
            format!("{text}:{}", operand.ty)
        } else {
            text
        }
    };
    match &operand.kind {
        OperandKind::HwReg(reg) => reg.name(operand.ty).to_string(),
        OperandKind::VReg(vreg) => typed(vreg.to_string()),
        OperandKind::StackObject { id, size, align } => format!("{id}[{size}, align {align}]"),
        OperandKind::Symbol(name) => format!("@{name}"),
        OperandKind::Imm(value) => typed(value.to_string()),
        OperandKind::Mem(mem) => format!("{} {}", operand.ty, format_mem(mem)),
        OperandKind::Block(block) => func.block(*block).name.clone(),
    }
}

fn format_reg(reg: Reg) -> String {
    match reg {
        Reg::Hw(hw) => hw.name(MachineType::I64).to_string(),
        Reg::Virtual(vreg) => vreg.to_string(),
    }
}

fn format_mem(mem: &MemRef) -> String {
    let mut text = format!("[{}", format_reg(mem.base));
    if let Some(index) = mem.index {
        text.push_str(&format!(" + {}*{}", format_reg(index), mem.scale));
    }
    if mem.disp > 0 {
        text.push_str(&format!(" + {}", mem.disp));
    } else if mem.disp < 0 {
        text.push_str(&format!(" - {}", -(mem.disp as i64)));
    }
    text.push(']');
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mir::{FunctionFlags, HwReg, MachineOpcode};
    use crate::pretty::{pretty, PrettyOptions};

    #[test]
    fn renders_function_listing() {
        let mut func = MachineFunction::new(
            "id",
            MachineType::I32,
            vec![MachineType::I32],
            FunctionFlags::default(),
        );
        let arg = func.hw_reg(HwReg::Rcx, MachineType::I32).unwrap();
        func.set_args(vec![arg]);
        let entry = func.create_block("entry").unwrap();
        func.append_block(entry).unwrap();
        let ret = func.hw_reg(HwReg::Rax, MachineType::I32).unwrap();
        let slot = func
            .mem(MemRef::base(Reg::Hw(HwReg::Rbp)).with_disp(16), MachineType::I32)
            .unwrap();
        func.append_inst(entry, MachineOpcode::Mov, vec![slot, arg])
            .unwrap();
        func.append_inst(entry, MachineOpcode::Mov, vec![ret, arg])
            .unwrap();
        func.append_inst(entry, MachineOpcode::Ret, Vec::new())
            .unwrap();
        func.seal();

        let text = pretty(&func, PrettyOptions::default()).to_string();
        assert_eq!(
            text,
            "fn id(ecx: i32) -> i32 {\nentry:\n    mov i32 [rbp + 16], ecx\n    mov eax, ecx\n    ret\n}\n"
        );
    }
}
