use std::collections::HashSet;

use fp_codegen_core::mir::{MBlockId, MachineOpcode, OperandId};
use fp_codegen_core::{invariant, Result};
use tracing::debug;

use crate::context::LoweringContext;

/// Copies into one predecessor, in phi order.
struct EdgeCopies {
    block: MBlockId,
    copies: Vec<(OperandId, OperandId)>,
}

impl LoweringContext<'_> {
    /// Second pass over a function: turn each pending phi into one copy per
    /// incoming edge, placed before the predecessor's first terminator.
    pub(crate) fn resolve_pending_phis(&mut self) -> Result<()> {
        let module = self.module;
        let pending = std::mem::take(&mut self.pending_phis);
        let mut edges: Vec<EdgeCopies> = Vec::new();

        for phi in pending {
            let inst = module.inst(phi);
            let dst = self
                .lookup_value(inst.value)
                .unwrap_or_else(|| invariant!("phi {} has no register", inst.value));
            for (value, pred) in inst.phi_incoming() {
                let pred = module.block_of(pred);
                let block = self.block_map.get(&pred).copied().unwrap_or_else(|| {
                    invariant!("phi {} names {pred}, which was never lowered", inst.value)
                });
                let src = self.resolve(value)?;
                match edges.iter_mut().find(|edge| edge.block == block) {
                    Some(edge) => edge.copies.push((dst, src)),
                    None => edges.push(EdgeCopies {
                        block,
                        copies: vec![(dst, src)],
                    }),
                }
            }
        }

        for edge in edges {
            debug!(block = %edge.block, copies = edge.copies.len(), "placing phi copies");
            self.place_copies(edge)?;
        }
        Ok(())
    }

    fn place_copies(&mut self, edge: EdgeCopies) -> Result<()> {
        let targets: HashSet<OperandId> = edge.copies.iter().map(|(dst, _)| *dst).collect();
        let overlapping = edge
            .copies
            .iter()
            .any(|(dst, src)| src != dst && targets.contains(src));
        if !overlapping {
            for (dst, src) in edge.copies {
                self.insert_copy(edge.block, dst, src)?;
            }
            return Ok(());
        }

        // A source is overwritten by an earlier copy on the same edge: read
        // every source into a temporary before writing any destination.
        let mut staged = Vec::with_capacity(edge.copies.len());
        for (dst, src) in edge.copies {
            let ty = self.ty_of(dst);
            let temp = self.new_vreg(ty)?;
            self.insert_copy(edge.block, temp, src)?;
            staged.push((dst, temp));
        }
        for (dst, temp) in staged {
            self.insert_copy(edge.block, dst, temp)?;
        }
        Ok(())
    }

    fn insert_copy(&mut self, block: MBlockId, dst: OperandId, src: OperandId) -> Result<()> {
        let opcode = if self.operand(src).needs_address() {
            MachineOpcode::Lea
        } else {
            MachineOpcode::Mov
        };
        self.func_mut()
            .insert_before_terminator(block, opcode, vec![dst, src])
    }
}
