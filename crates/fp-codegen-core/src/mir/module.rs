use bytes::{BufMut, Bytes};
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

use super::MachineFunction;
use crate::error::{try_push, Result};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[display("mfn{_0}")]
pub struct MFuncId(pub u32);

/// Symbol fix-up at `offset` bytes into a global's data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relocation {
    pub offset: u64,
    pub symbol: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineGlobal {
    pub name: String,
    pub align: u32,
    pub data: Bytes,
    pub relocations: Vec<Relocation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineModule {
    pub name: String,
    globals: Vec<MachineGlobal>,
    functions: Vec<MachineFunction>,
}

impl MachineModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Start a global; its data is committed by [`GlobalBuilder::finish`].
    pub fn begin_global(&mut self, name: impl Into<String>, align: u32) -> GlobalBuilder<'_> {
        GlobalBuilder {
            module: self,
            name: name.into(),
            align,
            data: Vec::new(),
            relocations: Vec::new(),
        }
    }

    /// Add a finished function.
    pub fn push_function(&mut self, func: MachineFunction) -> Result<MFuncId> {
        ensure_invariant!(
            func.is_sealed(),
            "machine function {} added before it was sealed",
            func.name
        );
        let index = try_push(&mut self.functions, func)?;
        Ok(MFuncId(index as u32))
    }

    pub fn function(&self, id: MFuncId) -> &MachineFunction {
        self.functions
            .get(id.0 as usize)
            .unwrap_or_else(|| invariant!("dangling machine function {id}"))
    }

    pub fn functions(&self) -> &[MachineFunction] {
        &self.functions
    }

    pub fn function_by_name(&self, name: &str) -> Option<&MachineFunction> {
        self.functions.iter().find(|func| func.name == name)
    }

    pub fn globals(&self) -> &[MachineGlobal] {
        &self.globals
    }

    pub fn global_by_name(&self, name: &str) -> Option<&MachineGlobal> {
        self.globals.iter().find(|global| global.name == name)
    }
}

pub struct GlobalBuilder<'a> {
    module: &'a mut MachineModule,
    name: String,
    align: u32,
    data: Vec<u8>,
    relocations: Vec<Relocation>,
}

impl GlobalBuilder<'_> {
    /// Append raw bytes, returning the offset they start at.
    pub fn append_data(&mut self, bytes: &[u8]) -> Result<u64> {
        self.data.try_reserve(bytes.len())?;
        let offset = self.len();
        self.data.put_slice(bytes);
        Ok(offset)
    }

    pub fn append_zeros(&mut self, count: u64) -> Result<u64> {
        let count = usize::try_from(count)
            .map_err(|_| crate::Error::Allocation(format!("{count} zero bytes")))?;
        self.data.try_reserve(count)?;
        let offset = self.len();
        self.data.put_bytes(0, count);
        Ok(offset)
    }

    pub fn add_relocation(&mut self, offset: u64, symbol: impl Into<String>) -> Result<()> {
        ensure_invariant!(
            offset + 8 <= self.len(),
            "relocation at {offset} lies outside the {} bytes of {}",
            self.len(),
            self.name
        );
        try_push(
            &mut self.relocations,
            Relocation {
                offset,
                symbol: symbol.into(),
            },
        )?;
        Ok(())
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn finish(self) -> Result<()> {
        let global = MachineGlobal {
            name: self.name,
            align: self.align,
            data: Bytes::from(self.data),
            relocations: self.relocations,
        };
        try_push(&mut self.module.globals, global)?;
        Ok(())
    }
}
