use crate::program::{Instruction, Program};

/// A single shrinking strategy. Reducers receive the current best program
/// and a verification callback, and return a (possibly identical)
/// replacement in which every accepted edit has been confirmed by the
/// callback. Rejected edits leave no trace.
pub trait Reducer: std::fmt::Debug {
    fn reduce(&self, program: Program, verify: &(dyn Fn(&Program) -> bool + Sync)) -> Program;
}

/// Tombstones the given instructions, keeps the edit if the candidate still
/// verifies, and rolls it back otherwise. Index sets that are already all
/// tombstones are skipped without spending an execution.
pub(crate) fn try_tombstone(
    instructions: &mut [Instruction],
    indices: &[usize],
    verify: &(dyn Fn(&Program) -> bool + Sync),
) -> bool {
    if indices.iter().all(|&index| instructions[index].is_nop()) {
        return false;
    }

    let saved: Vec<(usize, Instruction)> = indices
        .iter()
        .map(|&index| {
            (
                index,
                std::mem::replace(&mut instructions[index], Instruction::nop()),
            )
        })
        .collect();

    if verify(&Program::from_instructions(instructions.to_vec())) {
        return true;
    }

    for (index, instruction) in saved {
        instructions[index] = instruction;
    }
    false
}
