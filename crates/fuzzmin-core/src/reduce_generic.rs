use crate::program::{Instruction, Program};
use crate::reduce::{try_tombstone, Reducer};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

/// Removes individually-unnecessary instructions without regard to block
/// structure. One best-effort linear sweep per invocation; the minimizer's
/// fixpoint loop supplies repetition.
#[derive(Debug, Clone)]
pub struct GenericInstructionReducer {
    trial_workers: usize,
}

impl GenericInstructionReducer {
    pub fn new() -> Self {
        GenericInstructionReducer { trial_workers: 1 }
    }

    /// Verifies independent removal candidates concurrently on a pool of
    /// `workers` threads. Acceptance stays serialized against the latest
    /// accepted state.
    pub fn with_parallel_trials(workers: usize) -> Self {
        GenericInstructionReducer {
            trial_workers: workers.max(1),
        }
    }
}

impl Default for GenericInstructionReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for GenericInstructionReducer {
    fn reduce(&self, program: Program, verify: &(dyn Fn(&Program) -> bool + Sync)) -> Program {
        let mut instructions = program.into_instructions();
        if self.trial_workers > 1 {
            reduce_parallel(&mut instructions, verify, self.trial_workers);
        } else {
            reduce_sequential(&mut instructions, verify);
        }
        Program::from_instructions(instructions)
    }
}

fn reduce_sequential(
    instructions: &mut Vec<Instruction>,
    verify: &(dyn Fn(&Program) -> bool + Sync),
) {
    // Consumers sit above their producers, so sweeping from the back tries
    // leaves before the instructions that feed them. Removing a producer
    // with live consumers can never succeed, so those attempts are not made
    // at all.
    for index in (0..instructions.len()).rev() {
        let Some(unit) = removal_unit(instructions, index) else {
            continue;
        };
        try_tombstone(instructions, &unit, verify);
    }
}

fn reduce_parallel(
    instructions: &mut Vec<Instruction>,
    verify: &(dyn Fn(&Program) -> bool + Sync),
    workers: usize,
) {
    let snapshot = instructions.clone();
    let mut units = Vec::new();
    for index in (0..snapshot.len()).rev() {
        if let Some(unit) = removal_unit(&snapshot, index) {
            units.push(unit);
        }
    }

    let pool = ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .expect("rayon pool");
    let verdicts: Vec<bool> = pool.install(|| {
        units
            .par_iter()
            .map(|unit| {
                let mut candidate = snapshot.clone();
                for &index in unit {
                    candidate[index] = Instruction::nop();
                }
                verify(&Program::from_instructions(candidate))
            })
            .collect()
    });

    // The trials above ran against a shared snapshot. Each winner is
    // re-verified against the latest accepted state before it lands, so two
    // removals that only worked in isolation cannot both be applied.
    for (unit, verdict) in units.iter().zip(verdicts) {
        if !verdict {
            continue;
        }
        try_tombstone(instructions, unit, verify);
    }
}

/// The removal unit for `index`: the instruction itself plus, transitively,
/// every live consumer of its outputs, so that tombstoning the unit never
/// leaves a dangling variable reference. Returns `None` for tombstones,
/// for switch markers (those belong to the switch reducer), and for units
/// pinned in place because a marker consumes one of their outputs.
fn removal_unit(instructions: &[Instruction], index: usize) -> Option<Vec<usize>> {
    let instruction = &instructions[index];
    if instruction.is_nop() || instruction.op.is_switch_marker() {
        return None;
    }

    let mut unit = vec![index];
    let mut cursor = 0;
    while cursor < unit.len() {
        let current = unit[cursor];
        cursor += 1;
        for (other, candidate) in instructions.iter().enumerate() {
            if candidate.is_nop() || unit.contains(&other) {
                continue;
            }
            let consumes = instructions[current]
                .outputs
                .iter()
                .any(|output| candidate.inputs.contains(output));
            if consumes {
                unit.push(other);
            }
        }
    }

    if unit
        .iter()
        .any(|&member| instructions[member].op.is_switch_marker())
    {
        return None;
    }
    unit.sort_unstable();
    Some(unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ProgramBuilder;
    use crate::program::BinaryOperator;

    #[test]
    fn unit_groups_producer_with_its_consumers() {
        let mut b = ProgramBuilder::new();
        let a = b.load_int(1);
        let c = b.load_int(2);
        b.binary(a, c, BinaryOperator::Add);
        let program = b.finalize().expect("program");

        let unit = removal_unit(program.instructions(), 0).expect("unit");
        assert_eq!(unit, vec![0, 2]);
    }

    #[test]
    fn unit_is_transitive_through_chains() {
        let mut b = ProgramBuilder::new();
        let a = b.load_int(1);
        let doubled = b.binary(a, a, BinaryOperator::Add);
        b.binary(doubled, doubled, BinaryOperator::Mul);
        let program = b.finalize().expect("program");

        let unit = removal_unit(program.instructions(), 0).expect("unit");
        assert_eq!(unit, vec![0, 1, 2]);
    }

    #[test]
    fn marker_consumers_pin_the_unit() {
        let mut b = ProgramBuilder::new();
        let num = b.load_int(1337);
        b.begin_switch(num);
        b.begin_switch_default_case();
        b.end_switch();
        let program = b.finalize().expect("program");

        assert!(removal_unit(program.instructions(), 0).is_none());
        // Markers themselves are never generic removal candidates.
        assert!(removal_unit(program.instructions(), 1).is_none());
    }

    #[test]
    fn sweep_removes_a_dead_chain() {
        let mut b = ProgramBuilder::new();
        let a = b.load_int(1);
        b.binary(a, a, BinaryOperator::Add);
        let program = b.finalize().expect("program");

        let reduced = GenericInstructionReducer::new().reduce(program, &|_| true);
        assert!(reduced.instructions().iter().all(|instr| instr.is_nop()));
    }
}
