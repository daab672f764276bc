use crate::evaluator::Evaluator;
use crate::program::{Instruction, Program, Variable};
use crate::reduce::Reducer;
use crate::reduce_generic::GenericInstructionReducer;
use crate::reduce_switch::SwitchCaseReducer;
use std::collections::HashMap;

/// Drives an ordered pipeline of reducers to a fixpoint and compacts the
/// result. Reducers are mutually enabling (removing a switch case frees the
/// values feeding its condition, and vice versa), so the whole pipeline is
/// repeated until a full pass changes nothing.
#[derive(Debug)]
pub struct Minimizer {
    reducers: Vec<Box<dyn Reducer>>,
}

impl Minimizer {
    pub fn new() -> Self {
        Self::with_reducers(vec![
            Box::new(GenericInstructionReducer::new()),
            Box::new(SwitchCaseReducer),
        ])
    }

    pub fn with_reducers(reducers: Vec<Box<dyn Reducer>>) -> Self {
        Minimizer { reducers }
    }

    /// Shrinks `program` while the evaluator keeps confirming the reference
    /// aspects. A program that does not reproduce its own aspects on entry
    /// is still processed best-effort and comes back unchanged.
    pub fn minimize<E: Evaluator>(
        &self,
        evaluator: &E,
        program: &Program,
        aspects: &E::Aspects,
    ) -> Program {
        let verify = |candidate: &Program| {
            let execution = evaluator.execute(candidate);
            evaluator.has_aspects(&execution, aspects)
        };

        let mut current = program.clone();
        loop {
            let mut changed = false;
            for reducer in &self.reducers {
                let reduced = reducer.reduce(current.clone(), &verify);
                debug_assert!(
                    reduced.validate().is_ok(),
                    "reducer produced an invalid program"
                );
                if reduced != current {
                    current = reduced;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        compact(&current)
    }
}

impl Default for Minimizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Strips tombstones and renumbers variables densely in definition order.
/// Run only once reduction has settled, so instruction indices stay stable
/// reference points across an entire pass of speculative edits.
fn compact(program: &Program) -> Program {
    let mut remap = HashMap::<Variable, Variable>::new();
    let mut next = 0u32;
    let mut instructions = Vec::new();

    for instruction in program.instructions() {
        if instruction.is_nop() {
            continue;
        }
        // Def-before-use holds for every program a reducer accepts, so each
        // input already has a remapping.
        let inputs = instruction
            .inputs
            .iter()
            .map(|input| remap[input])
            .collect::<Vec<_>>();
        let outputs = instruction
            .outputs
            .iter()
            .map(|output| {
                let fresh = Variable::new(next);
                next += 1;
                remap.insert(*output, fresh);
                fresh
            })
            .collect::<Vec<_>>();
        instructions.push(Instruction::new(instruction.op.clone(), inputs, outputs));
    }

    Program::from_instructions(instructions)
}
