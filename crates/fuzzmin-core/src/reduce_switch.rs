use crate::program::{Instruction, Op, Program, Variable};
use crate::reduce::{try_tombstone, Reducer};
use std::collections::HashSet;
use std::ops::Range;

/// Structural reduction of switch constructs. Segment markers must be
/// removed atomically with their bounded bodies, and a construct keeps
/// exactly one default segment for as long as it exists, so the generic
/// reducer cannot handle any of this.
#[derive(Debug, Default)]
pub struct SwitchCaseReducer;

#[derive(Debug, Clone)]
struct SwitchConstruct {
    begin: usize,
    end: usize,
    cases: Vec<CaseSegment>,
    default_head: usize,
    default_body: Range<usize>,
}

#[derive(Debug, Clone)]
struct CaseSegment {
    head: usize,
    body: Range<usize>,
}

impl Reducer for SwitchCaseReducer {
    fn reduce(&self, program: Program, verify: &(dyn Fn(&Program) -> bool + Sync)) -> Program {
        let mut instructions = program.into_instructions();
        for construct in find_switch_constructs(&instructions) {
            // An enclosing construct may already have taken this one with it.
            if instructions[construct.begin].is_nop() {
                continue;
            }
            reduce_construct(&mut instructions, &construct, verify);
        }
        Program::from_instructions(instructions)
    }
}

fn reduce_construct(
    instructions: &mut [Instruction],
    construct: &SwitchConstruct,
    verify: &(dyn Fn(&Program) -> bool + Sync),
) {
    debug_assert!(matches!(
        instructions[construct.default_head].op,
        Op::BeginSwitchDefaultCase
    ));

    // Most drastic first: a successful collapse or wholesale removal makes
    // the per-segment strategies moot.
    if collapse_to_single_segment(instructions, construct, verify) {
        return;
    }
    if remove_whole_construct(instructions, construct, verify) {
        return;
    }
    remove_individual_cases(instructions, construct, verify);
    empty_default_body(instructions, construct, verify);
}

/// Replaces the entire construct with just one segment's body, spliced in
/// at its original position. Exactly one segment executes at runtime, so
/// each is a plausible candidate; the oracle decides which, if any, holds.
fn collapse_to_single_segment(
    instructions: &mut [Instruction],
    construct: &SwitchConstruct,
    verify: &(dyn Fn(&Program) -> bool + Sync),
) -> bool {
    let mut bodies: Vec<Range<usize>> = construct
        .cases
        .iter()
        .map(|case| case.body.clone())
        .collect();
    bodies.push(construct.default_body.clone());

    for body in bodies {
        let indices: Vec<usize> = (construct.begin..=construct.end)
            .filter(|index| !body.contains(index))
            .collect();
        if !removal_is_reference_safe(instructions, &indices) {
            continue;
        }
        if try_tombstone(instructions, &indices, verify) {
            return true;
        }
    }
    false
}

fn remove_whole_construct(
    instructions: &mut [Instruction],
    construct: &SwitchConstruct,
    verify: &(dyn Fn(&Program) -> bool + Sync),
) -> bool {
    let indices: Vec<usize> = (construct.begin..=construct.end).collect();
    if !removal_is_reference_safe(instructions, &indices) {
        return false;
    }
    try_tombstone(instructions, &indices, verify)
}

/// Tombstones each non-default case (head and body together) independently,
/// leaving the markers, the other cases, and the default segment intact.
fn remove_individual_cases(
    instructions: &mut [Instruction],
    construct: &SwitchConstruct,
    verify: &(dyn Fn(&Program) -> bool + Sync),
) {
    for case in &construct.cases {
        let mut indices = vec![case.head];
        indices.extend(case.body.clone());
        if !removal_is_reference_safe(instructions, &indices) {
            continue;
        }
        try_tombstone(instructions, &indices, verify);
    }
}

/// Tombstones the default segment's body while always retaining the marker:
/// an empty default shell is the minimal legal form of the segment.
fn empty_default_body(
    instructions: &mut [Instruction],
    construct: &SwitchConstruct,
    verify: &(dyn Fn(&Program) -> bool + Sync),
) {
    let indices: Vec<usize> = construct.default_body.clone().collect();
    if indices.is_empty() || !removal_is_reference_safe(instructions, &indices) {
        return;
    }
    try_tombstone(instructions, &indices, verify);
}

/// Variables are flat-scoped, so a segment body may define values consumed
/// beyond the candidate removal. Such candidates would be structurally
/// invalid and are skipped before the oracle ever sees them.
fn removal_is_reference_safe(instructions: &[Instruction], indices: &[usize]) -> bool {
    let removed_defs: HashSet<Variable> = indices
        .iter()
        .flat_map(|&index| instructions[index].outputs.iter().copied())
        .collect();
    if removed_defs.is_empty() {
        return true;
    }

    instructions
        .iter()
        .enumerate()
        .filter(|(index, instruction)| !indices.contains(index) && !instruction.is_nop())
        .all(|(_, instruction)| {
            instruction
                .inputs
                .iter()
                .all(|input| !removed_defs.contains(input))
        })
}

/// All switch constructs in the arena, outermost first. Only constructs
/// with an intact default segment are returned; anything else has already
/// been dismantled.
fn find_switch_constructs(instructions: &[Instruction]) -> Vec<SwitchConstruct> {
    let mut open = Vec::new();
    let mut spans = Vec::new();
    for (index, instruction) in instructions.iter().enumerate() {
        match instruction.op {
            Op::BeginSwitch => open.push(index),
            Op::EndSwitch => {
                if let Some(begin) = open.pop() {
                    spans.push((begin, index));
                }
            }
            _ => {}
        }
    }
    spans.sort_unstable_by_key(|&(begin, _)| begin);

    spans
        .into_iter()
        .filter_map(|(begin, end)| parse_construct(instructions, begin, end))
        .collect()
}

fn parse_construct(
    instructions: &[Instruction],
    begin: usize,
    end: usize,
) -> Option<SwitchConstruct> {
    let mut cases = Vec::new();
    let mut default: Option<(usize, Range<usize>)> = None;
    let mut open: Option<(usize, bool)> = None;
    let mut depth = 0usize;

    for index in begin + 1..end {
        match instructions[index].op {
            Op::BeginSwitch => depth += 1,
            Op::EndSwitch => depth = depth.saturating_sub(1),
            Op::BeginSwitchCase | Op::BeginSwitchDefaultCase if depth == 0 => {
                close_segment(&mut cases, &mut default, open.take(), index);
                let is_default = matches!(instructions[index].op, Op::BeginSwitchDefaultCase);
                open = Some((index, is_default));
            }
            _ => {}
        }
    }
    close_segment(&mut cases, &mut default, open.take(), end);

    let (default_head, default_body) = default?;
    Some(SwitchConstruct {
        begin,
        end,
        cases,
        default_head,
        default_body,
    })
}

fn close_segment(
    cases: &mut Vec<CaseSegment>,
    default: &mut Option<(usize, Range<usize>)>,
    open: Option<(usize, bool)>,
    until: usize,
) {
    let Some((head, is_default)) = open else {
        return;
    };
    let body = head + 1..until;
    if is_default {
        default.get_or_insert((head, body));
    } else {
        cases.push(CaseSegment { head, body });
    }
}
