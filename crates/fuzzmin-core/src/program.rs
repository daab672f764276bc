use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::{Display, Formatter};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Variable(u32);

impl Variable {
    pub fn new(number: u32) -> Self {
        Variable(number)
    }

    pub fn number(self) -> u32 {
        self.0
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Op {
    Nop,
    LoadInt(i64),
    LoadString(String),
    Binary(BinaryOperator),
    CreateObject,
    SetComputedProperty,
    Reassign,
    BeginSwitch,
    BeginSwitchCase,
    BeginSwitchDefaultCase,
    EndSwitch,
}

impl Op {
    pub fn num_inputs(&self) -> usize {
        match self {
            Op::Nop
            | Op::LoadInt(_)
            | Op::LoadString(_)
            | Op::CreateObject
            | Op::BeginSwitchDefaultCase
            | Op::EndSwitch => 0,
            Op::BeginSwitch | Op::BeginSwitchCase => 1,
            Op::Binary(_) | Op::Reassign => 2,
            Op::SetComputedProperty => 3,
        }
    }

    pub fn num_outputs(&self) -> usize {
        match self {
            Op::LoadInt(_) | Op::LoadString(_) | Op::Binary(_) | Op::CreateObject => 1,
            _ => 0,
        }
    }

    pub fn is_switch_marker(&self) -> bool {
        matches!(
            self,
            Op::BeginSwitch | Op::BeginSwitchCase | Op::BeginSwitchDefaultCase | Op::EndSwitch
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub op: Op,
    pub inputs: Vec<Variable>,
    pub outputs: Vec<Variable>,
}

impl Instruction {
    pub fn new(op: Op, inputs: Vec<Variable>, outputs: Vec<Variable>) -> Self {
        Instruction {
            op,
            inputs,
            outputs,
        }
    }

    pub fn nop() -> Self {
        Instruction {
            op: Op::Nop,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn is_nop(&self) -> bool {
        self.op == Op::Nop
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidityErrorKind {
    ArityMismatch,
    UseBeforeDef,
    RedefinedVariable,
    MarkerOutsideSwitch,
    UnterminatedSwitch,
    MissingDefaultCase,
    DuplicateDefaultCase,
}

#[derive(Debug, Clone)]
pub struct ValidityError {
    pub kind: ValidityErrorKind,
    pub index: usize,
    pub message: String,
}

impl ValidityError {
    fn new(kind: ValidityErrorKind, index: usize, message: impl Into<String>) -> Self {
        ValidityError {
            kind,
            index,
            message: message.into(),
        }
    }
}

impl Display for ValidityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "instruction {}: {}", self.index, self.message)
    }
}

impl std::error::Error for ValidityError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    pub(crate) fn from_instructions(instructions: Vec<Instruction>) -> Self {
        Program { instructions }
    }

    pub(crate) fn into_instructions(self) -> Vec<Instruction> {
        self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn validate(&self) -> Result<(), ValidityError> {
        let mut defined = HashSet::<Variable>::new();
        // One entry per open switch: (begin index, default segment seen).
        let mut switches: Vec<(usize, bool)> = Vec::new();

        for (index, instruction) in self.instructions.iter().enumerate() {
            if instruction.inputs.len() != instruction.op.num_inputs()
                || instruction.outputs.len() != instruction.op.num_outputs()
            {
                return Err(ValidityError::new(
                    ValidityErrorKind::ArityMismatch,
                    index,
                    "operand count does not match operation arity",
                ));
            }

            for input in &instruction.inputs {
                if !defined.contains(input) {
                    return Err(ValidityError::new(
                        ValidityErrorKind::UseBeforeDef,
                        index,
                        format!("{input} is used before it is defined"),
                    ));
                }
            }
            for output in &instruction.outputs {
                if !defined.insert(*output) {
                    return Err(ValidityError::new(
                        ValidityErrorKind::RedefinedVariable,
                        index,
                        format!("{output} is defined more than once"),
                    ));
                }
            }

            match instruction.op {
                Op::BeginSwitch => switches.push((index, false)),
                Op::BeginSwitchCase => {
                    if switches.is_empty() {
                        return Err(ValidityError::new(
                            ValidityErrorKind::MarkerOutsideSwitch,
                            index,
                            "case marker outside of a switch",
                        ));
                    }
                }
                Op::BeginSwitchDefaultCase => match switches.last_mut() {
                    None => {
                        return Err(ValidityError::new(
                            ValidityErrorKind::MarkerOutsideSwitch,
                            index,
                            "default marker outside of a switch",
                        ));
                    }
                    Some((_, true)) => {
                        return Err(ValidityError::new(
                            ValidityErrorKind::DuplicateDefaultCase,
                            index,
                            "switch has more than one default segment",
                        ));
                    }
                    Some(seen_default) => seen_default.1 = true,
                },
                Op::EndSwitch => match switches.pop() {
                    None => {
                        return Err(ValidityError::new(
                            ValidityErrorKind::MarkerOutsideSwitch,
                            index,
                            "end marker outside of a switch",
                        ));
                    }
                    Some((_, false)) => {
                        return Err(ValidityError::new(
                            ValidityErrorKind::MissingDefaultCase,
                            index,
                            "switch has no default segment",
                        ));
                    }
                    Some((_, true)) => {}
                },
                _ => {}
            }
        }

        if let Some((begin, _)) = switches.pop() {
            return Err(ValidityError::new(
                ValidityErrorKind::UnterminatedSwitch,
                begin,
                "switch is never closed",
            ));
        }

        Ok(())
    }
}

impl std::ops::Index<usize> for Program {
    type Output = Instruction;

    fn index(&self, index: usize) -> &Instruction {
        &self.instructions[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(number: u32) -> Variable {
        Variable::new(number)
    }

    #[test]
    fn validate_accepts_straight_line_program() {
        let program = Program::from_instructions(vec![
            Instruction::new(Op::LoadInt(1), vec![], vec![var(0)]),
            Instruction::new(Op::LoadInt(2), vec![], vec![var(1)]),
            Instruction::new(
                Op::Binary(BinaryOperator::Add),
                vec![var(0), var(1)],
                vec![var(2)],
            ),
        ]);
        assert!(program.validate().is_ok());
    }

    #[test]
    fn validate_rejects_use_before_def() {
        let program = Program::from_instructions(vec![Instruction::new(
            Op::Binary(BinaryOperator::Add),
            vec![var(0), var(0)],
            vec![var(1)],
        )]);
        let error = program.validate().expect_err("invalid");
        assert_eq!(error.kind, ValidityErrorKind::UseBeforeDef);
        assert_eq!(error.index, 0);
    }

    #[test]
    fn validate_rejects_redefinition() {
        let program = Program::from_instructions(vec![
            Instruction::new(Op::LoadInt(1), vec![], vec![var(0)]),
            Instruction::new(Op::LoadInt(2), vec![], vec![var(0)]),
        ]);
        let error = program.validate().expect_err("invalid");
        assert_eq!(error.kind, ValidityErrorKind::RedefinedVariable);
    }

    #[test]
    fn validate_rejects_arity_mismatch() {
        let program = Program::from_instructions(vec![Instruction::new(
            Op::LoadInt(1),
            vec![],
            vec![],
        )]);
        let error = program.validate().expect_err("invalid");
        assert_eq!(error.kind, ValidityErrorKind::ArityMismatch);
    }

    #[test]
    fn validate_rejects_switch_without_default() {
        let program = Program::from_instructions(vec![
            Instruction::new(Op::LoadInt(1), vec![], vec![var(0)]),
            Instruction::new(Op::BeginSwitch, vec![var(0)], vec![]),
            Instruction::new(Op::BeginSwitchCase, vec![var(0)], vec![]),
            Instruction::new(Op::EndSwitch, vec![], vec![]),
        ]);
        let error = program.validate().expect_err("invalid");
        assert_eq!(error.kind, ValidityErrorKind::MissingDefaultCase);
    }

    #[test]
    fn validate_rejects_duplicate_default() {
        let program = Program::from_instructions(vec![
            Instruction::new(Op::LoadInt(1), vec![], vec![var(0)]),
            Instruction::new(Op::BeginSwitch, vec![var(0)], vec![]),
            Instruction::new(Op::BeginSwitchDefaultCase, vec![], vec![]),
            Instruction::new(Op::BeginSwitchDefaultCase, vec![], vec![]),
            Instruction::new(Op::EndSwitch, vec![], vec![]),
        ]);
        let error = program.validate().expect_err("invalid");
        assert_eq!(error.kind, ValidityErrorKind::DuplicateDefaultCase);
    }

    #[test]
    fn validate_rejects_unterminated_switch() {
        let program = Program::from_instructions(vec![
            Instruction::new(Op::LoadInt(1), vec![], vec![var(0)]),
            Instruction::new(Op::BeginSwitch, vec![var(0)], vec![]),
            Instruction::new(Op::BeginSwitchDefaultCase, vec![], vec![]),
        ]);
        let error = program.validate().expect_err("invalid");
        assert_eq!(error.kind, ValidityErrorKind::UnterminatedSwitch);
        assert_eq!(error.index, 1);
    }

    #[test]
    fn validate_rejects_stray_case_marker() {
        let program = Program::from_instructions(vec![
            Instruction::new(Op::LoadInt(1), vec![], vec![var(0)]),
            Instruction::new(Op::BeginSwitchCase, vec![var(0)], vec![]),
        ]);
        let error = program.validate().expect_err("invalid");
        assert_eq!(error.kind, ValidityErrorKind::MarkerOutsideSwitch);
    }

    #[test]
    fn tombstones_are_valid_anywhere() {
        let program = Program::from_instructions(vec![
            Instruction::new(Op::LoadInt(1), vec![], vec![var(0)]),
            Instruction::nop(),
            Instruction::new(Op::BeginSwitch, vec![var(0)], vec![]),
            Instruction::nop(),
            Instruction::new(Op::BeginSwitchDefaultCase, vec![], vec![]),
            Instruction::nop(),
            Instruction::new(Op::EndSwitch, vec![], vec![]),
        ]);
        assert!(program.validate().is_ok());
    }
}
