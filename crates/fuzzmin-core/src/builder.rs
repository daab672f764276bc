use crate::program::{BinaryOperator, Instruction, Op, Program, ValidityError, Variable};

#[derive(Debug, Default)]
pub struct ProgramBuilder {
    instructions: Vec<Instruction>,
    next_variable: u32,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the next appended instruction will occupy.
    pub fn next_instruction_index(&self) -> usize {
        self.instructions.len()
    }

    pub fn append(&mut self, op: Op, inputs: &[Variable]) -> Vec<Variable> {
        let outputs = (0..op.num_outputs())
            .map(|_| self.new_variable())
            .collect::<Vec<_>>();
        self.instructions
            .push(Instruction::new(op, inputs.to_vec(), outputs.clone()));
        outputs
    }

    pub fn load_int(&mut self, value: i64) -> Variable {
        self.append(Op::LoadInt(value), &[])[0]
    }

    pub fn load_string(&mut self, value: &str) -> Variable {
        self.append(Op::LoadString(value.to_string()), &[])[0]
    }

    pub fn binary(&mut self, lhs: Variable, rhs: Variable, op: BinaryOperator) -> Variable {
        self.append(Op::Binary(op), &[lhs, rhs])[0]
    }

    pub fn create_object(&mut self) -> Variable {
        self.append(Op::CreateObject, &[])[0]
    }

    pub fn set_computed_property(&mut self, object: Variable, key: Variable, value: Variable) {
        self.append(Op::SetComputedProperty, &[object, key, value]);
    }

    pub fn reassign(&mut self, target: Variable, value: Variable) {
        self.append(Op::Reassign, &[target, value]);
    }

    pub fn begin_switch(&mut self, scrutinee: Variable) {
        self.append(Op::BeginSwitch, &[scrutinee]);
    }

    pub fn begin_switch_case(&mut self, comparison: Variable) {
        self.append(Op::BeginSwitchCase, &[comparison]);
    }

    pub fn begin_switch_default_case(&mut self) {
        self.append(Op::BeginSwitchDefaultCase, &[]);
    }

    pub fn end_switch(&mut self) {
        self.append(Op::EndSwitch, &[]);
    }

    /// Freezes the accumulated instructions into an immutable program and
    /// resets the builder so it can build the next one.
    pub fn finalize(&mut self) -> Result<Program, ValidityError> {
        let instructions = std::mem::take(&mut self.instructions);
        self.next_variable = 0;
        let program = Program::from_instructions(instructions);
        program.validate()?;
        Ok(program)
    }

    fn new_variable(&mut self) -> Variable {
        let variable = Variable::new(self.next_variable);
        self.next_variable += 1;
        variable
    }
}
