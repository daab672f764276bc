pub mod builder;
pub mod evaluator;
pub mod minimize;
pub mod program;
pub mod reduce;
pub mod reduce_generic;
pub mod reduce_switch;

pub use builder::ProgramBuilder;
pub use evaluator::{Evaluator, Execution, ExecutionOutcome};
pub use minimize::Minimizer;
pub use program::{
    BinaryOperator, Instruction, Op, Program, ValidityError, ValidityErrorKind, Variable,
};
pub use reduce::Reducer;
pub use reduce_generic::GenericInstructionReducer;
pub use reduce_switch::SwitchCaseReducer;
