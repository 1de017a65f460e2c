pub mod engine;
pub mod states;

pub use engine::{
    available_actions, transition, BranchDistributionWorkflow, LeaveWorkflow, PayrollWorkflow,
    ScmRequestWorkflow, Transition, WorkflowDefinition, WorkflowEngine, WorkflowError,
};
pub use states::{
    EntityKind, FieldUpdate, FieldValue, StampColumn, TransitionOutcome, TransitionRequest,
    WorkflowAction, WorkflowSnapshot, WorkflowState, WorkflowStatus,
};
