pub mod attendance;
pub mod branch_distribution;
pub mod employee;
pub mod leave;
pub mod lifecycle;
pub mod payroll;
pub mod scm_request;
