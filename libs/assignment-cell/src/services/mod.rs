pub mod assignment;

pub use assignment::AssignmentService;
