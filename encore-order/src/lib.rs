pub mod assembler;
pub mod issuer;
pub mod validator;

pub use assembler::{CheckoutError, OrderAssembler};
pub use issuer::{IssueError, TicketIssuer};
pub use validator::{CancelOutcome, RejectReason, ScanOutcome, TicketValidator, ValidatorError};
