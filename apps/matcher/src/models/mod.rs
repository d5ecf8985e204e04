pub mod report;
pub mod session;

pub use report::{CandidateReport, ReportFiles, Reports};
pub use session::{Session, UserProfile};
