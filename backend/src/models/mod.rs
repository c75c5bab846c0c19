pub mod backing;
pub mod club;
pub mod expense;
pub mod import;
pub mod pagination;
pub mod performance;
pub mod report;
pub mod schedule;
pub mod tournament;
