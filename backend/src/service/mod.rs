// Service layer: one service per resource, plus the pure backing arithmetic.
pub mod backing_calculations;
pub mod backing_service;
pub mod club_service;
pub mod common;
pub mod csv_import_service;
pub mod expense_service;
pub mod performance_service;
pub mod report_service;
pub mod schedule_service;
pub mod tournament_service;

pub use backing_service::BackingService;
pub use club_service::ClubService;
pub use csv_import_service::CsvImportService;
pub use expense_service::ExpenseService;
pub use performance_service::PerformanceService;
pub use report_service::ReportService;
pub use schedule_service::ScheduleService;
pub use tournament_service::TournamentService;
