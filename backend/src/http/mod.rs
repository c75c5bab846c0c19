pub mod backing;
pub mod clubs;
pub mod expenses;
pub mod health;
pub mod import;
pub mod performances;
pub mod reports;
pub mod schedule;
pub mod tournaments;

use crate::auth::{AuthMiddleware, JwtService};
use crate::config::ImportConfig;
use crate::db::DbPool;
use crate::service::{
    BackingService, ClubService, CsvImportService, ExpenseService, PerformanceService, ReportService,
    ScheduleService, TournamentService,
};
use actix_web::web;

/// Services shared by every handler.
pub struct AppState {
    pub pool: DbPool,
    pub clubs: ClubService,
    pub tournaments: TournamentService,
    pub performances: PerformanceService,
    pub expenses: ExpenseService,
    pub schedule: ScheduleService,
    pub backing: BackingService,
    pub reports: ReportService,
    pub imports: CsvImportService,
}

impl AppState {
    pub fn new(pool: DbPool, import: &ImportConfig) -> Self {
        Self {
            clubs: ClubService::new(pool.clone()),
            tournaments: TournamentService::new(pool.clone()),
            performances: PerformanceService::new(pool.clone()),
            expenses: ExpenseService::new(pool.clone()),
            schedule: ScheduleService::new(pool.clone()),
            backing: BackingService::new(pool.clone()),
            reports: ReportService::new(pool.clone()),
            imports: CsvImportService::new(pool.clone(), import),
            pool,
        }
    }
}

/// `/api/health` is public; everything else under `/api` needs a bearer token.
pub fn configure_routes(cfg: &mut web::ServiceConfig, jwt_service: JwtService) {
    cfg.route("/api/health", web::get().to(health::health_check)).service(
        web::scope("/api")
            .wrap(AuthMiddleware::new(jwt_service))
            .configure(clubs::routes)
            .configure(tournaments::routes)
            .configure(performances::routes)
            .configure(expenses::routes)
            .configure(schedule::routes)
            .configure(backing::routes)
            .configure(reports::routes)
            .configure(import::routes),
    );
}
