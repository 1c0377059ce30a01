pub mod app_config;
pub mod catalog_repo;
pub mod database;
pub mod mem;
pub mod order_repo;
pub mod ticket_repo;

pub use database::DbClient;
pub use catalog_repo::PgCatalogRepository;
pub use order_repo::PgOrderRepository;
pub use ticket_repo::PgTicketRepository;
