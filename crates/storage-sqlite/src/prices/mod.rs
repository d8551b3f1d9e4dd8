mod model;
mod repository;

pub use model::PriceBarDB;
pub use repository::SqlitePriceStore;
