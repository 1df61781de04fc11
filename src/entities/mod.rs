pub mod material;
pub mod stock_transaction;
