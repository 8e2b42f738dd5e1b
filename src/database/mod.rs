pub mod db;

pub use db::SqliteItemStore;
