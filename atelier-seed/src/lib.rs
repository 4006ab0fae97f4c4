//! Catalogue preprocessing and demo data seeding for the Atelier store.

pub mod catalogue;
pub mod seed;

pub use catalogue::{load_catalogue, preprocess, read_raw_csv, CleanProduct, RawProduct};
pub use seed::{seed_orders, seed_products, seed_users, SeedReport};
