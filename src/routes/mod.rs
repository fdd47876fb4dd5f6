pub mod analysis;
pub mod health;
pub mod holdings;
pub mod market;
pub mod settings;
