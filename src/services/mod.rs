// src/services/mod.rs
pub mod db;
pub mod eastmoney;
pub mod eastmoney_macro;
pub mod fetcher;
pub mod pipeline;
pub mod retry;
pub mod sink;
pub mod treasury;
