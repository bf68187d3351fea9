pub mod analysis;
pub mod app;
pub mod config;
pub mod db;
pub mod errors;
pub mod files;
pub mod flyers;
pub mod history;
pub mod preferences;
pub mod recipes;
pub mod session;
pub mod shopping;
pub mod state;
pub mod storage;
pub mod workflow;

#[cfg(test)]
pub(crate) mod test_utils;
