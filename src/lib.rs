pub mod aggregate;
pub mod app;
pub mod compress;
pub mod config;
pub mod discover;
pub mod dispatch;
pub mod domain;
pub mod driver;
pub mod error;
pub mod layout;
pub mod output;
pub mod picard;
pub mod qc;
pub mod rsem;
pub mod subset;
pub mod table;
pub mod tools;
