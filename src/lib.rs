pub mod catalog;
pub mod cdp;
pub mod common;
pub mod generate;
pub mod interactions;
pub mod locator;
pub mod routes;
pub mod tours;
