pub mod btle;
pub mod clock;
pub mod constants;
pub mod controller;
pub mod decoder;
#[cfg(test)]
pub mod fake;
pub mod history;
pub mod link;
pub mod radio;
pub mod session;
pub mod types;
