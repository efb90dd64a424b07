pub mod portfolio;
pub mod quote;
pub mod window;
