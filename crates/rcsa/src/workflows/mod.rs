pub mod assessment;
pub mod library;
