pub mod import;
pub mod replay;
