pub mod clipboard;
pub mod export;
