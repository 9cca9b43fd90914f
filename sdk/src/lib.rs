pub mod content;
pub mod crypto;
pub mod storage;
