pub mod bag;
pub mod error;
pub mod key;
pub mod listing;
pub mod storage;
pub mod tiddler;

pub use bag::{PutOutcome, TiddlerBag};
pub use error::{Result, StoreError};
