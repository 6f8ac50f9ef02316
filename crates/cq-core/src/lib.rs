pub mod error;
pub mod records;
pub mod types;
pub mod value;

pub use error::CodeQuestError;
pub use records::*;
pub use types::*;
pub use value::*;
