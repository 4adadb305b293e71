//! Storage-engine independent pieces of tabula: values, records, column types,
//! schemas, the serialized dump format and the error taxonomy shared by every
//! engine crate.

pub mod error;
pub mod schema;
pub mod types;
pub mod value;

pub use error::SchemaError;
pub use schema::*;
pub use types::*;
pub use value::*;
