//! Random value generators.

pub mod bytes;
pub mod charset;
pub mod integer;
pub mod uuid_v4;

pub use bytes::{BytesGenerator, IdGenerator};
pub use charset::{CharsetConfig, PasswordGenerator, StringGenerator};
pub use integer::IntegerGenerator;
pub use uuid_v4::UuidGenerator;
