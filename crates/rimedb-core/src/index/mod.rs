mod compile;
mod function;
mod key;


pub use compile::compile;
pub use function::{
    ConstantCheck, IndexField, IndexFunction, Literal, NullCheck, ScanRange, ScanRangeError,
};
pub use key::IndexKeyBuilder;
