/*
[INPUT]:  API value sets and pre-trade inputs
[OUTPUT]: Typed enums and trading helpers
[POS]:    Data layer - shared types
[UPDATE]: When API schema changes or new helpers are added
*/

pub mod enums;
pub mod trading;

pub use enums::*;
pub use trading::*;
