mod text;

pub use text::{ceil_char_boundary, incomplete_utf8_tail};
