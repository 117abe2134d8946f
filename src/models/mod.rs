pub mod common;
pub mod content;
pub mod describe;
pub mod image;
pub mod storage;

pub use self::common::*;
pub use self::content::*;
pub use self::describe::*;
pub use self::image::*;
