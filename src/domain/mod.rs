//! Core domain types shared by scoring, storage and ranking

mod amount;
mod error;
mod event;
mod key;

pub use amount::{MICRO_PER_CURIO, MicroCurio, format_curio, to_display};
pub use error::{CurioError, Result};
pub use event::{ActivityContext, Difficulty, EventKind};
pub use key::IdempotencyKey;
