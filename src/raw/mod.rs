mod arena;
mod handle;

pub use arena::Arena;
pub use handle::Handle;
