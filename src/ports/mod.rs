pub mod engine;
pub mod handler;

pub use engine::{EngineBinding, EngineError, EngineId, EngineResult, ReadyCallback};
pub use handler::{Handler, HandlerError, HandlerResult, SharedHandler, handler_fn};
