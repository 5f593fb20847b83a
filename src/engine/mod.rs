// engine module: backend I/O on its own thread

mod backend;
mod interface;
mod poll;
mod refresh;
pub mod stub;

pub use backend::BackendEngine;
pub use interface::{Engine, EngineHandle, Event, FetchTarget, Mutation, Request};
pub use poll::TransientPoller;
pub use refresh::{RefreshScheduler, RefreshTarget};
pub use stub::StubEngine;
