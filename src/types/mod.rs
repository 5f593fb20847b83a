// Shared domain types, used by both the engine layer and the UI layer.
// Neither layer depends on the other; both import from this module.

pub mod common;
pub mod daily_report;
pub mod meal;
pub mod product;
pub mod report;
pub mod user;

pub use common::*;
pub use daily_report::*;
pub use meal::*;
pub use product::*;
pub use report::*;
pub use user::*;
