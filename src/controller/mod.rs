//! View-model core shared by every table view: typed field descriptors,
//! comparison rules, pagination and the date-range selection used by the
//! calendar strip.

pub mod field;
pub mod pagination;
pub mod range;
pub mod sort;
pub mod view;

pub use field::{CompareKind, FieldDescriptor, FieldValue, Record, Schema};
pub use pagination::{PageItem, PaginationModel};
pub use range::{AutoScroll, DateRange, DayWindow, RangeSelection};
pub use sort::{SortDirection, SortSpec};
pub use view::{ControllerError, Entry, LoadPolicy, PagingMode, TabularViewController, VisiblePage};
