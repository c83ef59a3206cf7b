pub mod builder;
pub mod table;
pub mod types;

pub use builder::CycleReporter;
pub use table::render_summary;
pub use types::{Boundary, BoundaryStatus, CycleKind, CycleReport};
