pub mod functions;
pub mod ingress;
pub mod locator;
pub mod types;

pub use functions::{AngularFunction, ProgressedSeparation, SunLongitude};
pub use ingress::{ingress_cache, IngressCache, IngressKey, IngressLocator};
pub use locator::{locate_crossing, locate_value_between};
pub use types::{BoundaryEvent, SearchConfig, SearchDirection};
