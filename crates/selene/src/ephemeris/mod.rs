pub mod memo;
pub mod oracle;
pub mod types;

pub use memo::MemoOracle;
pub use oracle::{parse_chart_response, ChartCache, ChartOracle, HttpOracle, OracleSettings};
pub use types::{ChartKey, ChartSnapshot, GeoLocation, OracleRequest};
