

pub mod action;
pub mod geometry;
pub mod metacard;
pub mod query_result;
pub mod refresh;

pub use action::{ActionList, MetacardAction};
pub use geometry::{wkt_points, Point};
pub use metacard::Metacard;
pub use query_result::QueryResult;
pub use refresh::LiveQueryResult;
