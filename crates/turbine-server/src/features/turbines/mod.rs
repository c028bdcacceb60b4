pub mod queries;
pub mod routes;

pub use queries::{GetTurbineDataError, GetTurbineDataQuery, TurbineData, TurbineResponse};

pub use routes::turbines_routes;
