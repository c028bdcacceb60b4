pub mod get_turbine_data;

pub use get_turbine_data::{
    GetTurbineDataError, GetTurbineDataQuery, TurbineData, TurbineResponse,
};
