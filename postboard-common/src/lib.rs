pub mod model;
pub mod sentiment;
pub mod snowflake;
pub mod util;
