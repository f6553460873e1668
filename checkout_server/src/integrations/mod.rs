pub mod gateway;

pub use gateway::GatewayAdapter;
