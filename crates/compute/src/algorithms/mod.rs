pub mod kmeans;
pub mod rolling;
