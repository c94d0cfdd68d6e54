pub mod boundary;
pub mod config;
pub mod duration;
pub mod error;
pub mod fetch;
pub mod load;
pub mod output;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod spatial;
pub mod temporal;
