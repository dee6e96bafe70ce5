pub mod api {
    pub mod models {
        pub mod account;
        pub mod common;
        pub mod task;
    }
    pub mod client;
    pub mod error;
    pub mod operations;
}

pub mod config;
pub mod logger;
