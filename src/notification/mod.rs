pub mod dispatch;
pub mod model;
pub mod poller;
pub mod reconcile;
pub mod service;
pub mod store;
pub mod time;
