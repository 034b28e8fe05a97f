pub mod cli;
pub mod controller;
pub mod domain;
pub mod inputter;
pub mod logging;
pub mod model;
pub mod pager;
pub mod pipeline;
pub mod record;
pub mod store;
pub mod ui;
pub mod view_state;
