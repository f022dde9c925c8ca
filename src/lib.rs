pub mod app;
pub mod controller;
pub mod domain;
pub mod integrations;
pub mod storage;
pub mod ui;
