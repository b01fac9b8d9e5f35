pub mod browser;
pub mod configuration;
pub mod controllers;
pub mod db;
pub mod error;
pub mod jobs;
pub mod model;
pub mod notification;
pub mod pipeline;
pub mod queue;
pub mod repository;
pub mod routes;
pub mod sites;
pub mod startup;
pub mod state;
pub mod storage;
pub mod telemetry;
pub mod util;
