//! HTTP front end for the Canopy quota service.
//!
//! [`api::router`] exposes the `os-quota-sets` operations of a
//! [`canopy_engine::QuotaSetService`] under `/v2` and `/v3`;
//! [`state_factory`] builds that service from a [`config::CanopyConfig`].

pub mod api;
pub mod config;
pub mod error;
pub mod state_factory;
pub mod telemetry;
