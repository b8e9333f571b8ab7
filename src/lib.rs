//! Credit Risk Scoring Library
//!
//! This library provides the feature-engineering and inference contract shared
//! by the training binary and the prediction API, plus the HTTP layer and the
//! dashboard client.
//!
//! # Modules
//!
//! - `api`: HTTP-facing components.
//! - `core`: Scoring pipeline (features, imputation, scaling, retry loop).
//! - `integrations`: Outbound HTTP (dataset download, scoring client).
//! - `artifact`: Trained artifact and its checksummed file format.
//! - `config`: Configuration management.
//! - `dataset`: Client dataset loading and lookup.
//! - `errors`: Error handling types.
//! - `features`: Feature derivation and schema alignment.
//! - `handlers`: HTTP request handlers.
//! - `imputer`: Median/mode imputation over feature batches.
//! - `models`: Raw rows and request/response models.
//! - `pipeline`: One pipeline attempt and its typed failures.
//! - `predictor`: Bounded self-healing retry loop.
//! - `scoring`: Standard scaler and logistic regression.
//! - `scoring_client`: HTTP client for the prediction API.
//! - `stats`: Dataset statistics for the dashboard.
//! - `training`: Model fitting and validation.

pub mod api;
pub mod core;
pub mod integrations;

pub mod artifact;
pub mod config;
pub mod dataset;
pub mod errors;
pub mod features;
pub mod handlers;
pub mod imputer;
pub mod models;
pub mod pipeline;
pub mod predictor;
pub mod scoring;
pub mod scoring_client;
pub mod stats;
pub mod training;
