// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # clusterops - Cluster Lifecycle Operator for Kubernetes
//!
//! clusterops converges tenant clusters and their node pools through versioned
//! reconciliation pipelines, carves their subnets out of a shared address pool, and
//! drains nodes safely before the cloud scaling group terminates them.
//!
//! ## Overview
//!
//! - Custom Resource Definitions for `Cluster`, `NodePool` and `NodeDrain`
//! - A pipeline engine running ordered steps with retries and cancellation
//! - A subnet allocator serialized by a distributed lock
//! - A drain state machine coordinating with scaling groups
//!
//! ## Modules
//!
//! - [`crd`] - Custom Resource Definition types
//! - [`pipeline`] - Step abstractions, wrappers, resource sets and the version router
//! - [`ipam`] - Subnet allocation from the shared pool
//! - [`lock`] - Distributed lock backends
//! - [`steps`] - Concrete pipeline steps and the per-version pipelines
//! - [`drainer`] - Node drain state machine and its cluster adapters
//! - [`reconcilers`] - Controller entry points
//! - [`config`] - Command line and environment configuration
//! - [`server`] - Metrics and probe endpoint
//!
//! ## Example
//!
//! ```rust,no_run
//! use clusterops::crd::ClusterSpec;
//!
//! let spec = ClusterSpec {
//!     description: Some("production, eu-west".to_string()),
//!     subnet_mask_bits: Some(16),
//! };
//! ```

pub mod config;
pub mod constants;
pub mod context;
pub mod crd;
pub mod drainer;
pub mod errors;
pub mod ipam;
pub mod labels;
pub mod lock;
pub mod metrics;
pub mod pipeline;
pub mod reconcilers;
pub mod server;
pub mod status_reasons;
pub mod steps;
