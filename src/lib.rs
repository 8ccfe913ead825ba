//! # single-gcl
//!
//! Global Coordination Level (GCL) estimation for single-cell expression data, part of the
//! single-rust ecosystem.
//!
//! The GCL measures how strongly genes are co-expressed across a population of cells. It is
//! the average bias-corrected distance correlation (Székely & Rizzo, 2013) between the cell
//! distance structures of two random halves of the genes, averaged over many random splits.
//! Resampling cells yields a distribution of GCL values for comparing samples.
//!
//! ## Quick Start
//!
//! Use the `MatrixGcl` trait on a genes × cells `Array2` or `CsrMatrix`, or build an
//! `ExpressionMatrix` and call `compute_gcl` / `compute_distribution` directly.
//!
//! ## Module Organization
//!
//! - **[`gcl`]**: the estimator, trial aggregation and the resampling engine
//! - **[`scheduling`]**: bounded-width batch execution of independent tasks
//! - **[`summary`]**: descriptive statistics and histograms of GCL distributions
//! - **[`io`]**: loading expression matrices from CSV

pub mod gcl;
pub mod io;
pub mod scheduling;
pub mod summary;

pub use gcl::{
    ExpressionMatrix, GclConfig, GclDistribution, GclError, MatrixGcl, Result, compute_distribution,
    compute_gcl,
};
