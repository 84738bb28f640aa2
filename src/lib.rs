//! # ci-triage
//!
//! Triage failed CI/CD jobs from their raw logs.
//!
//! A log is classified by platform, the failing step is located, the most
//! relevant error text is cut out, and that context is handed to a language
//! model that answers with a root cause and a suggested fix.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌─────────────┐   ┌───────────────┐   ┌────────┐
//! │ raw log  │──▶│ platform │──▶│ failed_step │──▶│ error_context │──▶│  llm   │
//! └──────────┘   └──────────┘   └─────────────┘   └───────────────┘   └───┬────┘
//!                                                                         │
//!                               ┌──────────────────┬──────────────────────┤
//!                               ▼                  ▼                      ▼
//!                         ┌──────────┐       ┌──────────┐          AnalysisReport
//!                         │   CLI    │       │   HTTP   │
//!                         └──────────┘       └──────────┘
//! ```
//!
//! The three extraction stages are pure and total: when nothing matches they
//! return a fixed sentinel string instead of failing. The model call is the
//! only I/O, and its failures are folded into the report.
//!
//! ## Quick Start
//!
//! ```bash
//! ci-triage parse build.log          # extraction only, no network
//! ci-triage analyze build.log        # full report (needs OPENAI_API_KEY)
//! ci-triage serve                    # POST /analyze, GET /health
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types and sentinels |
//! | [`platform`] | CI/CD platform detection |
//! | [`failed_step`] | Failed step extraction |
//! | [`error_context`] | Error context extraction |
//! | [`llm`] | Completion client abstraction |
//! | [`pipeline`] | End-to-end triage |
//! | [`server`] | HTTP server |
//! | [`telemetry`] | Tracing setup |

pub mod config;
pub mod error_context;
pub mod failed_step;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod platform;
pub mod server;
pub mod telemetry;
