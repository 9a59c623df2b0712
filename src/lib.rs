// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Asset Custody Server - Encrypted Code Asset Custody Service
//!
//! Seller code is sealed at rest under a fresh AES-256-GCM key per version.
//! Keys leave the server only for the buyer whose purchase owns them, and
//! buyer-requested modifications become new, independently keyed versions.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Bearer token verification and roles
//! - `config` - Environment configuration
//! - `crypto` - Content keys and the sealed blob format
//! - `custody` - Ownership-gated custody operations
//! - `storage` - Blob store, ownership ledger (redb) and audit log
//! - `transform` - Code transformation backends

pub mod api;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod custody;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;
pub mod transform;
