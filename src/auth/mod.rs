// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Establishes the verified caller identity the custody gateway trusts.
//!
//! ## Auth Flow
//!
//! 1. The client signs in with the identity provider (Supabase Auth)
//! 2. The client sends `Authorization: Bearer <session JWT>`
//! 3. The server:
//!    - Verifies signature, expiry, issuer and audience
//!    - Extracts `sub` → canonical `user_id`
//!    - Extracts `app_metadata.role` → [`Role`]
//!
//! ## Security
//!
//! - All `/v1` endpoints require authentication
//! - JWKS is cached with TTL and refetched on unknown `kid`
//! - Clock skew tolerance is 60 seconds
//! - Unsigned decoding exists only behind the `dev` cargo feature

pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod roles;

pub use claims::{AppMetadata, AuthenticatedUser, SessionClaims};
pub use error::AuthError;
pub use extractor::{verify_jwt, AdminOnly, AuditReader, Auth};
pub use jwks::JwksManager;
pub use roles::Role;
