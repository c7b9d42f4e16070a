// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Session tokens shared by the auth service and the gateway.
//!
//! ## Auth Flow
//!
//! 1. Client calls `POST /auth/login` through the gateway
//! 2. Auth service checks the Argon2id hash and issues an HS256 token
//!    (`sub` = credential ID, `iat`, `exp`)
//! 3. Client sends `Authorization: Bearer <token>` on protected routes
//! 4. Gateway verifies algorithm, signature and expiry with the same secret
//!
//! ## Security
//!
//! - Exactly one algorithm (`HS256`) is accepted
//! - Verification failures are distinct internally, generic on the wire
//! - Tokens are stateless; there is no revocation before `exp`

pub mod claims;
pub mod codec;
pub mod error;
pub mod extractor;
pub mod password;
pub mod service;

pub use claims::{AuthenticatedUser, Claims};
pub use codec::{Clock, IssuedToken, ManualClock, SystemClock, TokenCodec};
pub use error::{AuthError, TokenError};
pub use extractor::{bearer_token, Auth};
pub use password::PasswordHasher;
pub use service::{AuthService, AuthServiceError};
