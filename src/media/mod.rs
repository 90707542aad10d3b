// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

pub mod issuer;
pub mod signer;
pub mod token;

pub use issuer::{
    AccessDenied, Admission, ForbiddenReason, MediaAccessError, MediaTokenIssuer,
    MediaTokenService,
};
pub use signer::{constant_time_eq, SignerError, TokenSigner};
pub use token::SignedMediaToken;
