// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - identity and connectivity adapters.

pub mod firebase_auth;
pub mod identity;
pub mod local_identity;
pub mod network;

pub use firebase_auth::FirebaseIdentity;
pub use identity::{Credentials, FederatedCredential, Identity, IdentityProvider, ProviderKind};
pub use local_identity::LocalIdentity;
pub use network::NetworkMonitor;
