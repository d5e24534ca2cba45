// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Parley.
//!
//! Holds the error taxonomy, the persisted data model, client-side id
//! generation, and the adapter traits implemented by the provider, storage,
//! and search crates.

pub mod error;
pub mod ids;
pub mod traits;
pub mod types;

pub use error::{GenerationErrorKind, ParleyError};
pub use ids::{generate_id, now_timestamp};
pub use types::{AdapterType, HealthStatus};

pub use traits::{PluginAdapter, PrimaryStore, ProviderAdapter, ProviderStream, SearchBackend};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parley_error_has_all_variants() {
        let _config = ParleyError::Config("test".into());
        let _validation = ParleyError::Validation("test".into());
        let _storage = ParleyError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _upstream = ParleyError::Upstream {
            service: "brave".into(),
            message: "test".into(),
        };
        let _generation = ParleyError::Generation {
            kind: GenerationErrorKind::RateLimit,
            message: "test".into(),
        };
        let _not_found = ParleyError::NotFound {
            entity: "conversation",
            id: "conv_1".into(),
        };
        let _conflict = ParleyError::Conflict("test".into());
        let _timeout = ParleyError::Timeout {
            duration: std::time::Duration::from_secs(3),
        };
        let _internal = ParleyError::Internal("test".into());
    }

    #[test]
    fn adapter_type_round_trips_through_strings() {
        use std::str::FromStr;

        for variant in [AdapterType::Provider, AdapterType::Storage] {
            let s = variant.to_string();
            let parsed = AdapterType::from_str(&s).expect("should parse back");
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn health_status_variants() {
        let healthy = HealthStatus::Healthy;
        let degraded = HealthStatus::Degraded("fallback".into());
        let unhealthy = HealthStatus::Unhealthy("down".into());

        assert_eq!(healthy, HealthStatus::Healthy);
        assert_ne!(degraded, healthy);
        assert_ne!(unhealthy, healthy);
        assert_eq!(degraded.label(), "degraded");
    }

    #[test]
    fn all_traits_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_provider_adapter<T: ProviderAdapter>() {}
        fn _assert_primary_store<T: PrimaryStore>() {}
        fn _assert_search_backend<T: SearchBackend>() {}
    }
}
