//! The mandatory `Core` feature (FeatureID `0x00`, §3).
//!
//! Its IDL content (`AvailableFeatures`, the feature table) is generated by
//! the device router from its own feature registry, not stored here — the
//! Core feature's job at this layer is only to reserve FeatureID `0x00` and
//! carry the mandatory members every feature has.

use hdc_proto::ids::CORE_FEATURE_ID;

use crate::feature::Feature;

/// Construct the Core feature.
#[must_use]
pub fn core_feature() -> Feature {
    Feature::new(CORE_FEATURE_ID, "Core")
}
