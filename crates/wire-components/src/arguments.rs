//! Binding declared fragment arguments onto components.

use crate::component::Component;
use crate::fragment::{data_keys, Fragment};

/// Copy `wire:mount:*` entries into mount parameters and `wire.*` entries into state.
///
/// Existing state keys are overwritten; declared arguments win over defaults.
pub fn bind_arguments(fragment: &Fragment, component: &mut Component) {
    for (key, value) in fragment.data() {
        if let Some(param) = key.strip_prefix(data_keys::MOUNT_PREFIX) {
            if !param.is_empty() {
                component
                    .mount_params_mut()
                    .insert(param.to_string(), value.clone());
            }
        } else if let Some(property) = key.strip_prefix(data_keys::PROPERTY_PREFIX) {
            if !property.is_empty() {
                component
                    .state_mut()
                    .insert(property.to_string(), value.clone());
            }
        }
    }
}
