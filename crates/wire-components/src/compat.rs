//! Effects expected by clients of the previous wire format.

use serde_json::{Map, Value};

use crate::context::{Hooks, LifecycleEvent};

/// Effect key of the compatibility payload.
pub const BC_EFFECT: &str = "bc";

/// Push the `bc` effect on every dehydrate.
pub fn register_hooks(hooks: &mut Hooks) {
    hooks.on(LifecycleEvent::Dehydrate, |context| {
        let mut server_memo = Map::new();
        if let Some(evaluation) = context.effect("evaluation").cloned() {
            server_memo.insert("evaluation".to_string(), evaluation);
        }

        context.push_effect(BC_EFFECT, Value::Object(server_memo), Some("serverMemo"));
        context.push_effect(BC_EFFECT, "path:$wire", Some("data"));
        context.push_effect(BC_EFFECT, "path:queuedUpdates", Some("__livewire"));
        Ok(())
    });
}
