//! External-function tag discovery.

use mbd_engines::ModelDatabase;
use std::collections::BTreeMap;

/// Build the tag -> channel-index map for external functions by scanning
/// channels sequentially from 1.
///
/// The scan terminates at the first channel reporting no function at all,
/// so any tags assigned beyond such a gap are silently unreachable. This
/// matches the engine's channel assignment contract and is preserved as-is
/// for compatibility; see the tests for the documented limitation.
/// Untagged functions (empty tag) are skipped without ending the scan.
pub fn build_tag_map(model: &dyn ModelDatabase) -> BTreeMap<String, usize> {
    let mut map = BTreeMap::new();
    let mut channel = 1;
    while let Some(tag) = model.function_tag(channel) {
        if !tag.is_empty() {
            map.insert(tag, channel);
        }
        channel += 1;
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use mbd_engines::scripted::{ModelScript, ScriptedModel};

    fn model_with_tags(tags: Vec<Option<&str>>) -> ScriptedModel {
        ScriptedModel::new(ModelScript {
            function_tags: tags
                .into_iter()
                .map(|t| t.map(str::to_string))
                .collect(),
            ..ModelScript::default()
        })
    }

    #[test]
    fn empty_tags_are_skipped_but_scanning_continues() {
        let model = model_with_tags(vec![Some("sensorA"), Some(""), Some("sensorB")]);
        let map = build_tag_map(&model);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("sensorA"), Some(&1));
        assert_eq!(map.get("sensorB"), Some(&3));
    }

    #[test]
    fn scan_stops_at_first_channel_without_a_function() {
        // Known limitation: a tag behind a channel gap is unreachable.
        let model = model_with_tags(vec![Some("sensorA"), None, Some("orphan")]);
        let map = build_tag_map(&model);
        assert_eq!(map.len(), 1);
        assert!(map.contains_key("sensorA"));
        assert!(!map.contains_key("orphan"));
    }

    #[test]
    fn no_functions_yields_empty_map() {
        let model = model_with_tags(vec![]);
        assert!(build_tag_map(&model).is_empty());
    }
}
