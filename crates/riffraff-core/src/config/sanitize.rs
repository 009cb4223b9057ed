//! Structural key removal over a YAML tree

use serde_yaml::Value;

/// Field that only this tool understands; the deployment tool rejects it.
pub const SOURCES_KEY: &str = "sources";

/// Remove `key` from every mapping in the tree, at any depth.
///
/// Descends into sequences, mappings and tagged values. Sibling keys keep
/// their relative order and sequences keep their element order.
pub fn strip_key(value: &mut Value, key: &str) {
    if key.is_empty() {
        return;
    }

    match value {
        Value::Mapping(mapping) => {
            mapping.shift_remove(key);
            for (_, child) in mapping.iter_mut() {
                strip_key(child, key);
            }
        }
        Value::Sequence(items) => {
            for item in items.iter_mut() {
                strip_key(item, key);
            }
        }
        Value::Tagged(tagged) => strip_key(&mut tagged.value, key),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
    }
}

/// Copy of `value` with every `sources` field removed
pub fn without_sources(value: &Value) -> Value {
    let mut copy = value.clone();
    strip_key(&mut copy, SOURCES_KEY);
    copy
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_removes_sources_from_deployments() {
        let mut tree = yaml(
            r#"
deployments:
  cfn:
    sources: [foo, bar]
    apple: tree
    count: 100
  s3:
    sources: [zap]
    count: 20
"#,
        );
        strip_key(&mut tree, SOURCES_KEY);

        let want = yaml(
            r#"
deployments:
  cfn:
    apple: tree
    count: 100
  s3:
    count: 20
"#,
        );
        assert_eq!(tree, want);
    }

    #[test]
    fn test_removes_nested_inside_sequence() {
        let mut tree = yaml(
            r#"
outer:
  items:
    - name: first
      sources: [a]
      nested:
        sources: [b]
        keep: 1
    - name: second
"#,
        );
        strip_key(&mut tree, SOURCES_KEY);

        let want = yaml(
            r#"
outer:
  items:
    - name: first
      nested:
        keep: 1
    - name: second
"#,
        );
        assert_eq!(tree, want);
    }

    #[test]
    fn test_key_order_preserved() {
        let mut tree = yaml("z: 1\nsources: []\na: 2\nm: 3\n");
        strip_key(&mut tree, SOURCES_KEY);
        let keys: Vec<_> = tree
            .as_mapping()
            .unwrap()
            .keys()
            .map(|k| k.as_str().unwrap().to_string())
            .collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_idempotent() {
        let original = yaml(
            r#"
stacks: [deploy]
deployments:
  upload:
    sources: [x]
    parameters:
      list:
        - sources: 1
          other: [sources]
"#,
        );
        let once = without_sources(&original);
        let twice = without_sources(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_sources_as_value_untouched() {
        let mut tree = yaml("names: [sources, other]\nlabel: sources\n");
        let before = tree.clone();
        strip_key(&mut tree, SOURCES_KEY);
        assert_eq!(tree, before);
    }

    #[test]
    fn test_empty_key_is_noop() {
        let mut tree = yaml("'': 1\nb: 2\n");
        let before = tree.clone();
        strip_key(&mut tree, "");
        assert_eq!(tree, before);
    }
}
