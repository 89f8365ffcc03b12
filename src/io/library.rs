use std::path::Path;

use log::warn;
use serde::de::DeserializeOwned;

use super::{Format, error::Error, read_records};
use crate::model::reaction::RuleTemplate;

/// Loads the shared rule template library, keeping at most `count` rules.
///
/// Malformed lines are reported and skipped; the library is only fatal when
/// the file itself cannot be read.
pub fn load_rule_library<Q: DeserializeOwned>(
    path: impl AsRef<Path>,
    count: Option<usize>,
) -> Result<Vec<RuleTemplate<Q>>, Error> {
    let path = path.as_ref();
    let mut rules = Vec::new();
    for entry in read_records::<RuleTemplate<Q>>(path, Format::Rules)? {
        if count.is_some_and(|n| rules.len() >= n) {
            break;
        }
        match entry {
            Ok(rule) => rules.push(rule),
            Err(e) if e.is_record_level() => warn!("Skipping rule in '{}': {e}", path.display()),
            Err(e) => return Err(e),
        }
    }
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chem::graph::Query;
    use crate::chem::graph::fixtures::sn2_template;
    use crate::io::RecordWriter;

    #[test]
    fn loads_templates_up_to_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.jsonl");
        let templates = vec![sn2_template(1), sn2_template(2), sn2_template(3)];
        RecordWriter::new(&path, Format::Rules)
            .append_all(&templates)
            .unwrap();

        let all: Vec<RuleTemplate<Query>> = load_rule_library(&path, None).unwrap();
        assert_eq!(all, templates);

        let first: Vec<RuleTemplate<Query>> = load_rule_library(&path, Some(2)).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[1].rule_id(), Some(2));
    }

    #[test]
    fn malformed_rules_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.jsonl");
        let writer = RecordWriter::new(&path, Format::Rules);
        writer.append_all(&[sn2_template(1)]).unwrap();
        std::fs::write(
            &path,
            format!("{}{{\"broken\": true}}\n", std::fs::read_to_string(&path).unwrap()),
        )
        .unwrap();

        let rules: Vec<RuleTemplate<Query>> = load_rule_library(&path, None).unwrap();
        assert_eq!(rules.len(), 1);
    }
}
