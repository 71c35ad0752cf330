//! Lost-message set difference: indexed ids never observed during the run.

use std::collections::BTreeSet;

use crate::index::{SourceIndex, SourceRecord};

/// Records whose id is not in `found`, in id order.
///
/// Independent of how the loop stopped.
pub fn lost_records<'a>(index: &'a SourceIndex, found: &BTreeSet<String>) -> Vec<&'a SourceRecord> {
    index.iter().filter(|r| !found.contains(&r.id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexSpec;
    use qlat_schemas::EpochUnit;

    #[test]
    fn complement_is_sorted_by_id() {
        let src = concat!(
            "{\"id\":\"c\",\"t\":1}\n",
            "{\"id\":\"a\",\"t\":1}\n",
            "{\"id\":\"b\",\"t\":1}\n",
            "{\"id\":\"d\",\"t\":1}\n",
        );
        let spec = IndexSpec {
            id_field: "id".to_string(),
            sent_field: "t".to_string(),
            unit: EpochUnit::Micros,
        };
        let (idx, _) = SourceIndex::from_reader(src.as_bytes(), &spec).unwrap();
        let found: BTreeSet<String> = ["b".to_string()].into_iter().collect();

        let lost: Vec<&str> = lost_records(&idx, &found).iter().map(|r| r.id.as_str()).collect();
        assert_eq!(lost, vec!["a", "c", "d"]);
        assert_eq!(lost.len() + found.len(), idx.len());
    }
}
