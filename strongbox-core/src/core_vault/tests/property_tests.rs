/*
    Property tests for store, search and merge
*/

use super::{at, open_vault};
use crate::core_vault::model::{Document, FieldValue};
use proptest::prelude::*;
use tempfile::tempdir;

fn words() -> impl Strategy<Value = String> {
    "[a-zA-Z]{1,8}( [a-zA-Z]{1,8}){0,4}"
}

fn document() -> impl Strategy<Value = Document> {
    (words(), any::<i64>(), any::<bool>(), prop::collection::vec(words(), 0..3)).prop_map(
        |(text, number, flag, tags)| {
            Document::new()
                .with("content", text)
                .with("size", number)
                .with("public", flag)
                .with("tags", FieldValue::List(tags.into_iter().map(FieldValue::from).collect()))
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_store_retrieve_round_trip(content in document()) {
        let dir = tempdir().unwrap();
        let mut vault = open_vault(dir.path(), "local", &at(1));

        let id = vault.store(&content, None).unwrap();
        prop_assert_eq!(vault.retrieve(&id).unwrap(), Some(content.clone()));
        prop_assert_eq!(id, content.content_id().unwrap());
    }

    #[test]
    fn prop_restore_is_idempotent_upsert(content in document(), repeats in 2usize..6) {
        let dir = tempdir().unwrap();
        let mut vault = open_vault(dir.path(), "local", &at(1));

        let mut last = None;
        for _ in 0..repeats {
            let id = vault.store(&content, None).unwrap();
            let updated = vault.state().records.get(&id).unwrap().updated_at;
            if let Some(previous) = last {
                prop_assert!(updated > previous);
            }
            last = Some(updated);
        }
        prop_assert_eq!(vault.stats().records, 1);
    }

    #[test]
    fn prop_every_word_finds_its_record(text in words()) {
        let dir = tempdir().unwrap();
        let mut vault = open_vault(dir.path(), "local", &at(1));
        let id = vault.store(&Document::new().with("content", text.clone()), None).unwrap();

        for word in text.split_whitespace() {
            let hits = vault.search(&word.to_uppercase()).unwrap();
            prop_assert!(hits.iter().any(|(hit, _)| *hit == id));
        }
    }

    #[test]
    fn prop_merge_is_idempotent(
        local_docs in prop::collection::vec(document(), 0..4),
        remote_docs in prop::collection::vec(document(), 0..4),
    ) {
        let dir = tempdir().unwrap();
        let mut local = open_vault(dir.path(), "local", &at(10));
        let mut remote = open_vault(dir.path(), "remote", &at(20));
        for content in &local_docs {
            local.store(content, None).unwrap();
        }
        for content in &remote_docs {
            remote.store(content, None).unwrap();
        }

        let export = remote.export();
        local.merge_remote(&export).unwrap();
        let once = local.list();

        let again = local.merge_remote(&export).unwrap();
        prop_assert_eq!(again.adopted, 0);
        prop_assert_eq!(local.list(), once);

        // Every remote record is present with the remote timestamp
        for record in &export.records {
            let summary = local.state().records.get(&record.id).unwrap();
            prop_assert!(summary.updated_at >= record.updated_at);
        }
    }
}
