//! Property-based invariant tests for filtering, windowing, and detail caching.
//!
//! 1. Filtering yields a strictly increasing subsequence of dataset indices.
//! 2. Every kept index satisfies the facets and the query; every dropped one
//!    fails at least one of them.
//! 3. Empty query with no facets is the identity view.
//! 4. Within an epoch the rendered count never decreases and never exceeds
//!    the view length.
//! 5. A filter change always lands on the initial window with an empty cache.
//! 6. Detail views are built at most once per position per epoch.

use opview_core::record::{ASSEMBLY_KEY, CLASS_KEY, FEATURE_KEY, INTRINSICS_KEY, OPCODE_KEY};
use opview_core::{
    Dataset, Description, Event, Facet, FacetSelection, Record, RenderPlan, ScrollMetrics,
    Session, ViewportWindow, WindowConfig, filter,
};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

fn record_strategy() -> impl Strategy<Value = Record> {
    (
        prop::sample::select(vec!["general", "advsimd", "float", "fpsimd", "sve", "sme", ""]),
        prop::sample::select(vec!["", "armv8.1-lse", "armv8.2-fp16", "armv8.4-dit", "armv8.6-bf16"]),
        "[A-Z]{1,6}",
        prop::option::of("[a-z0-9_]{1,12}"),
        "[a-z ]{0,20}",
    )
        .prop_map(|(class, feature, opcode, intrinsic, summary)| {
            let intrinsics = intrinsic
                .map(|name| format!("int32x4_t v{name}(int32x4_t a)"))
                .unwrap_or_default();
            Record::from_brief([
                (CLASS_KEY, class.to_string()),
                (FEATURE_KEY, feature.to_string()),
                (OPCODE_KEY, opcode.clone()),
                (INTRINSICS_KEY, intrinsics),
                (ASSEMBLY_KEY, format!("{opcode} x0, x1")),
            ])
            .with_description(Description::new(summary, "", ""))
        })
}

fn dataset_strategy(max_len: usize) -> impl Strategy<Value = Dataset> {
    proptest::collection::vec(record_strategy(), 0..=max_len).prop_map(Dataset::from_records)
}

fn facets_strategy() -> impl Strategy<Value = FacetSelection> {
    let all = vec![
        Facet::IntrinsicsOnly,
        Facet::BaselineOnly,
        Facet::NoExtensions,
        Facet::WithExtension(1),
        Facet::WithExtension(2),
        Facet::WithExtension(4),
    ];
    prop::sample::subsequence(all.clone(), 0..=all.len())
        .prop_map(|facets| facets.into_iter().collect())
}

fn query_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[a-zA-Z]{1,3}",
        Just("armv8".to_string()),
        Just("VADD".to_string()),
    ]
}

fn matches_query(record: &Record, query: &str) -> bool {
    let needle = query.to_lowercase();
    let description = record.description();
    [CLASS_KEY, FEATURE_KEY, OPCODE_KEY, INTRINSICS_KEY, ASSEMBLY_KEY]
        .iter()
        .map(|key| record.field(key))
        .chain([description.brief.as_str(), description.detailed.as_str()])
        .any(|field| field.to_lowercase().contains(&needle))
}

fn config() -> WindowConfig {
    WindowConfig::default()
        .with_row_height(1)
        .with_initial_screens(2)
        .with_batch_size(7)
}

// ═════════════════════════════════════════════════════════════════════════
// 1-3. Filtering
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn filter_output_is_ordered_subsequence(
        dataset in dataset_strategy(60),
        facets in facets_strategy(),
        query in query_strategy(),
    ) {
        let view = filter::apply(&dataset, &facets, &query);
        prop_assert!(view.len() <= dataset.len());
        prop_assert!(view.indices().windows(2).all(|w| w[0] < w[1]));
        prop_assert!(view.indices().iter().all(|&i| i < dataset.len()));
    }

    #[test]
    fn filter_keeps_exactly_the_matching_records(
        dataset in dataset_strategy(60),
        facets in facets_strategy(),
        query in query_strategy(),
    ) {
        let view = filter::apply(&dataset, &facets, &query);
        let expected: Vec<usize> = dataset
            .records()
            .iter()
            .enumerate()
            .filter(|(_, r)| facets.accepts(r) && matches_query(r, &query))
            .map(|(i, _)| i)
            .collect();
        prop_assert_eq!(view.indices(), expected.as_slice());
    }

    #[test]
    fn empty_filter_is_identity(dataset in dataset_strategy(60)) {
        let view = filter::apply(&dataset, &FacetSelection::new(), "");
        let all: Vec<usize> = (0..dataset.len()).collect();
        prop_assert_eq!(view.indices(), all.as_slice());
    }

    #[test]
    fn query_is_case_insensitive(
        dataset in dataset_strategy(40),
        query in "[a-z]{1,3}",
    ) {
        let lower = filter::apply(&dataset, &FacetSelection::new(), &query);
        let upper = filter::apply(&dataset, &FacetSelection::new(), &query.to_uppercase());
        prop_assert_eq!(lower, upper);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Window monotonicity
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn window_grows_monotonically_and_stays_bounded(
        len in 0usize..500,
        viewport in 0u32..60,
        scrolls in proptest::collection::vec((0u32..2_000, 0u32..2_000), 0..40),
    ) {
        let mut window = ViewportWindow::new(config(), len, viewport);
        prop_assert!(window.rendered_count() <= len);
        let mut previous = window.rendered_count();
        for (scroll_top, content_height) in scrolls {
            let grown = window.grow_if_needed(ScrollMetrics::new(scroll_top, content_height));
            let now = window.rendered_count();
            prop_assert!(now >= previous);
            prop_assert!(now <= len);
            match grown {
                Some(range) => {
                    prop_assert_eq!(range.start, previous);
                    prop_assert_eq!(range.end, now);
                    prop_assert!(range.len() <= 7);
                    prop_assert!(!range.is_empty());
                }
                None => prop_assert_eq!(now, previous),
            }
            previous = now;
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5-6. Session epochs and detail caching
// ═════════════════════════════════════════════════════════════════════════

fn event_strategy() -> impl Strategy<Value = Event> {
    prop_oneof![
        (0u32..500, 0u32..500).prop_map(|(t, h)| Event::Scrolled(ScrollMetrics::new(t, h))),
        (0u32..40).prop_map(|viewport_height| Event::Resized { viewport_height }),
        (0usize..80).prop_map(Event::DetailToggled),
    ]
}

proptest! {
    #[test]
    fn filter_change_resets_window_and_cache(
        dataset in dataset_strategy(80),
        events in proptest::collection::vec(event_strategy(), 0..30),
        facets in facets_strategy(),
        query in query_strategy(),
    ) {
        let mut session = Session::new(dataset, config(), 10);
        for event in events {
            session.handle(event);
        }
        let before = session.epoch_id();
        let plan = session.set_facets(facets.clone());
        let plan = match plan {
            RenderPlan::Rebuild { epoch, .. } => {
                prop_assert_eq!(epoch, before + 1);
                session.set_query(query.clone())
            }
            other => return Err(TestCaseError::fail(format!("unexpected plan {other:?}"))),
        };

        let expected = filter::apply(session.dataset(), &facets, &query);
        let initial = ViewportWindow::initial_size(&config(), expected.len(), session.viewport_height());
        prop_assert_eq!(plan, RenderPlan::Rebuild { epoch: before + 2, rows: 0..initial });
        prop_assert_eq!(session.view(), &expected);
        prop_assert_eq!(session.rendered_count(), initial);
        prop_assert!(session.details().is_empty());
        prop_assert_eq!(session.details().epoch(), session.epoch_id());
    }

    #[test]
    fn detail_is_built_once_per_position(
        dataset in dataset_strategy(40),
        positions in proptest::collection::vec(0usize..40, 1..20),
    ) {
        let mut session = Session::new(dataset, config(), 10);
        let mut distinct = std::collections::BTreeSet::new();
        for &position in &positions {
            let first = session.detail(position).cloned();
            let second = session.detail(position).cloned();
            prop_assert_eq!(&first, &second);
            if first.is_some() {
                distinct.insert(position);
            }
        }
        prop_assert_eq!(session.details().builds(), distinct.len() as u64);
        prop_assert_eq!(session.details().len(), distinct.len());
    }
}
