//! Property-based tests for comparison compilation and pipeline fingerprints.
//!
//! ## Test Categories
//!
//! ### 1. Rank assignment
//! - Null-check levels rank -1, the catch-all ranks 0, other levels count
//!   down from the number of non-null levels
//!
//! ### 2. Rendering
//! - Rendering and compiling are pure: the same input gives the same SQL
//!
//! ### 3. Evaluation
//! - Compiled expressions evaluated by DataFusion pick the first matching
//!   level, with nulls always yielding -1
//!
//! ### 4. Fingerprints
//! - Equal pipelines share a fingerprint; changing any statement changes it

use arrow::array::{Array, Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::prelude::*;
use proptest::prelude::*;
use std::sync::Arc;
use term_link::comparison::{ComparisonLevel, ComparisonRuleList, ELSE_RANK, NULL_RANK};
use term_link::dialect::Dialect;
use term_link::pipeline::PipelineBuilder;

// ============================================================================
// Strategies
// ============================================================================

fn column_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,8}"
}

fn non_null_level() -> impl Strategy<Value = ComparisonLevel> {
    prop_oneof![
        column_name().prop_map(|c| ComparisonLevel::exact(c)),
        (column_name(), 0u32..5).prop_map(|(c, d)| ComparisonLevel::levenshtein(c, d)),
        (column_name(), 0u32..5).prop_map(|(c, d)| ComparisonLevel::damerau_levenshtein(c, d)),
        (column_name(), 0.0f64..=1.0).prop_map(|(c, t)| ComparisonLevel::jaro_winkler(c, t)),
        (column_name(), 0.0f64..1.0)
            .prop_map(|(c, t)| ComparisonLevel::percentage_difference(c, t)),
        (column_name(), 0.0f64..100.0)
            .prop_map(|(c, t)| ComparisonLevel::absolute_difference(c, t)),
        (column_name(), column_name(), any::<bool>())
            .prop_map(|(a, b, s)| ComparisonLevel::columns_reversed(a, b, s)),
    ]
}

fn dialect() -> impl Strategy<Value = Dialect> {
    prop::sample::select(Dialect::ALL.to_vec())
}

// ============================================================================
// Rank assignment and rendering
// ============================================================================

proptest! {
    #[test]
    fn prop_rank_assignment(
        nulls in 0usize..3,
        levels in prop::collection::vec(non_null_level(), 1..8),
    ) {
        let mut all: Vec<ComparisonLevel> =
            (0..nulls).map(|_| ComparisonLevel::null("x")).collect();
        all.extend(levels.iter().cloned());
        all.push(ComparisonLevel::Else);

        let list = ComparisonRuleList::new("x", all).unwrap();
        let ranks = list.ranks();

        let mut expected = vec![NULL_RANK; nulls];
        expected.extend((1..=levels.len() as i32).rev());
        expected.push(ELSE_RANK);
        prop_assert_eq!(ranks, expected);
    }

    #[test]
    fn prop_rendering_is_pure(level in non_null_level(), dialect in dialect()) {
        let first = level.render(dialect);
        let second = level.render(dialect);
        match (first, second) {
            (Ok(a), Ok(b)) => prop_assert_eq!(a, b),
            (Err(_), Err(_)) => {}
            _ => prop_assert!(false, "rendering changed outcome"),
        }
    }

    #[test]
    fn prop_compile_is_pure(
        levels in prop::collection::vec(non_null_level(), 1..6),
        dialect in dialect(),
    ) {
        let mut all = vec![ComparisonLevel::null("x")];
        all.extend(levels);
        all.push(ComparisonLevel::Else);
        let list = ComparisonRuleList::new("x", all).unwrap();

        if let (Ok(a), Ok(b)) = (list.compile(dialect), list.compile(dialect)) {
            prop_assert_eq!(&a, &b);
            prop_assert!(a.case_expression.ends_with(" ELSE 0 END"));
            prop_assert!(a.labels.contains_key(&NULL_RANK));
            prop_assert!(a.labels.contains_key(&ELSE_RANK));
        }
    }

    #[test]
    fn prop_else_anywhere_but_last_is_rejected(
        levels in prop::collection::vec(non_null_level(), 2..6),
        position in 0usize..5,
    ) {
        let position = position % levels.len();
        let mut all = levels;
        all.insert(position, ComparisonLevel::Else);
        prop_assert!(ComparisonRuleList::new("x", all).is_err());
    }
}

// ============================================================================
// Evaluation with DataFusion
// ============================================================================

const TIERS: [f64; 4] = [0.0, 1.0, 2.0, 5.0];

fn expected_rank(l: Option<i32>, r: Option<i32>) -> i64 {
    match (l, r) {
        (Some(l), Some(r)) => {
            let difference = f64::from((l - r).abs());
            TIERS
                .iter()
                .position(|tier| difference <= *tier)
                .map(|i| (TIERS.len() - i) as i64)
                .unwrap_or(0)
        }
        _ => -1,
    }
}

async fn evaluate(pairs: &[(Option<i32>, Option<i32>)]) -> Vec<i64> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("value_l", DataType::Float64, true),
        Field::new("value_r", DataType::Float64, true),
    ]));
    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from_iter_values(0..pairs.len() as i64)),
            Arc::new(Float64Array::from(
                pairs.iter().map(|(l, _)| l.map(f64::from)).collect::<Vec<_>>(),
            )),
            Arc::new(Float64Array::from(
                pairs.iter().map(|(_, r)| r.map(f64::from)).collect::<Vec<_>>(),
            )),
        ],
    )
    .unwrap();

    let ctx = SessionContext::new();
    ctx.register_batch("pairs", batch).unwrap();

    let mut levels = vec![ComparisonLevel::null("value")];
    levels.extend(
        TIERS
            .iter()
            .map(|tier| ComparisonLevel::absolute_difference("value", *tier)),
    );
    levels.push(ComparisonLevel::Else);
    let compiled = ComparisonRuleList::new("value", levels)
        .unwrap()
        .compile(Dialect::DataFusion)
        .unwrap();

    let batches = ctx
        .sql(&format!(
            "SELECT CAST({} AS BIGINT) AS gamma FROM pairs ORDER BY id",
            compiled.case_expression
        ))
        .await
        .unwrap()
        .collect()
        .await
        .unwrap();

    batches
        .iter()
        .flat_map(|batch| {
            let gamma = batch
                .column(0)
                .as_any()
                .downcast_ref::<Int64Array>()
                .unwrap()
                .clone();
            (0..gamma.len()).map(move |i| gamma.value(i))
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_first_matching_level_wins(
        pairs in prop::collection::vec(
            (prop::option::weighted(0.85, -10i32..10), prop::option::weighted(0.85, -10i32..10)),
            1..40,
        ),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let actual = rt.block_on(evaluate(&pairs));
        let expected: Vec<i64> = pairs.iter().map(|(l, r)| expected_rank(*l, *r)).collect();
        prop_assert_eq!(actual, expected);
    }
}

// ============================================================================
// Fingerprints
// ============================================================================

proptest! {
    #[test]
    fn prop_fingerprint_tracks_statement_text(
        statements in prop::collection::vec("SELECT [a-z]{1,6} FROM t", 1..5),
        changed in 0usize..5,
    ) {
        let build = |sqls: &[String]| {
            let mut builder = PipelineBuilder::new();
            for (i, sql) in sqls.iter().enumerate() {
                builder.enqueue(format!("step_{i}"), sql.clone()).unwrap();
            }
            builder.finalize().unwrap().fingerprint(Dialect::DuckDb)
        };

        let original = build(&statements);
        prop_assert_eq!(&original, &build(&statements));

        let mut altered = statements.clone();
        let index = changed % altered.len();
        altered[index].push_str(" WHERE TRUE");
        prop_assert_ne!(original, build(&altered));
    }
}
