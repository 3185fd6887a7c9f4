//! Query builder integration tests.
//!
//! Parsed filters are rendered into count and fetch statements for the
//! record kinds list views query.

mod common;

use folio_persistence::config::IndexFailurePolicy;
use folio_persistence::error::QueryError;
use folio_persistence::query::{NO_HIT, QueryBuilder, SQL_FALSE};
use folio_persistence::search::FilterParser;
use folio_persistence::types::{QueryValue, RecordKind, SortDirection};

use common::seeded_index;

fn build(kind: RecordKind, filter: &str) -> QueryBuilder {
    let mut query = QueryBuilder::new(kind);
    query.restrict_with_user_filter(&FilterParser::default().parse(filter));
    query
}

// ============================================================================
// Rendering User Filters
// ============================================================================

#[test]
fn test_mixed_filter_for_processes() {
    let query = build(RecordKind::Process, "-step:done \"id: 5-9|id: 20\"");

    assert_eq!(
        query.form_count_query(),
        "SELECT COUNT(*) FROM Process AS process \
         WHERE NOT (EXISTS (SELECT 1 FROM process.tasks t WHERE t.title = :userFilter1)) \
         AND ( process.id BETWEEN :userFilter2 AND :userFilter2UpTo OR process.id = :userFilter3 )"
    );

    let params = query.query_parameters().unwrap();
    assert_eq!(params["userFilter1"], QueryValue::text("done"));
    assert_eq!(params["userFilter2"], QueryValue::Integer(5));
    assert_eq!(params["userFilter2UpTo"], QueryValue::Integer(9));
    assert_eq!(params["userFilter3"], QueryValue::Integer(20));
    assert_eq!(params.len(), 4);
}

#[test]
fn test_mixed_filter_for_tasks() {
    let query = build(RecordKind::Task, "-step:done \"id: 5-9|id: 20\"");

    assert_eq!(
        query.form_query_for_all(),
        "FROM Task AS task WHERE NOT (task.title = :userFilter1) \
         AND ( task.process.id BETWEEN :userFilter2 AND :userFilter2UpTo \
         OR task.process.id = :userFilter3 ) ORDER BY task.id ASC"
    );
}

#[test]
fn test_negated_identifiers_on_one_field_are_alternatives() {
    // Terms on one field are ORed even when negated, so this matches
    // every process that is not 5, or outside 7-9, or neither 1 nor 2.
    let query = build(RecordKind::Process, "-id:5 -id:7-9 \"-id:1 2\"");

    assert_eq!(
        query.form_count_query(),
        "SELECT COUNT(*) FROM Process AS process WHERE \
         ( process.id != :userFilter1 \
         OR process.id NOT BETWEEN :userFilter2 AND :userFilter2UpTo \
         OR process.id NOT IN (:userFilter3) )"
    );
    assert_eq!(
        query.query_parameters().unwrap()["userFilter3"],
        QueryValue::IntegerList(vec![1, 2])
    );
}

#[test]
fn test_excluding_several_ids_needs_one_list_term() {
    let query = build(RecordKind::Process, "\"-id:5 7 9\"");
    assert_eq!(
        query.form_count_query(),
        "SELECT COUNT(*) FROM Process AS process WHERE process.id NOT IN (:userFilter1)"
    );

    let query = build(RecordKind::Process, "-id:5 -project:Example");
    assert_eq!(
        query.form_count_query(),
        "SELECT COUNT(*) FROM Process AS process WHERE process.id != :userFilter1 \
         AND NOT (process.project.title = :userFilter2)"
    );
}

#[test]
fn test_negated_identifiers_through_subqueries() {
    let cases = [
        (
            "batch:7",
            "EXISTS (SELECT 1 FROM process.batches b WHERE b.id = :userFilter1)",
        ),
        (
            "step:4",
            "EXISTS (SELECT 1 FROM process.tasks t WHERE t.ordering = :userFilter1)",
        ),
        (
            "stepdone:2-3",
            "EXISTS (SELECT 1 FROM process.tasks t WHERE t.processingStatus = :userFilter1QueryObject \
             AND t.ordering BETWEEN :userFilter1 AND :userFilter1UpTo)",
        ),
    ];

    for (term, positive) in cases {
        let included = build(RecordKind::Process, term);
        let excluded = build(RecordKind::Process, &format!("-{term}"));

        assert_eq!(
            included.form_count_query(),
            format!("SELECT COUNT(*) FROM Process AS process WHERE {positive}")
        );
        assert_eq!(
            excluded.form_count_query(),
            format!("SELECT COUNT(*) FROM Process AS process WHERE NOT ({positive})")
        );
        assert_eq!(
            included.query_parameters().unwrap(),
            excluded.query_parameters().unwrap(),
            "term {term}"
        );
    }
}

#[test]
fn test_negated_identifier_and_title_agree_on_one_field() {
    let query = build(RecordKind::Process, "-step:4 -step:Scan");
    assert_eq!(
        query.form_count_query(),
        "SELECT COUNT(*) FROM Process AS process WHERE \
         ( NOT (EXISTS (SELECT 1 FROM process.tasks t WHERE t.ordering = :userFilter1)) \
         OR NOT (EXISTS (SELECT 1 FROM process.tasks t WHERE t.title = :userFilter2)) )"
    );
}

#[test]
fn test_like_policies() {
    let query = build(RecordKind::Process, "title:Fau*t project:Example id:Faust");
    let params = query.query_parameters().unwrap();

    assert_eq!(
        query.form_count_query(),
        "SELECT COUNT(*) FROM Process AS process \
         WHERE process.title LIKE :userFilter1 \
         AND process.project.title = :userFilter2 \
         AND process.title LIKE :userFilter3"
    );
    assert_eq!(params["userFilter1"], QueryValue::text("Fau%t"));
    assert_eq!(params["userFilter2"], QueryValue::text("Example"));
    assert_eq!(params["userFilter3"], QueryValue::text("Faust%"));
}

#[test]
fn test_batch_id_through_subquery() {
    let query = build(RecordKind::Task, "batch:4");
    assert_eq!(
        query.form_count_query(),
        "SELECT COUNT(*) FROM Task AS task \
         WHERE EXISTS (SELECT 1 FROM task.process.batches b WHERE b.id = :userFilter1)"
    );
}

#[test]
fn test_parent_process() {
    let query = build(RecordKind::Process, "parentProcessId:3");
    assert_eq!(
        query.form_count_query(),
        "SELECT COUNT(*) FROM Process AS process WHERE process.parent.id = :userFilter1"
    );
}

// ============================================================================
// Task Status Fields
// ============================================================================

#[test]
fn test_status_fields_bind_query_object() {
    let cases = [
        ("stepLocked", 0),
        ("stepOpen", 1),
        ("stepInWork", 2),
        ("stepDone", 3),
        ("stepDoneUser", 3),
        ("stepAutomatic", 1),
    ];

    for (alias, status) in cases {
        for kind in [RecordKind::Process, RecordKind::Task] {
            let query = build(kind, &format!("{alias}:Scan"));
            let statement = query.form_count_query();
            let params = query.query_parameters().unwrap();

            assert!(
                statement.contains("processingStatus = :userFilter1QueryObject"),
                "{alias} on {kind}: {statement}"
            );
            assert_eq!(
                params["userFilter1QueryObject"],
                QueryValue::Integer(status),
                "{alias} on {kind}"
            );
            assert!(!statement.contains(":queryObject"));
        }
    }
}

#[test]
fn test_status_field_statements() {
    let query = build(RecordKind::Process, "stepdone:Export");
    assert_eq!(
        query.form_count_query(),
        "SELECT COUNT(*) FROM Process AS process WHERE EXISTS (SELECT 1 FROM process.tasks t \
         WHERE t.processingStatus = :userFilter1QueryObject AND t.title = :userFilter1)"
    );

    let query = build(RecordKind::Task, "-stepopen:3");
    assert_eq!(
        query.form_count_query(),
        "SELECT COUNT(*) FROM Task AS task WHERE NOT ((task.processingStatus = :userFilter1QueryObject \
         AND task.ordering = :userFilter1))"
    );

    let query = build(RecordKind::Process, "stepDoneUser:jdoe");
    assert_eq!(
        query.form_count_query(),
        "SELECT COUNT(*) FROM Process AS process WHERE EXISTS (SELECT 1 FROM process.tasks t \
         WHERE t.processingStatus = :userFilter1QueryObject AND t.processingUser.login LIKE :userFilter1)"
    );
    assert_eq!(
        query.query_parameters().unwrap()["userFilter1"],
        QueryValue::text("jdoe%")
    );
}

#[test]
fn test_automatic_tasks() {
    let query = build(RecordKind::Task, "stepAutomatic:OCR");
    assert_eq!(
        query.form_count_query(),
        "SELECT COUNT(*) FROM Task AS task WHERE (task.processingStatus = :userFilter1QueryObject \
         AND task.typeAutomatic = true AND task.title = :userFilter1)"
    );
}

// ============================================================================
// Unsupported Combinations
// ============================================================================

#[test]
fn test_filters_on_other_kinds_never_match() {
    for filter in ["project:Example", "id:4", "faust", "metadata:author:goethe"] {
        let query = build(RecordKind::Template, filter);
        assert_eq!(
            query.form_count_query(),
            format!("SELECT COUNT(*) FROM Template AS template WHERE {SQL_FALSE}"),
            "filter {filter}"
        );
        assert!(query.pending_lookups().is_empty());
        assert!(query.query_parameters().is_ok());
    }
}

#[test]
fn test_scope_restrictions_reject_kinds() {
    let mut query = QueryBuilder::new(RecordKind::User);
    assert_eq!(
        query.restrict_to_client(1).unwrap_err(),
        QueryError::UnsupportedRecordKind {
            operation: "restrictToClient",
            kind: RecordKind::User,
        }
    );
    assert!(query.restrict_to_projects([1]).is_err());
    assert!(query.restrict_to_roles([1]).is_err());
    assert_eq!(query.form_count_query(), "SELECT COUNT(*) FROM User AS user");
}

#[test]
fn test_client_paths() {
    let cases = [
        (RecordKind::Docket, "docket.client.id"),
        (RecordKind::Project, "project.client.id"),
        (RecordKind::Ruleset, "ruleset.client.id"),
        (RecordKind::Workflow, "workflow.client.id"),
        (RecordKind::Process, "process.project.client.id"),
        (RecordKind::Task, "task.process.project.client.id"),
    ];
    for (kind, path) in cases {
        let mut query = QueryBuilder::new(kind);
        query.restrict_to_client(7).unwrap();
        assert!(
            query
                .form_count_query()
                .ends_with(&format!("WHERE {path} = :sessionClientId")),
            "{kind}"
        );
        assert_eq!(
            query.query_parameters().unwrap()["sessionClientId"],
            QueryValue::Integer(7)
        );
    }
}

// ============================================================================
// Quick Search
// ============================================================================

#[test]
fn test_for_id_or_in_title() {
    let mut query = QueryBuilder::new(RecordKind::Process);
    query.for_id_or_in_title("42");
    assert_eq!(
        query.form_count_query(),
        "SELECT COUNT(*) FROM Process AS process \
         WHERE (process.id = :possibleId OR process.title LIKE :searchInput)"
    );
    let params = query.query_parameters().unwrap();
    assert_eq!(params["possibleId"], QueryValue::Integer(42));
    assert_eq!(params["searchInput"], QueryValue::text("%42%"));

    let mut query = QueryBuilder::new(RecordKind::Task);
    query.for_id_or_in_title("\"id:42\"");
    assert_eq!(
        query.form_count_query(),
        "SELECT COUNT(*) FROM Task AS task WHERE task.process.id = :id"
    );

    let mut query = QueryBuilder::new(RecordKind::Project);
    query.for_id_or_in_title("Old Prints");
    assert_eq!(
        query.form_count_query(),
        "SELECT COUNT(*) FROM Project AS project WHERE project.title LIKE :searchInput"
    );
    assert_eq!(
        query.query_parameters().unwrap()["searchInput"],
        QueryValue::text("%Old Prints%")
    );
}

// ============================================================================
// Sorting
// ============================================================================

#[test]
fn test_last_task_sorting() {
    let mut query = build(RecordKind::Process, "project:Example");
    query.define_sorting("lastTask.title", SortDirection::Descending);

    let fetch = query.form_query_for_all();
    assert!(fetch.starts_with("FROM Process AS process LEFT JOIN process.tasks lastTask WITH"));
    assert!(fetch.ends_with(
        "WHERE process.project.title = :userFilter1 ORDER BY lastTask.title DESC"
    ));
    assert!(query.form_query_without_select().contains("LEFT JOIN process.tasks lastTask"));
    assert!(!query.form_count_query().contains("lastTask"));
}

#[test]
fn test_unordered_and_distinct() {
    let mut query = build(RecordKind::Process, "project:Example");
    query.set_unordered();
    assert_eq!(
        query.form_query_for_all(),
        "FROM Process AS process WHERE process.project.title = :userFilter1"
    );
    assert_eq!(
        query.form_query_for_distinct("title", true),
        "SELECT DISTINCT process.title FROM Process AS process \
         WHERE process.project.title = :userFilter1 ORDER BY process.title ASC"
    );
}

// ============================================================================
// Index Lookups
// ============================================================================

#[tokio::test]
async fn test_index_lookups_bind_process_ids() {
    let mut query = build(RecordKind::Task, "metadata:author:goethe -batch:");
    assert_eq!(query.pending_lookups().len(), 2);
    assert!(matches!(
        query.query_parameters(),
        Err(QueryError::PendingIndexSearches { pending: 2 })
    ));

    query
        .perform_index_searches(&seeded_index(), IndexFailurePolicy::Propagate)
        .await
        .unwrap();

    assert_eq!(
        query.form_count_query(),
        "SELECT COUNT(*) FROM Task AS task WHERE task.process.id IN (:userFilter1) \
         AND task.process.id NOT IN (:userFilter2)"
    );
    let params = query.query_parameters().unwrap();
    assert_eq!(params["userFilter1"], QueryValue::IntegerList(vec![10, 11]));
    assert_eq!(params["userFilter2"], QueryValue::IntegerList(vec![10]));
}

#[tokio::test]
async fn test_index_lookup_without_hits_binds_no_hit() {
    let mut query = build(RecordKind::Process, "hamlet");
    query
        .perform_index_searches(&seeded_index(), IndexFailurePolicy::Propagate)
        .await
        .unwrap();
    assert_eq!(
        query.query_parameters().unwrap()["userFilter1"],
        QueryValue::IntegerList(NO_HIT.to_vec())
    );
}

#[tokio::test]
async fn test_index_filters_as_alternatives() {
    let mut query = QueryBuilder::new(RecordKind::Process);
    query
        .set_index_filters_as_alternatives()
        .restrict_with_user_filter(&FilterParser::default().parse("schiller project:Example batch:spring"));
    query
        .perform_index_searches(&seeded_index(), IndexFailurePolicy::Propagate)
        .await
        .unwrap();

    assert_eq!(
        query.form_count_query(),
        "SELECT COUNT(*) FROM Process AS process WHERE process.project.title = :userFilter2 \
         AND (process.id IN (:userFilter1) OR process.id IN (:userFilter3))"
    );
    let params = query.query_parameters().unwrap();
    assert_eq!(params["userFilter1"], QueryValue::IntegerList(vec![12]));
    assert_eq!(params["userFilter3"], QueryValue::IntegerList(vec![10]));
}
