//! End-to-end tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives every table
//! operation through the default `UreqTransport` over real HTTP. This checks
//! that URLs, headers, bodies and status handling agree with a server that
//! parses them independently.

use std::time::Duration;

use nocodb_client::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Task {
    #[serde(rename = "Id", skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Priority")]
    priority: u32,
    #[serde(rename = "Done")]
    done: bool,
}

fn task(title: &str, priority: u32, done: bool) -> Task {
    Task {
        id: None,
        title: title.to_string(),
        priority,
        done,
    }
}

/// Start the mock server on a random port and return its base URL.
fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, mock_server::DEFAULT_TOKEN).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

fn client(base_url: &str) -> Client {
    Client::builder()
        .base_url(base_url)
        .api_token(mock_server::DEFAULT_TOKEN)
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

#[test]
fn record_lifecycle() {
    let base_url = start_server();
    let client = client(&base_url);
    let tasks = client.table("tasks");

    // Empty table.
    let page = tasks.list_records().execute().unwrap();
    assert!(page.is_empty());
    assert_eq!(tasks.count_records().execute().unwrap(), 0);

    // Create one, then several.
    let first = tasks.create_record(&task("Write docs", 2, false)).execute().unwrap();
    assert_eq!(first, 1);
    let more = tasks
        .create_records(&[
            task("Fix bug", 1, false),
            task("Ship release", 3, false),
            task("Plan sprint", 2, true),
        ])
        .execute()
        .unwrap();
    assert_eq!(more, vec![2, 3, 4]);
    assert_eq!(tasks.count_records().execute().unwrap(), 4);

    // Read back into a typed struct.
    let fetched: Task = tasks.read_record(first).execute().unwrap().decode_into().unwrap();
    assert_eq!(fetched.id, Some(first));
    assert_eq!(fetched.title, "Write docs");

    // Field selection on read.
    let partial = tasks.read_record(first).return_fields(["Title"]).execute().unwrap();
    assert_eq!(partial.data.len(), 1);

    // Filtered, sorted and paginated list.
    let open = tasks
        .list_records()
        .where_is_false("Done")
        .sort_desc_by("Priority")
        .limit(2)
        .execute()
        .unwrap();
    let titles: Vec<Task> = open.decode_into().unwrap();
    let titles: Vec<&str> = titles.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Ship release", "Write docs"]);
    assert_eq!(open.page_info.total_rows, 3);
    assert!(!open.page_info.is_last_page);

    let second_page = tasks
        .list_records()
        .where_is_false("Done")
        .sort_desc_by("Priority")
        .page(2, 2)
        .execute()
        .unwrap();
    assert_eq!(second_page.len(), 1);
    assert_eq!(second_page.list[0]["Title"], "Fix bug");
    assert!(second_page.page_info.is_last_page);

    // Grouped filter expression.
    let group = Filter::equal_to("Priority", 1).or(Filter::is_true("Done"));
    assert_eq!(tasks.count_records().where_expr(group).execute().unwrap(), 2);
    assert_eq!(
        tasks
            .count_records()
            .where_is_in("Priority", [2, 3])
            .where_is_like("Title", "%e%")
            .execute()
            .unwrap(),
        2
    );

    // Update one, then several.
    tasks.update_record(first, &json!({"Done": true})).execute().unwrap();
    let updated = tasks
        .update_records(&[json!({"Id": 2, "Done": true}), json!({"Id": 3, "Priority": 5})])
        .execute()
        .unwrap();
    assert_eq!(updated, vec![2, 3]);
    assert_eq!(tasks.count_records().where_is_true("Done").execute().unwrap(), 3);
    let shipped = tasks.read_record(3).execute().unwrap();
    assert_eq!(shipped.data["Priority"], 5);
    assert_eq!(shipped.data["Title"], "Ship release");

    // Delete one, then several.
    tasks.delete_record(first).execute().unwrap();
    assert!(matches!(tasks.read_record(first).execute(), Err(Error::NotFound { .. })));
    tasks.delete_records([2, 3]).execute().unwrap();
    assert_eq!(tasks.count_records().execute().unwrap(), 1);
}

#[test]
fn link_lifecycle() {
    let base_url = start_server();
    let client = client(&base_url);
    let people = client.table("people");

    let ids = people
        .create_records(&[json!({"Name": "Ada"}), json!({"Name": "Grace"}), json!({"Name": "Linus"})])
        .execute()
        .unwrap();
    let (ada, grace, linus) = (ids[0], ids[1], ids[2]);

    people.create_link("friends", ada, grace).execute().unwrap();
    people.create_links("friends", ada, [linus]).execute().unwrap();

    let friends = people
        .list_links("friends", ada)
        .sort_asc_by("Name")
        .return_fields(["Name"])
        .execute()
        .unwrap();
    let names: Vec<&str> = friends.list.iter().filter_map(|r| r["Name"].as_str()).collect();
    assert_eq!(names, vec!["Grace", "Linus"]);

    let filtered = people
        .list_links("friends", ada)
        .where_equal_to("Name", "Linus")
        .execute()
        .unwrap();
    assert_eq!(filtered.len(), 1);

    people.delete_link("friends", ada, grace).execute().unwrap();
    people.delete_links("friends", ada, [linus]).execute().unwrap();
    assert!(people.list_links("friends", ada).execute().unwrap().is_empty());

    // Linking from a row that does not exist.
    let err = people.create_link("friends", 999, ada).execute().unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
}

#[test]
fn server_errors_are_classified() {
    let base_url = start_server();

    let wrong_token = Client::builder()
        .base_url(&base_url)
        .api_token("wrong")
        .build()
        .unwrap();
    let err = wrong_token.table("t").list_records().execute().unwrap_err();
    assert!(matches!(err, Error::Api { status: 401, .. }), "got {err:?}");

    let client = client(&base_url);
    let err = client
        .table("t")
        .list_records()
        .where_is_within("Created", DateWithinSubOperator::PastWeek)
        .execute()
        .unwrap_err();
    assert!(matches!(err, Error::Api { status: 400, .. }), "got {err:?}");

    let err = client.table("t").delete_record(42).execute().unwrap_err();
    match err {
        Error::NotFound { message } => assert_eq!(message, "Record '42' not found"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn unreachable_server_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client(&format!("http://{addr}"));
    let err = client
        .table("t")
        .count_records()
        .with_timeout(Duration::from_secs(2))
        .execute()
        .unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "got {err:?}");
}
