//! Command sequences committed through the API and read back.

use crate::common::*;

fn names(output: &Output) -> Vec<Datum> {
    output
        .as_rows()
        .unwrap()
        .iter()
        .map(|row| row["name"].clone())
        .collect()
}

#[test]
fn create_then_find() {
    let (db, api) = open();

    let mut txn = api.transaction_with(short_options().with_check_error(true));
    let bridge = txn.add(Command::create(
        "Bridge",
        [("name", Value::from("br0")), ("datapath_type", Value::from("netdev"))],
    ));
    txn.add(Command::create("Bridge", [("name", "br1")]));
    let results = txn.commit().unwrap().unwrap();
    assert_eq!(results.len(), 2);

    let uuid = bridge.row_uuid().unwrap();
    assert_eq!(results[0], Output::Row(uuid));
    assert_eq!(db.row("Bridge", uuid).unwrap()["datapath_type"], text("netdev"));

    let found = Command::find(
        "Bridge",
        [Condition::parse("name", "=", "br0").unwrap()],
        Some(vec!["name".to_string(), "_uuid".to_string()]),
    )
    .execute(&api, true, true)
    .unwrap()
    .unwrap();
    let rows = found.as_rows().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], text("br0"));
    assert_eq!(rows[0]["_uuid"], Datum::from(uuid));
}

#[test]
fn commands_see_earlier_commands_in_the_same_transaction() {
    let (db, api) = open();

    let mut txn = api.transaction_with(short_options().with_check_error(true));
    let port = txn.add(Command::create("Port", [("name", "p0")]));
    let bridge = txn.add(Command::create("Bridge", [("name", "br0")]));
    txn.add(Command::add("Bridge", &bridge, "ports", [&port]));
    txn.add(Command::set("Port", "p0", [("tag", 10)]));
    let tag = txn.add(Command::get("Port", &port, "tag"));
    txn.commit().unwrap().unwrap();

    let port_uuid = port.row_uuid().unwrap();
    let bridge_uuid = bridge.row_uuid().unwrap();
    assert_eq!(
        db.row("Bridge", bridge_uuid).unwrap()["ports"],
        Datum::set([port_uuid])
    );
    // Optional column with one value reads back as a plain value.
    assert_eq!(tag.result(), Output::Datum(Datum::from(10i64)));
}

#[test]
fn results_follow_command_order() {
    let (db, api) = open();
    db.insert_row("Bridge", bridge_row("br0")).unwrap();

    let mut txn = api.transaction_with(short_options().with_check_error(true));
    txn.add(Command::set("Bridge", "br0", [("datapath_type", "system")]));
    txn.add(Command::get("Bridge", "br0", "datapath_type"));
    txn.add(Command::set("Bridge", "br0", [("datapath_type", "netdev")]));
    txn.add(Command::get("Bridge", "br0", "datapath_type"));
    let results = txn.commit().unwrap().unwrap();

    assert_eq!(
        results,
        vec![
            Output::None,
            Output::Datum(text("system")),
            Output::None,
            Output::Datum(text("netdev")),
        ]
    );
}

#[test]
fn list_with_and_without_if_exists() {
    let (db, api) = open();
    db.insert_row("Port", port_row("p0")).unwrap();
    db.insert_row("Port", port_row("p1")).unwrap();

    let listed = Command::list(
        "Port",
        ["p1", "missing", "p0"],
        Some(vec!["name".to_string()]),
        true,
    )
    .execute(&api, true, true)
    .unwrap()
    .unwrap();
    assert_eq!(names(&listed), vec![text("p1"), text("p0")]);

    let err = Command::list("Port", ["p1", "missing"], Some(vec!["name".to_string()]), false)
        .execute(&api, true, false)
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("records=[\"p1\", \"missing\"]"));
}

#[test]
fn list_everything_returns_every_column() {
    let (db, api) = open();
    let row = db.insert_row("Bridge", bridge_row("br0")).unwrap();

    let listed = Command::list("Bridge", Vec::<&str>::new(), None, false)
        .execute(&api, true, true)
        .unwrap()
        .unwrap();
    let rows = listed.as_rows().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["_uuid"], Datum::from(row));
    assert!(rows[0].contains_key("external_ids"));
    assert!(rows[0].contains_key("flood_vlans"));
}

#[test]
fn add_to_map_keeps_existing_keys() {
    let (db, api) = open();
    let row = db
        .insert_row(
            "Bridge",
            vec![
                ("name", text("br0")),
                ("external_ids", Datum::map([("owner", "agent")])),
            ],
        )
        .unwrap();

    Command::add(
        "Bridge",
        "br0",
        "external_ids",
        [Value::map([("owner", "someone-else"), ("zone", "a")])],
    )
    .execute(&api, true, true)
    .unwrap();

    assert_eq!(
        db.row("Bridge", row).unwrap()["external_ids"],
        Datum::map([("owner", "agent"), ("zone", "a")])
    );
}

#[test]
fn add_to_map_retries_against_a_concurrent_writer() {
    let (db, api) = open();
    let row = db.insert_row("Bridge", bridge_row("br0")).unwrap();

    let hook = before_first_attempt(&db, move |db| {
        db.update_row("Bridge", row, "external_ids", Datum::map([("k", "theirs")]))
            .unwrap();
    });
    let mut txn = api
        .transaction_with(short_options().with_check_error(true))
        .with_pre_commit(hook);
    txn.add(Command::add(
        "Bridge",
        "br0",
        "external_ids",
        [Value::map([("k", "mine"), ("j", "mine")])],
    ));
    txn.commit().unwrap().unwrap();

    assert_eq!(
        db.row("Bridge", row).unwrap()["external_ids"],
        Datum::map([("j", "mine"), ("k", "theirs")])
    );
}

#[test]
fn set_merges_map_columns_and_clear_empties_them() {
    let (db, api) = open();
    let row = db
        .insert_row(
            "Bridge",
            vec![
                ("name", text("br0")),
                ("other_config", Datum::map([("a", "1"), ("b", "2")])),
            ],
        )
        .unwrap();

    Command::set(
        "Bridge",
        row,
        [("other_config", Value::map([("b", "20"), ("c", "30")]))],
    )
    .execute(&api, true, true)
    .unwrap();
    assert_eq!(
        db.row("Bridge", row).unwrap()["other_config"],
        Datum::map([("a", "1"), ("b", "20"), ("c", "30")])
    );

    Command::clear("Bridge", row, "other_config")
        .execute(&api, true, true)
        .unwrap();
    assert_eq!(db.row("Bridge", row).unwrap()["other_config"], Datum::empty_map());
}

#[test]
fn destroy_removes_the_row() {
    let (db, api) = open();
    db.insert_row("Bridge", bridge_row("br0")).unwrap();
    db.insert_row("Bridge", bridge_row("br1")).unwrap();

    Command::destroy("Bridge", "br0")
        .execute(&api, true, true)
        .unwrap();

    let remaining = Command::find("Bridge", Vec::new(), Some(vec!["name".to_string()]))
        .execute(&api, true, true)
        .unwrap()
        .unwrap();
    assert_eq!(names(&remaining), vec![text("br1")]);
}

#[test]
fn read_only_transaction_is_unchanged() {
    let (db, api) = open();
    db.insert_row("Bridge", bridge_row("br0")).unwrap();
    let before = db.change_seqno();

    let name = Command::get("Bridge", "br0", "name")
        .execute(&api, true, true)
        .unwrap();
    assert_eq!(name, Some(Output::Datum(text("br0"))));
    assert_eq!(db.change_seqno(), before);
}

#[test]
fn create_then_destroy_in_one_transaction_succeeds() {
    let (db, api) = open();

    let mut txn = api.transaction_with(short_options().with_check_error(true));
    let created = txn.add(Command::create("Bridge", [("name", "tmp")]));
    txn.add(Command::destroy("Bridge", &created));
    let results = txn.commit().unwrap();

    assert_eq!(results, Some(vec![Output::None, Output::None]));
    assert_eq!(created.row_uuid(), None);
    assert_eq!(db.row_count("Bridge"), 0);
}
