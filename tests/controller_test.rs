use std::sync::Arc;

use nutri_board::controller::{LoadPolicy, PagingMode, SortSpec, TabularViewController};
use nutri_board::types::{LooseNumber, Product, Report, ReportStatus, UserSummary};

fn user(login: &str, email: Option<&str>, streak: Option<LooseNumber>, last: Option<&str>) -> UserSummary {
    UserSummary {
        login: login.to_owned(),
        email: email.map(str::to_owned),
        fio: None,
        streak,
        last_activity: last.map(str::to_owned),
    }
}

fn users() -> Vec<UserSummary> {
    vec![
        user("anna", Some("anna@mail.example"), Some(LooseNumber::Number(12.0)), Some("2025-03-14T08:00:00")),
        user("boris", None, Some(LooseNumber::Text("3".into())), None),
        user("clara", Some("clara@corp.example"), None, Some("2025-03-10T21:30:00")),
        user("dmitri", Some("dima@mail.example"), Some(LooseNumber::Text("n/a".into())), Some("2025-03-12T12:00:00")),
    ]
}

fn logins(ctrl: &TabularViewController<UserSummary>) -> Vec<&str> {
    ctrl.compute_visible_page()
        .rows
        .iter()
        .map(|u| u.login.as_str())
        .collect()
}

fn loaded_users(sort: SortSpec) -> TabularViewController<UserSummary> {
    let mut ctrl = TabularViewController::new(
        Arc::new(UserSummary::schema()),
        sort,
        16,
        PagingMode::Client,
    );
    assert!(ctrl.begin_load());
    ctrl.finish_load(Ok(users()), LoadPolicy::ResetPage);
    ctrl
}

#[test]
fn last_activity_descending_puts_missing_dates_last() {
    let ctrl = loaded_users(SortSpec::descending("lastActivity"));
    assert_eq!(logins(&ctrl), ["anna", "dmitri", "clara", "boris"]);
}

#[test]
fn streak_mixes_null_numbers_and_numeric_strings() {
    let mut ctrl = TabularViewController::new(
        Arc::new(UserSummary::schema()),
        SortSpec::ascending("streak"),
        16,
        PagingMode::Client,
    );
    ctrl.begin_load();
    ctrl.finish_load(
        Ok(vec![
            user("none", None, None, None),
            user("five", None, Some(LooseNumber::Number(5.0)), None),
            user("three", None, Some(LooseNumber::Text("3".into())), None),
        ]),
        LoadPolicy::ResetPage,
    );
    assert_eq!(logins(&ctrl), ["none", "three", "five"]);
    ctrl.sort_by("streak").unwrap();
    assert_eq!(logins(&ctrl), ["five", "three", "none"]);
}

#[test]
fn filtering_and_sorting_commute() {
    for (query, field) in [
        ("mail", "streak"),
        ("example", "lastActivity"),
        ("a", "login"),
        ("email:corp", "email"),
    ] {
        let mut filter_first = loaded_users(SortSpec::ascending("login"));
        filter_first.apply_filter(query);
        filter_first.sort_by(field).unwrap();

        let mut sort_first = loaded_users(SortSpec::ascending("login"));
        sort_first.sort_by(field).unwrap();
        sort_first.apply_filter(query);

        let a: Vec<&str> = filter_first.filtered().map(|u| u.login.as_str()).collect();
        let b: Vec<&str> = sort_first.filtered().map(|u| u.login.as_str()).collect();
        assert_eq!(a, b, "query {query:?} sorted by {field}");
    }
}

#[test]
fn streak_sorts_numerically_with_unusable_values_as_zero() {
    let ctrl = loaded_users(SortSpec::ascending("streak"));
    // "n/a" and a missing streak both count as 0 and keep fetch order.
    assert_eq!(logins(&ctrl), ["clara", "dmitri", "boris", "anna"]);
}

#[test]
fn search_matches_any_searchable_field_or_a_scoped_one() {
    let mut ctrl = loaded_users(SortSpec::ascending("login"));

    ctrl.apply_filter("MAIL.example");
    assert_eq!(logins(&ctrl), ["anna", "dmitri"]);

    ctrl.apply_filter("email:corp");
    assert_eq!(logins(&ctrl), ["clara"]);

    ctrl.apply_filter("nobody");
    assert!(logins(&ctrl).is_empty());
    assert_eq!(ctrl.compute_visible_page().shown_range_start, 0);

    ctrl.apply_filter("");
    assert_eq!(ctrl.filtered_len(), 4);
}

#[test]
fn clicking_the_sort_column_twice_flips_direction() {
    let mut ctrl = loaded_users(SortSpec::ascending("login"));
    ctrl.sort_by("login").unwrap();
    assert_eq!(logins(&ctrl), ["dmitri", "clara", "boris", "anna"]);
    ctrl.sort_by("lastActivity").unwrap();
    assert_eq!(logins(&ctrl)[0], "boris");
}

fn report(id: i64) -> Report {
    Report {
        id,
        status: ReportStatus::Completed,
        period_start: Some("2025.03.01".into()),
        period_end: Some("2025.03.03".into()),
        created_at: None,
        completed_at: None,
        total_execution_time: None,
    }
}

#[test]
fn server_pages_report_their_offset_in_the_total() {
    let mut ctrl = TabularViewController::new(
        Arc::new(Report::schema()),
        SortSpec::descending("created"),
        8,
        PagingMode::Server { total_count: 0 },
    );
    ctrl.set_server_total(19);
    assert!(ctrl.go_to_page(3));

    assert!(ctrl.begin_load());
    ctrl.finish_load(Ok((17..=19).map(report).collect()), LoadPolicy::PreservePage);

    let visible = ctrl.compute_visible_page();
    assert_eq!(visible.page, 3);
    assert_eq!(visible.total_pages, 3);
    assert_eq!((visible.shown_range_start, visible.shown_range_end), (17, 19));
    assert_eq!(visible.rows.len(), 3);
}

#[test]
fn shrinking_total_clamps_a_preserved_page() {
    let mut ctrl = TabularViewController::new(
        Arc::new(Report::schema()),
        SortSpec::descending("created"),
        8,
        PagingMode::Server { total_count: 24 },
    );
    assert!(ctrl.go_to_page(3));
    ctrl.set_server_total(9);
    ctrl.begin_load();
    ctrl.finish_load(Ok(vec![report(1)]), LoadPolicy::PreservePage);
    assert_eq!(ctrl.page(), 2);
}

fn product(id: i64) -> Product {
    Product {
        id,
        name: format!("product {id}"),
        calories_per_100g: Some(100.0),
        proteins_per_100g: None,
        fats_per_100g: None,
        carbs_per_100g: None,
        created_by: None,
        created_at: None,
    }
}

#[test]
fn deleting_a_row_renumbers_later_rows_and_clamps_the_page() {
    let mut ctrl = TabularViewController::new(
        Arc::new(Product::schema()),
        SortSpec::ascending("id"),
        3,
        PagingMode::Client,
    );
    ctrl.begin_load();
    ctrl.finish_load(Ok((1..=10).map(product).collect()), LoadPolicy::ResetPage);
    // Page 4 holds only product 10.
    assert!(ctrl.go_to_page(4));
    assert_eq!(ctrl.compute_visible_page().rows.len(), 1);

    let removed = ctrl.remove_by_key(&4).expect("product 4 is loaded");
    assert_eq!(removed.id, 4);

    let orders: Vec<(i64, usize)> = ctrl
        .entries()
        .iter()
        .map(|e| (e.record.id, e.original_order))
        .collect();
    assert_eq!(
        orders,
        [(1, 0), (2, 1), (3, 2), (5, 3), (6, 4), (7, 5), (8, 6), (9, 7), (10, 8)]
    );

    let visible = ctrl.compute_visible_page();
    assert_eq!((visible.page, visible.total_pages), (3, 3));
    assert_eq!(visible.rows.iter().map(|p| p.id).collect::<Vec<_>>(), [8, 9, 10]);
    assert_eq!((visible.shown_range_start, visible.shown_range_end), (7, 9));
}
