use gridview::table::filtering::IN_NUMBER_RANGE;
use gridview::table::sorting::TEXT;
use gridview::table::{
    Column, ColumnSort, FilterOption, FilterState, FilterValue, SortState, Table, Value,
};

#[derive(Debug, Clone)]
struct Order {
    id: u32,
    customer: &'static str,
    phone: &'static str,
    status: &'static str,
    priority: &'static str,
    amount: f64,
}

const CUSTOMERS: [&str; 4] = ["Acme", "Globex", "Initech", "Umbrella"];
const PRIORITIES: [&str; 3] = ["high", "low", "medium"];

fn orders(n: u32) -> Vec<Order> {
    (1..=n)
        .map(|id| Order {
            id,
            customer: CUSTOMERS[(id % 4) as usize],
            phone: if id % 5 == 0 { "555-0105" } else { "555-0199" },
            status: if id % 3 == 0 { "completed" } else { "pending" },
            priority: PRIORITIES[(id % 3) as usize],
            amount: f64::from(id * 7 % 50),
        })
        .collect()
}

fn columns() -> Vec<Column<Order>> {
    vec![
        Column::new("id", |o: &Order| Value::from(o.id)),
        Column::new("customer", |o: &Order| Value::from(o.customer))
            .text_filter()
            .global_search(true),
        Column::new("phone", |o: &Order| Value::from(o.phone))
            .text_filter()
            .global_search(true),
        Column::new("status", |o: &Order| Value::from(o.status)).select_filter(vec![
            FilterOption::new("pending", "Pending"),
            FilterOption::new("completed", "Completed"),
        ]),
        Column::new("priority", |o: &Order| Value::from(o.priority)).sort_key(TEXT),
        Column::new("amount", |o: &Order| Value::from(o.amount))
            .text_filter()
            .filter_fn(IN_NUMBER_RANGE),
    ]
}

fn table(rows: Vec<Order>, page_size: usize) -> Table<Order> {
    let options = gridview::table::TableOptions {
        page_size,
        page_size_options: vec![5, 10, 25],
        ..Default::default()
    };
    Table::builder(columns())
        .rows(rows)
        .options(options)
        .row_id(|o, _| o.id.to_string())
        .build()
        .unwrap()
}

fn ids(table: &Table<Order>, indices: &[usize]) -> Vec<u32> {
    indices.iter().map(|&i| table.rows()[i].id).collect()
}

fn page_ids(table: &Table<Order>) -> Vec<u32> {
    ids(table, table.row_model().page_rows())
}

#[test]
fn test_scenario_pages_of_twenty_five_rows() {
    let mut table = table(orders(25), 10);
    assert_eq!(table.row_model().page_count(), 3);
    assert_eq!(page_ids(&table), (1..=10).collect::<Vec<_>>());

    table.set_page_index(2);
    assert_eq!(page_ids(&table), (21..=25).collect::<Vec<_>>());
    assert!(!table.can_next_page());
}

#[test]
fn test_scenario_status_filter_keeps_order() {
    let mut table = table(orders(10), 10);
    table.set_column_filter("status", Some(FilterValue::text("completed")));

    // ids 3, 6 and 9 are completed among 1..=10
    assert_eq!(page_ids(&table), vec![3, 6, 9]);

    let mut rows = orders(10);
    rows[0].status = "completed";
    let mut table = self::table(rows, 10);
    table.set_column_filter("status", Some(FilterValue::text("completed")));
    assert_eq!(page_ids(&table), vec![1, 3, 6, 9]);
}

#[test]
fn test_scenario_priority_sort_toggles_with_stable_ties() {
    let mut table = table(orders(9), 10);

    table.toggle_sorting("priority", false);
    // high: 3, 6, 9 / low: 1, 4, 7 / medium: 2, 5, 8
    assert_eq!(page_ids(&table), vec![3, 6, 9, 1, 4, 7, 2, 5, 8]);

    table.toggle_sorting("priority", false);
    assert_eq!(page_ids(&table), vec![2, 5, 8, 1, 4, 7, 3, 6, 9]);
}

#[test]
fn test_scenario_global_search_on_phone() {
    let mut table = table(orders(20), 25);
    table.set_global_filter(Some("105".to_string()));
    assert_eq!(page_ids(&table), vec![5, 10, 15, 20]);

    // A filter on another column narrows the global matches, it does not replace them
    table.set_column_filter("status", Some(FilterValue::text("completed")));
    assert_eq!(page_ids(&table), vec![15]);

    table.set_column_filter("status", None);
    assert_eq!(page_ids(&table), vec![5, 10, 15, 20]);
}

#[test]
fn test_global_search_ignores_columns_outside_search() {
    let mut table = table(orders(10), 10);
    // "completed" only appears in the status column, which is not searchable
    table.set_global_filter(Some("completed".to_string()));
    assert_eq!(table.row_model().filtered_count(), 0);
}

#[test]
fn test_stricter_filters_select_a_subset() {
    let mut table = table(orders(40), 25);
    let cases = [
        FilterState::new().with("status", FilterValue::text("pending")),
        FilterState::new()
            .with("status", FilterValue::text("pending"))
            .with("customer", FilterValue::text("ac")),
        FilterState::new()
            .with("status", FilterValue::text("pending"))
            .with("customer", FilterValue::text("ac"))
            .with("amount", FilterValue::range(Some(10.0), Some(40.0))),
    ];

    let mut previous: Option<Vec<usize>> = None;
    for filters in cases {
        table.set_column_filters(filters);
        let current = table.row_model().filtered_rows().to_vec();
        if let Some(looser) = &previous {
            assert!(current.iter().all(|i| looser.contains(i)));
            assert!(current.len() <= looser.len());
        }
        previous = Some(current);
    }
}

#[test]
fn test_no_filters_is_identity() {
    let table = table(orders(17), 25);
    let expected: Vec<usize> = (0..17).collect();
    assert_eq!(table.row_model().filtered_rows(), expected.as_slice());
    assert_eq!(table.row_model().sorted_rows(), expected.as_slice());
}

#[test]
fn test_equal_keys_keep_their_order() {
    let mut table = table(orders(30), 25);
    table.set_sorting(SortState::new().then(ColumnSort::asc("status")));

    let sorted = ids(&table, table.row_model().sorted_rows());
    for status in ["completed", "pending"] {
        let group: Vec<u32> = sorted
            .iter()
            .copied()
            .filter(|&id| table.rows()[id as usize - 1].status == status)
            .collect();
        let mut in_input_order = group.clone();
        in_input_order.sort_unstable();
        assert_eq!(group, in_input_order, "{} rows were reordered", status);
    }
}

#[test]
fn test_three_toggles_restore_sorting() {
    let mut table = table(orders(12), 10);
    table.set_sorting(SortState::new().then(ColumnSort::desc("amount")));
    let before = table.sorting().clone();

    for _ in 0..3 {
        table.toggle_sorting("priority", true);
    }
    assert_eq!(table.sorting(), &before);

    table.clear_sorting();
    for _ in 0..3 {
        table.toggle_sorting("customer", false);
    }
    assert!(table.sorting().is_empty());
}

#[test]
fn test_single_key_toggles_restore_other_keys() {
    let mut table = table(orders(12), 10);
    table.set_sorting(SortState::new().then(ColumnSort::desc("id")));
    let before = table.sorting().clone();

    table.toggle_sorting("priority", false);
    assert_eq!(
        table.sorting().entries(),
        &[ColumnSort::asc("priority"), ColumnSort::desc("id")]
    );
    // high rows first, ties broken by id descending
    assert_eq!(&page_ids(&table)[..4], &[12, 9, 6, 3]);

    table.toggle_sorting("priority", false);
    table.toggle_sorting("priority", false);
    assert_eq!(table.sorting(), &before);
}

#[test]
fn test_scenario_priority_case_differences_tie() {
    let mut rows = orders(4);
    for (order, priority) in rows.iter_mut().zip(["High", "high", "High", "low"]) {
        order.priority = priority;
    }
    let mut table = table(rows, 10);

    table.toggle_sorting("priority", false);
    assert_eq!(page_ids(&table), vec![1, 2, 3, 4]);

    table.toggle_sorting("priority", false);
    assert_eq!(page_ids(&table), vec![4, 1, 2, 3]);
}

#[test]
fn test_pages_partition_the_sorted_rows() {
    let mut table = table(orders(23), 5);
    table.set_column_filter("customer", Some(FilterValue::text("e")));
    table.set_sorting(SortState::new().then(ColumnSort::desc("amount")));

    let expected = table.row_model().sorted_rows().to_vec();
    let mut seen = Vec::new();
    for page in 0..table.row_model().page_count() {
        table.set_page_index(page);
        seen.extend_from_slice(table.row_model().page_rows());
    }
    assert_eq!(seen, expected);
}

#[test]
fn test_page_index_past_the_end_lands_on_last_page() {
    let mut table = table(orders(23), 5);
    table.set_page_index(99);
    assert_eq!(table.pagination().page_index, 4);
    assert_eq!(page_ids(&table), vec![21, 22, 23]);

    table.set_column_filter("status", Some(FilterValue::text("completed")));
    // 7 completed rows fit on two pages
    assert_eq!(table.row_model().page_count(), 2);
    assert_eq!(table.pagination().page_index, 1);
}
