//! Append behaviour of the CSV destination
use chrono::NaiveDate;
use listing_harvester::domain::record::{COLUMNS, NOT_AVAILABLE};
use listing_harvester::domain::{ExtractedRecord, InterestTerms, Layout};
use listing_harvester::infrastructure::{CsvSink, RecordSink};
use std::fs;

fn record(link: &str, cycle_id: u64) -> ExtractedRecord {
    ExtractedRecord {
        extraction_date: NaiveDate::from_ymd_opt(2024, 6, 2)
            .unwrap()
            .and_hms_opt(14, 5, 9)
            .unwrap(),
        cycle_id,
        title: "Samsung Galaxy A35 5G; 128GB".to_string(),
        seller: "Samsung".to_string(),
        price: "1.799.00".to_string(),
        discount: "10%".to_string(),
        installments: "10".to_string(),
        interest_free: Some(InterestTerms::InterestFree),
        total_sold_raw: "+1000 vendidos".to_string(),
        free_delivery: true,
        arrival_estimation: "Tomorrow".to_string(),
        is_great_deal: true,
        is_bestseller: false,
        is_recommended: false,
        link: link.to_string(),
        layout_type: Layout::List,
        price_range_searched: "1750-1799".to_string(),
    }
}

fn header_count(text: &str) -> usize {
    let header = COLUMNS.join(";");
    text.lines()
        .filter(|line| line.trim_start_matches('\u{feff}') == header)
        .count()
}

#[test]
fn consecutive_appends_never_repeat_header() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("market.csv");

    let mut sink = CsvSink::new(&path);
    sink.append(&[record("https://p.example.com/MLB-1", 1)]).unwrap();
    sink.append(&[record("https://p.example.com/MLB-2", 1)]).unwrap();

    // a new process appending to the same destination
    let mut restarted = CsvSink::new(&path);
    restarted.ensure_initialized().unwrap();
    restarted.append(&[record("https://p.example.com/MLB-1", 2)]).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(header_count(&text), 1);
    assert_eq!(text.lines().count(), 4);
}

#[test]
fn pre_existing_destination_is_appended_to() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("market.csv");
    fs::write(&path, format!("{}\nexisting;row\n", COLUMNS.join(";"))).unwrap();

    let mut sink = CsvSink::new(&path);
    sink.ensure_initialized().unwrap();
    sink.append(&[record("https://p.example.com/MLB-9", 4)]).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(!text.starts_with('\u{feff}'));
    assert_eq!(header_count(&text), 1);
    assert!(text.lines().nth(1).unwrap().starts_with("existing;row"));
    assert_eq!(text.lines().count(), 3);
}

#[test]
fn rows_follow_column_order_and_labels() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("market.csv");

    let mut sink = CsvSink::new(&path).with_utf8_bom(false);
    let mut sparse = record("https://p.example.com/MLB-3", 7);
    sparse.interest_free = None;
    sparse.installments = NOT_AVAILABLE.to_string();
    sink.append(&[record("https://p.example.com/MLB-1", 7), sparse]).unwrap();

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .from_path(&path)
        .unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(headers.iter().collect::<Vec<_>>(), COLUMNS.to_vec());

    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][0], "2024-06-02 14:05:09");
    assert_eq!(&rows[0][2], "Samsung Galaxy A35 5G; 128GB");
    assert_eq!(&rows[0][7], "Sem Juros");
    assert_eq!(&rows[0][9], "Yes");
    assert_eq!(&rows[0][11], "Yes");
    assert_eq!(&rows[0][12], "No");
    assert_eq!(&rows[0][15], "list");
    assert_eq!(&rows[1][6], "N/A");
    assert_eq!(&rows[1][7], "N/A");
}
