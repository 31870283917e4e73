use std::fs;

use pretty_assertions::assert_eq;
use scout_core::{ExperienceLevel, ResultRow};
use scout_engine::{decode_csv, encode_csv, write_csv, DEFAULT_EXPORT_FILE_NAME};
use tempfile::TempDir;

fn row(title: &str, description: &str) -> ResultRow {
    ResultRow {
        search_keyword: "data engineer".to_string(),
        title: title.to_string(),
        company: "Acme, Inc.".to_string(),
        link: "https://www.linkedin.com/jobs/view/123".to_string(),
        location: "Austin, TX".to_string(),
        description: description.to_string(),
        date: "2024-05-01".to_string(),
        experience_level: ExperienceLevel::Director,
    }
}

#[test]
fn header_is_written_for_empty_export() {
    let bytes = encode_csv(&[]).unwrap();
    assert_eq!(
        String::from_utf8(bytes).unwrap(),
        "search_keyword,title,company,link,location,description,date,experience\n"
    );
}

#[test]
fn rows_use_wire_names_for_experience() {
    let bytes = encode_csv(&[row("Lead", "Plain")]).unwrap();
    let text = String::from_utf8(bytes).unwrap();
    let lines: Vec<_> = text.lines().collect();

    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[1],
        "data engineer,Lead,\"Acme, Inc.\",https://www.linkedin.com/jobs/view/123,\"Austin, TX\",Plain,2024-05-01,DIRECTOR"
    );
}

#[test]
fn awkward_text_survives_a_write_and_read_back() {
    let rows = vec![
        row("Lead \"Data\" Engineer", "Line one\nLine two, with comma"),
        row("Ingénieur données", ""),
    ];

    let decoded = decode_csv(&encode_csv(&rows).unwrap()).unwrap();
    assert_eq!(decoded, rows);
}

#[test]
fn write_csv_replaces_previous_export() {
    let temp = TempDir::new().unwrap();

    write_csv(temp.path(), DEFAULT_EXPORT_FILE_NAME, &[row("Old", "")]).unwrap();
    let path = write_csv(temp.path(), DEFAULT_EXPORT_FILE_NAME, &[row("New", "")]).unwrap();

    assert_eq!(path, temp.path().join("linkedin_job_offers.csv"));
    let decoded = decode_csv(&fs::read(&path).unwrap()).unwrap();
    assert_eq!(decoded, vec![row("New", "")]);
    let leftovers = fs::read_dir(temp.path()).unwrap().count();
    assert_eq!(leftovers, 1);
}
