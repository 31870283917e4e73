use pretty_assertions::assert_eq;
use scout_engine::{parse_job_cards, parse_posting_details, JobCard, PostingDetails};

const SEARCH_PAGE: &str = include_str!("fixtures/search_page.html");
const POSTING: &str = include_str!("fixtures/posting.html");

#[test]
fn search_page_yields_cards_with_clean_fields() {
    let cards = parse_job_cards(SEARCH_PAGE);

    assert_eq!(cards.len(), 3);
    assert_eq!(
        cards[0],
        JobCard {
            job_id: "3901111001".to_string(),
            title: "Rust Engineer".to_string(),
            company: "Ferrous Systems".to_string(),
            place: "Berlin, Germany".to_string(),
            link: "https://www.linkedin.com/jobs/view/rust-engineer-at-ferrous-3901111001"
                .to_string(),
            date: "2024-05-02".to_string(),
            promoted: false,
        }
    );
}

#[test]
fn promoted_cards_are_flagged_and_relative_dates_kept() {
    let cards = parse_job_cards(SEARCH_PAGE);

    let promoted = &cards[1];
    assert_eq!(promoted.title, "Backend Developer");
    assert!(promoted.promoted);
    assert_eq!(promoted.date, "2 days ago");
    assert_eq!(promoted.company, "Crab Corp");
}

#[test]
fn job_id_comes_from_link_when_urn_missing() {
    let cards = parse_job_cards(SEARCH_PAGE);

    let card = &cards[2];
    assert_eq!(card.job_id, "3901111003");
    assert_eq!(card.date, "");
    assert_eq!(card.place, "Emeryville, CA");
}

#[test]
fn pages_without_cards_parse_to_nothing() {
    assert!(parse_job_cards("").is_empty());
    assert!(parse_job_cards("<html><body><p>No jobs</p></body></html>").is_empty());
}

#[test]
fn posting_page_yields_description_lines_and_seniority() {
    let details = parse_posting_details(POSTING);

    assert_eq!(
        details.description,
        "We are looking for a\nRust Engineer\nto join our team.\nWrite async services\nReview code"
    );
    assert_eq!(details.seniority.as_deref(), Some("Mid-Senior level"));
}

#[test]
fn posting_without_markup_is_empty() {
    assert_eq!(
        parse_posting_details("<html><body>gone</body></html>"),
        PostingDetails::default()
    );
}
