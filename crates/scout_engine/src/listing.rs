use scraper::{ElementRef, Html, Selector};
use url::Url;

/// A job card from a search results page, before its description is fetched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobCard {
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub place: String,
    pub link: String,
    pub date: String,
    pub promoted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PostingDetails {
    pub description: String,
    pub seniority: Option<String>,
}

/// Pulls job cards out of a guest search results page (or fragment).
///
/// Cards without a title or a link are skipped.
pub fn parse_job_cards(html: &str) -> Vec<JobCard> {
    let doc = Html::parse_document(html);
    let Some(card_sel) = selector("div.base-search-card, div.base-card") else {
        return Vec::new();
    };
    let title_sel = selector(".base-search-card__title");
    let company_sel = selector(".base-search-card__subtitle");
    let place_sel = selector(".job-search-card__location");
    let link_sel = selector("a.base-card__full-link, a.base-card--link");
    let time_sel = selector("time");
    let benefits_sel = selector(".job-posting-benefits__text, .result-benefits__text");

    let mut cards = Vec::new();
    for card in doc.select(&card_sel) {
        let title = first_text(card, &title_sel);
        let link = card
            .select_first(&link_sel)
            .and_then(|a| a.value().attr("href"))
            .or_else(|| card.value().attr("href"))
            .map(clean_link)
            .unwrap_or_default();
        if title.is_empty() || link.is_empty() {
            continue;
        }

        let job_id = card
            .value()
            .attr("data-entity-urn")
            .and_then(|urn| urn.rsplit(':').next())
            .map(ToOwned::to_owned)
            .or_else(|| job_id_from_link(&link))
            .unwrap_or_default();
        let date = card
            .select_first(&time_sel)
            .map(|t| {
                t.value()
                    .attr("datetime")
                    .map(ToOwned::to_owned)
                    .unwrap_or_else(|| collapse_whitespace(t.text()))
            })
            .unwrap_or_default();
        let promoted = benefits_sel
            .as_ref()
            .map(|sel| {
                card.select(sel)
                    .any(|el| collapse_whitespace(el.text()).contains("Promoted"))
            })
            .unwrap_or(false);

        cards.push(JobCard {
            job_id,
            title,
            company: first_text(card, &company_sel),
            place: first_text(card, &place_sel),
            link,
            date,
            promoted,
        });
    }
    cards
}

/// Description text and seniority criterion from a guest posting page.
pub fn parse_posting_details(html: &str) -> PostingDetails {
    let doc = Html::parse_document(html);
    let description_sel = selector(".show-more-less-html__markup, .description__text");
    let criteria_sel = selector("li.description__job-criteria-item");
    let subheader_sel = selector(".description__job-criteria-subheader");
    let criteria_text_sel = selector(".description__job-criteria-text");

    let description = description_sel
        .as_ref()
        .and_then(|sel| doc.select(sel).next())
        .map(|node| {
            node.text()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default();

    let seniority = criteria_sel.as_ref().and_then(|sel| {
        doc.select(sel)
            .find(|item| first_text(*item, &subheader_sel).eq_ignore_ascii_case("Seniority level"))
            .map(|item| first_text(item, &criteria_text_sel))
            .filter(|text| !text.is_empty())
    });

    PostingDetails {
        description,
        seniority,
    }
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

trait SelectFirst<'a> {
    fn select_first(&self, sel: &Option<Selector>) -> Option<ElementRef<'a>>;
}

impl<'a> SelectFirst<'a> for ElementRef<'a> {
    fn select_first(&self, sel: &Option<Selector>) -> Option<ElementRef<'a>> {
        sel.as_ref().and_then(|sel| self.select(sel).next())
    }
}

fn first_text(el: ElementRef<'_>, sel: &Option<Selector>) -> String {
    el.select_first(sel)
        .map(|node| collapse_whitespace(node.text()))
        .unwrap_or_default()
}

fn collapse_whitespace<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Drops tracking query strings and fragments; leaves unparseable links alone.
fn clean_link(href: &str) -> String {
    match Url::parse(href.trim()) {
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => href.trim().to_string(),
    }
}

fn job_id_from_link(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    let last = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let digits: String = last
        .chars()
        .rev()
        .take_while(char::is_ascii_digit)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    (!digits.is_empty()).then_some(digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_loses_tracking_params() {
        assert_eq!(
            clean_link("https://www.linkedin.com/jobs/view/rust-dev-at-acme-3901?refId=abc&trk=x"),
            "https://www.linkedin.com/jobs/view/rust-dev-at-acme-3901"
        );
        assert_eq!(clean_link(" /relative "), "/relative");
    }

    #[test]
    fn job_id_falls_back_to_link_digits() {
        assert_eq!(
            job_id_from_link("https://www.linkedin.com/jobs/view/rust-dev-at-acme-3901234"),
            Some("3901234".to_string())
        );
        assert_eq!(job_id_from_link("https://example.com/jobs/"), None);
    }
}
